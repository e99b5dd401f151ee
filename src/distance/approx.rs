use std::collections::HashMap;

use super::{Estimator, UNDEFINED};

/// Approximate stack distance in bounded time and memory.
///
/// A logical clock ticks once per access, except when the access was already
/// scheduled as the reuse of an earlier access less than `window` positions
/// back. The distance of a reuse is the number of ticks since the previous
/// reference. Reuses further apart than the window are never scheduled, so
/// their repeats are counted as distinct lines.
#[derive(Debug)]
pub struct ApproxStackDistance<'a> {
    reuse_distance: &'a [usize],
    scheduler: Vec<bool>,
    t: usize,
    last_reference: HashMap<u64, (usize, usize)>,
}

impl<'a> ApproxStackDistance<'a> {
    /// `reuse_distance` must be the reuse distance pass over the same stream.
    pub fn new(window: usize, reuse_distance: &'a [usize]) -> Self {
        assert!(window > 0);
        ApproxStackDistance {
            reuse_distance,
            scheduler: vec![false; window],
            t: 0,
            last_reference: HashMap::new(),
        }
    }
}

impl Estimator for ApproxStackDistance<'_> {
    fn compute(mut self, stream: &[u64]) -> Vec<usize> {
        assert_eq!(self.reuse_distance.len(), stream.len());
        let window = self.scheduler.len();
        let mut forward_stack_distance_est = vec![UNDEFINED; stream.len()];

        for (i, &address) in stream.iter().enumerate() {
            let slot = i % window;
            self.t = self.t + 1 - usize::from(self.scheduler[slot]);
            self.scheduler[slot] = false;

            let dist = self.reuse_distance[i];
            if dist < window {
                self.scheduler[(i + dist) % window] = true;
            }

            match self.last_reference.get_mut(&address) {
                Some((last_i, last_t)) => {
                    forward_stack_distance_est[*last_i] = self.t - *last_t;
                    *last_i = i;
                    *last_t = self.t;
                }
                None => {
                    self.last_reference.insert(address, (i, self.t));
                }
            }
        }
        forward_stack_distance_est
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{reuse::ReuseDistance, stack::StackDistance};

    const U: usize = UNDEFINED;

    fn estimate(stream: &[u64], window: usize) -> Vec<usize> {
        let reuse = ReuseDistance::new().compute(stream);
        ApproxStackDistance::new(window, &reuse).compute(stream)
    }

    fn exact(stream: &[u64]) -> Vec<usize> {
        StackDistance::new().compute(stream)
    }

    #[test]
    fn single_reuse() {
        assert_eq!(estimate(&[0xa, 0xb, 0xa], 64), vec![1, U, U]);
    }

    #[test]
    fn repeated_intervening_line_within_window() {
        let stream = [0xa, 0xb, 0xb, 0xa];
        assert_eq!(estimate(&stream, 64), exact(&stream));
    }

    #[test]
    fn exact_within_window() {
        let stream = [1, 1];
        assert_eq!(estimate(&stream, 2), exact(&stream));
        assert_eq!(estimate(&stream, 2), vec![0, U]);

        let stream = [1, 2, 1];
        assert_eq!(estimate(&stream, 4), exact(&stream));

        // every reuse distance is 1, below a window of 2
        let stream = [1, 1, 2, 2, 3, 3];
        assert_eq!(estimate(&stream, 2), exact(&stream));
        assert_eq!(estimate(&stream, 2), vec![0, U, 0, U, 0, U]);
    }

    #[test]
    fn reuse_at_window_is_not_scheduled() {
        // reuse distance 2 is not below a window of 2, so 1 ticks the clock twice
        let stream = [1, 2, 1];
        assert_eq!(exact(&stream)[0], 1);
        assert_eq!(estimate(&stream, 2)[0], 2);
    }

    #[test]
    fn diverges_beyond_window() {
        let stream = [0, 1, 2, 3, 4, 5, 0];
        let exact = exact(&stream);
        let est = estimate(&stream, 2);
        assert_eq!(exact[0], 5);
        assert_eq!(est[0], 6);
        assert_ne!(est[0], exact[0]);
    }

    #[test]
    fn unscheduled_reuse_degrades_to_reuse_distance() {
        // nothing recurs within a window of 2, so the clock ticks on every access
        let stream = [0, 1, 2, 3, 1, 0];
        assert_eq!(exact(&stream)[0], 3);
        assert_eq!(estimate(&stream, 2)[0], 5);
        assert_eq!(estimate(&stream, 8), exact(&stream));
    }

    #[test]
    fn idempotent() {
        let mut rng = fastrand::Rng::with_seed(3);
        let stream = (0..1000).map(|_| rng.u64(0..64)).collect::<Vec<_>>();
        assert_eq!(estimate(&stream, 16), estimate(&stream, 16));
    }
}
