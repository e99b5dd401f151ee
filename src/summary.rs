use serde::Serialize;

use crate::distance::{Profile, UNDEFINED};

/// Predicted miss ratio of a fully associative LRU cache of `cache_lines` lines.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CurvePoint {
    cache_lines: usize,
    miss_ratio: f64,
    miss_ratio_est: f64,
}

#[derive(Serialize, Debug)]
pub struct Summary {
    instructions: usize,
    accesses: usize,
    distinct_lines: usize,
    window: usize,
    policy: String,
    curve: Vec<CurvePoint>,
}

/// Powers of two from a single line up to 64K lines.
pub fn default_sizes() -> Vec<usize> {
    (0..=16).map(|shift| 1usize << shift).collect()
}

/// Forward distances below `n` are the hits of an `n`-line LRU cache.
fn miss_ratio(sorted: &[usize], accesses: usize, n: usize) -> f64 {
    if accesses == 0 {
        return 0.0;
    }
    let hits = sorted.partition_point(|&d| d < n);
    1.0 - hits as f64 / accesses as f64
}

fn sorted_defined(distances: &[usize]) -> Vec<usize> {
    let mut defined = distances
        .iter()
        .copied()
        .filter(|&d| d != UNDEFINED)
        .collect::<Vec<_>>();
    defined.sort_unstable();
    defined
}

impl Summary {
    pub fn new(
        instructions: usize,
        policy: &str,
        window: usize,
        profile: &Profile,
        sizes: &[usize],
    ) -> Self {
        let accesses = profile.reuse.len();
        // Every line's last reference has no reuse.
        let distinct_lines = profile.reuse.iter().filter(|&&d| d == UNDEFINED).count();

        let stack = sorted_defined(&profile.stack);
        let stack_est = sorted_defined(&profile.stack_est);
        let curve = sizes
            .iter()
            .map(|&n| CurvePoint {
                cache_lines: n,
                miss_ratio: miss_ratio(&stack, accesses, n),
                miss_ratio_est: miss_ratio(&stack_est, accesses, n),
            })
            .collect();

        Summary {
            instructions,
            accesses,
            distinct_lines,
            window,
            policy: policy.to_string(),
            curve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::profile;

    #[test]
    fn cyclic_sweep_curve() {
        // 4 lines swept 3 times: LRU misses everything below 4 lines
        let stream = (0..3).flat_map(|_| 0..4u64).collect::<Vec<_>>();
        let summary = Summary::new(12, "union", 64, &profile(&stream, 64), &[1, 2, 4, 8]);
        assert_eq!(summary.accesses, 12);
        assert_eq!(summary.distinct_lines, 4);
        let ratios = summary
            .curve
            .iter()
            .map(|p| p.miss_ratio)
            .collect::<Vec<_>>();
        assert_eq!(ratios[0], 1.0);
        assert_eq!(ratios[1], 1.0);
        assert!((ratios[2] - 4.0 / 12.0).abs() < 1e-12);
        assert!((ratios[3] - 4.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn all_cold() {
        let stream = (0..100).collect::<Vec<u64>>();
        let summary = Summary::new(100, "concat", 64, &profile(&stream, 64), &default_sizes());
        assert_eq!(summary.distinct_lines, 100);
        assert!(summary
            .curve
            .iter()
            .all(|p| p.miss_ratio == 1.0 && p.miss_ratio_est == 1.0));
    }

    #[test]
    fn curve_is_non_increasing() {
        let mut rng = fastrand::Rng::with_seed(5);
        let stream = (0..4000).map(|_| rng.u64(0..300)).collect::<Vec<_>>();
        let summary = Summary::new(4000, "union", 32, &profile(&stream, 32), &default_sizes());
        for pair in summary.curve.windows(2) {
            assert!(pair[1].miss_ratio <= pair[0].miss_ratio);
            assert!(pair[1].miss_ratio_est <= pair[0].miss_ratio_est);
        }
    }

    #[test]
    fn empty_stream() {
        let summary = Summary::new(0, "union", 64, &profile(&[], 64), &[1, 2]);
        assert_eq!(summary.accesses, 0);
        assert!(summary.curve.iter().all(|p| p.miss_ratio == 0.0));
    }

    #[test]
    fn json_shape() {
        let summary = Summary::new(2, "union", 64, &profile(&[1, 1], 64), &[1]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["accesses"], 2);
        assert_eq!(json["policy"], "union");
        assert_eq!(json["curve"][0]["cache_lines"], 1);
        assert_eq!(json["curve"][0]["miss_ratio"], 0.5);
    }
}
