pub mod approx;
pub mod reuse;
pub mod stack;

use std::panic;

use log::debug;

use self::{approx::ApproxStackDistance, reuse::ReuseDistance, stack::StackDistance};

/// Marks a position whose line is never referenced again.
pub const UNDEFINED: usize = usize::MAX;

/// Default window of the approximate stack distance estimator.
pub const WINDOW: usize = 64;

/// A single forward pass over an address stream.
///
/// `compute` consumes the estimator, so every pass starts from fresh state.
/// The result has one entry per stream position, holding the distance to the
/// next reference of the same line or [`UNDEFINED`].
pub trait Estimator {
    fn compute(self, stream: &[u64]) -> Vec<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub reuse: Vec<usize>,
    pub stack: Vec<usize>,
    pub stack_est: Vec<usize>,
}

/// Runs all three estimators over `stream`.
///
/// The exact stack pass runs on a scoped thread while this thread runs the
/// reuse pass and then the approximate pass that depends on it.
pub fn profile(stream: &[u64], window: usize) -> Profile {
    let result = crossbeam::thread::scope(|s| {
        let stack = s.spawn(move |_| StackDistance::new().compute(stream));

        let reuse = ReuseDistance::new().compute(stream);
        debug!("reuse distance pass done");
        let stack_est = ApproxStackDistance::new(window, &reuse).compute(stream);
        debug!("approximate stack distance pass done");

        let stack = stack
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));
        debug!("stack distance pass done");

        Profile {
            reuse,
            stack,
            stack_est,
        }
    });
    result.unwrap_or_else(|payload| panic::resume_unwind(payload))
}
