use std::collections::HashMap;

use super::{Estimator, UNDEFINED};

/// Forward reuse distance: accesses to any line until the same line recurs.
#[derive(Debug, Default)]
pub struct ReuseDistance {
    last_reference: HashMap<u64, usize>,
}

impl ReuseDistance {
    pub fn new() -> Self {
        ReuseDistance {
            last_reference: HashMap::new(),
        }
    }
}

impl Estimator for ReuseDistance {
    fn compute(mut self, stream: &[u64]) -> Vec<usize> {
        let mut forward_reuse_distance = vec![UNDEFINED; stream.len()];
        for (i, &address) in stream.iter().enumerate() {
            if let Some(last) = self.last_reference.insert(address, i) {
                forward_reuse_distance[last] = i - last;
            }
        }
        forward_reuse_distance
    }
}
