use std::collections::HashMap;

use super::{Estimator, UNDEFINED};

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    line: u64,
    prev: usize,
    next: usize,
}

/// Doubly linked recency list, most recently used first.
///
/// Nodes live in an arena and are addressed by index, so a handle stays valid
/// while its node is spliced around.
#[derive(Debug)]
struct RecencyList {
    nodes: Vec<Node>,
    head: usize,
}

impl RecencyList {
    fn new() -> Self {
        RecencyList {
            nodes: Vec::new(),
            head: NIL,
        }
    }

    fn push_front(&mut self, line: u64) -> usize {
        let handle = self.nodes.len();
        self.nodes.push(Node {
            line,
            prev: NIL,
            next: self.head,
        });
        if self.head != NIL {
            self.nodes[self.head].prev = handle;
        }
        self.head = handle;
        handle
    }

    /// Number of nodes in front of `handle`.
    fn rank(&self, handle: usize) -> usize {
        let mut rank = 0;
        let mut cur = self.nodes[handle].prev;
        while cur != NIL {
            rank += 1;
            cur = self.nodes[cur].prev;
        }
        rank
    }

    fn move_to_front(&mut self, handle: usize) {
        if self.head == handle {
            return;
        }
        let Node { prev, next, .. } = self.nodes[handle];
        // Not the head, so prev is always set.
        self.nodes[prev].next = next;
        if next != NIL {
            self.nodes[next].prev = prev;
        }

        self.nodes[handle].prev = NIL;
        self.nodes[handle].next = self.head;
        self.nodes[self.head].prev = handle;
        self.head = handle;
    }

    #[cfg(test)]
    fn lines(&self) -> Vec<u64> {
        let mut lines = Vec::with_capacity(self.nodes.len());
        let mut cur = self.head;
        while cur != NIL {
            lines.push(self.nodes[cur].line);
            cur = self.nodes[cur].next;
        }
        lines
    }
}

/// Exact forward stack distance: distinct lines touched until the same line
/// recurs, i.e. its 0-based LRU rank at the moment of reuse.
///
/// A reference hits in a fully associative LRU cache of `n` lines iff the
/// distance recorded for the previous reference is below `n`.
#[derive(Debug)]
pub struct StackDistance {
    stack: RecencyList,
    last_reference: HashMap<u64, (usize, usize)>,
}

impl StackDistance {
    pub fn new() -> Self {
        StackDistance {
            stack: RecencyList::new(),
            last_reference: HashMap::new(),
        }
    }
}

impl Estimator for StackDistance {
    fn compute(mut self, stream: &[u64]) -> Vec<usize> {
        let mut forward_stack_distance = vec![UNDEFINED; stream.len()];
        for (i, &address) in stream.iter().enumerate() {
            match self.last_reference.get_mut(&address) {
                Some((last_i, handle)) => {
                    forward_stack_distance[*last_i] = self.stack.rank(*handle);
                    self.stack.move_to_front(*handle);
                    *last_i = i;
                }
                None => {
                    let handle = self.stack.push_front(address);
                    self.last_reference.insert(address, (i, handle));
                }
            }
        }
        forward_stack_distance
    }
}
