use std::fmt::Debug;

use crate::trace::{Instr, NUM_INSTR_DESTINATIONS, NUM_INSTR_SOURCES};

const MAX_OPERANDS: usize = NUM_INSTR_SOURCES + NUM_INSTR_DESTINATIONS;

/// Policy for turning one instruction's memory operands into accesses.
pub trait Decoder: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Appends the addresses `instr` touches to `out`. Zero slots are unused.
    fn decode(&self, instr: &Instr, out: &mut Vec<u64>);
}

/// Sorted set union of source and destination addresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct Union;

/// Sources in record order, then destinations. Shared addresses appear twice.
#[derive(Debug, Default, Clone, Copy)]
pub struct Concat;

impl Decoder for Union {
    fn name(&self) -> &'static str {
        "union"
    }

    fn decode(&self, instr: &Instr, out: &mut Vec<u64>) {
        let mut buf = [0u64; MAX_OPERANDS];
        let mut len = 0;
        for &addr in instr.source_memory.iter().chain(&instr.destination_memory) {
            if addr != 0 {
                buf[len] = addr;
                len += 1;
            }
        }

        let operands = &mut buf[..len];
        operands.sort_unstable();
        let mut last = None;
        for &addr in operands.iter() {
            if last != Some(addr) {
                out.push(addr);
                last = Some(addr);
            }
        }
    }
}

impl Decoder for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn decode(&self, instr: &Instr, out: &mut Vec<u64>) {
        out.extend(
            instr
                .source_memory
                .iter()
                .chain(&instr.destination_memory)
                .copied()
                .filter(|&addr| addr != 0),
        );
    }
}
