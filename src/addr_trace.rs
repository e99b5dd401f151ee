use log::{debug, info};

use crate::{
    decode::Decoder,
    trace::{InstrSource, TraceError},
};

/// 64-byte cache lines.
pub const LINE_BITS: u32 = 6;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("trace holds only {available} of the {requested} requested instructions")]
    ExhaustedInput { requested: usize, available: usize },
    #[error(transparent)]
    Trace(TraceError),
}

pub fn to_line(addr: u64, line_bits: u32) -> u64 {
    addr >> line_bits
}

/// Decodes `count` instructions from `reader` into a stream of cache-line indices.
pub fn build(
    reader: &mut impl InstrSource,
    count: usize,
    decoder: &dyn Decoder,
    line_bits: u32,
) -> Result<Vec<u64>, BuildError> {
    // The request may exceed what the trace holds.
    let mut address_trace = Vec::with_capacity(count.min(1 << 20));

    for idx in 0..count {
        let instr = match reader.read_single_instr() {
            Ok(instr) => instr,
            Err(TraceError::EndOfTrace) => {
                return Err(BuildError::ExhaustedInput {
                    requested: count,
                    available: idx,
                })
            }
            Err(err) => return Err(BuildError::Trace(err)),
        };
        decoder.decode(&instr, &mut address_trace);

        if idx > 0 && idx % 1_000_000 == 0 {
            debug!("decoded {idx} instructions");
        }
    }

    address_trace
        .iter_mut()
        .for_each(|addr| *addr = to_line(*addr, line_bits));

    info!(
        "decoded {} instructions into {} accesses ({} policy)",
        count,
        address_trace.len(),
        decoder.name()
    );
    Ok(address_trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decode::{Concat, Union},
        trace::tests::{mem_instr, Replay},
    };

    fn replay(instrs: Vec<crate::trace::Instr>) -> Replay {
        Replay(instrs.into())
    }

    #[test]
    fn quantizes_to_lines() {
        assert_eq!(to_line(0x1041, LINE_BITS), 0x41);
        assert_eq!(to_line(0x103f, LINE_BITS), 0x40);
        assert_eq!(to_line(u64::MAX, 63), 1);
    }

    #[test]
    fn builds_line_stream() {
        let mut reader = replay(vec![
            mem_instr([0x1041, 0, 0, 0], [0x1041, 0]),
            mem_instr([0, 0, 0, 0], [0, 0]),
            mem_instr([0x2000, 0x1000, 0, 0], [0x2010, 0]),
        ]);
        let stream = build(&mut reader, 3, &Union, LINE_BITS).unwrap();
        assert_eq!(stream, vec![0x41, 0x40, 0x80, 0x80]);
    }

    #[test]
    fn policy_changes_stream() {
        let instrs = vec![mem_instr([0x1000, 0, 0, 0], [0x1000, 0])];
        let union = build(&mut replay(instrs.clone()), 1, &Union, LINE_BITS).unwrap();
        let concat = build(&mut replay(instrs), 1, &Concat, LINE_BITS).unwrap();
        assert_eq!(union, vec![0x40]);
        assert_eq!(concat, vec![0x40, 0x40]);
    }

    #[test]
    fn stops_after_count() {
        let mut reader = replay(vec![
            mem_instr([0x40, 0, 0, 0], [0, 0]),
            mem_instr([0x80, 0, 0, 0], [0, 0]),
        ]);
        assert_eq!(build(&mut reader, 1, &Union, 0).unwrap(), vec![0x40]);
        assert_eq!(reader.0.len(), 1);
    }

    #[test]
    fn exhausted_input() {
        let mut reader = replay(vec![mem_instr([0x40, 0, 0, 0], [0, 0])]);
        match build(&mut reader, 3, &Union, LINE_BITS) {
            Err(BuildError::ExhaustedInput {
                requested,
                available,
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn huge_request_on_short_trace() {
        let mut reader = replay(vec![mem_instr([0x40, 0, 0, 0], [0, 0])]);
        assert!(matches!(
            build(&mut reader, usize::MAX / 2, &Union, LINE_BITS),
            Err(BuildError::ExhaustedInput { available: 1, .. })
        ));
    }
}
