use std::{
    fs,
    io::{self, ErrorKind, Read},
    path::Path,
    thread::{self, JoinHandle},
    vec,
};

use crossbeam::channel::{Receiver, Sender};
use log::debug;
use xz2::read::XzDecoder;

// Instruction Format
pub const NUM_INSTR_DESTINATIONS: usize = 2;
pub const NUM_INSTR_SOURCES: usize = 4;
pub const INSTR_SIZE: usize = 64;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instr {
    pub ip: u64,

    pub is_branch: u8,
    pub branch_taken: u8,

    pub destination_registers: [u8; NUM_INSTR_DESTINATIONS],
    pub source_registers: [u8; NUM_INSTR_SOURCES],

    pub destination_memory: [u64; NUM_INSTR_DESTINATIONS],
    pub source_memory: [u64; NUM_INSTR_SOURCES],
}

fn le_u64(raw: &[u8; INSTR_SIZE], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&raw[at..at + 8]);
    u64::from_le_bytes(word)
}

impl Instr {
    /// Decodes one record laid out as the C struct `input_instr`, little endian.
    pub fn from_bytes(raw: &[u8; INSTR_SIZE]) -> Self {
        let mut instr = Instr {
            ip: le_u64(raw, 0),
            is_branch: raw[8],
            branch_taken: raw[9],
            ..Default::default()
        };
        instr.destination_registers.copy_from_slice(&raw[10..12]);
        instr.source_registers.copy_from_slice(&raw[12..16]);
        for (i, slot) in instr.destination_memory.iter_mut().enumerate() {
            *slot = le_u64(raw, 16 + 8 * i);
        }
        for (i, slot) in instr.source_memory.iter_mut().enumerate() {
            *slot = le_u64(raw, 32 + 8 * i);
        }
        instr
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> [u8; INSTR_SIZE] {
        let mut raw = [0u8; INSTR_SIZE];
        raw[0..8].copy_from_slice(&self.ip.to_le_bytes());
        raw[8] = self.is_branch;
        raw[9] = self.branch_taken;
        raw[10..12].copy_from_slice(&self.destination_registers);
        raw[12..16].copy_from_slice(&self.source_registers);
        for (i, addr) in self.destination_memory.iter().enumerate() {
            raw[16 + 8 * i..24 + 8 * i].copy_from_slice(&addr.to_le_bytes());
        }
        for (i, addr) in self.source_memory.iter().enumerate() {
            raw[32 + 8 * i..40 + 8 * i].copy_from_slice(&addr.to_le_bytes());
        }
        raw
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("end of trace")]
    EndOfTrace,
    #[error("trace ends {0} bytes into a record")]
    Truncated(usize),
    #[error("cannot read trace: {0}")]
    Io(#[from] io::Error),
}

/// Anything that hands out instruction records one at a time.
pub trait InstrSource {
    fn read_single_instr(&mut self) -> Result<Instr, TraceError>;
}

type Block = Result<Vec<Instr>, TraceError>;

/// Streams a trace file, decompressing on a background thread.
///
/// Records arrive in blocks of `instr_per_block` over a queue holding at most
/// `blocks_per_queue` blocks. Dropping the reader stops the producer.
#[derive(Debug)]
pub struct TraceReader {
    rec: Receiver<Block>,
    block: vec::IntoIter<Instr>,
    _thread: JoinHandle<()>,
}

impl TraceReader {
    pub fn open(
        path: &Path,
        instr_per_block: usize,
        blocks_per_queue: usize,
    ) -> io::Result<TraceReader> {
        let file = fs::File::open(path)?;
        let stream: Box<dyn Read + Send> = match path.extension() {
            Some(ext) if ext == "xz" => Box::new(XzDecoder::new(file)),
            _ => Box::new(file),
        };
        debug!(
            "reading {} in blocks of {} instructions",
            path.display(),
            instr_per_block
        );
        Ok(TraceReader::from_reader(
            stream,
            instr_per_block,
            blocks_per_queue,
        ))
    }

    pub fn from_reader<R: Read + Send + 'static>(
        stream: R,
        instr_per_block: usize,
        blocks_per_queue: usize,
    ) -> TraceReader {
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue.max(1));
        let instr_per_block = instr_per_block.max(1);

        let t = thread::spawn(move || TraceReader::run_thread(stream, instr_per_block, sender));

        TraceReader {
            rec: receiver,
            block: Vec::new().into_iter(),
            _thread: t,
        }
    }

    fn run_thread<R: Read>(mut stream: R, instr_per_block: usize, queue: Sender<Block>) {
        let mut bytes = vec![0u8; instr_per_block * INSTR_SIZE];
        loop {
            let filled = match fill(&mut stream, &mut bytes) {
                Ok(filled) => filled,
                Err(err) => {
                    let _ = queue.send(Err(err.into()));
                    return;
                }
            };
            if filled == 0 {
                return;
            }

            let whole = filled - filled % INSTR_SIZE;
            let buffer = bytes[..whole]
                .chunks_exact(INSTR_SIZE)
                .map(|chunk| {
                    let mut raw = [0u8; INSTR_SIZE];
                    raw.copy_from_slice(chunk);
                    Instr::from_bytes(&raw)
                })
                .collect::<Vec<_>>();

            if !buffer.is_empty() && queue.send(Ok(buffer)).is_err() {
                return;
            }
            if whole != filled {
                let _ = queue.send(Err(TraceError::Truncated(filled - whole)));
                return;
            }
        }
    }
}

impl InstrSource for TraceReader {
    fn read_single_instr(&mut self) -> Result<Instr, TraceError> {
        loop {
            if let Some(instr) = self.block.next() {
                return Ok(instr);
            }
            match self.rec.recv() {
                Ok(Ok(block)) => self.block = block.into_iter(),
                Ok(Err(err)) => return Err(err),
                Err(_) => return Err(TraceError::EndOfTrace),
            }
        }
    }
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn fill(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
