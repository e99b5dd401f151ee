use std::{ffi::OsString, path::PathBuf};

use crate::{
    addr_trace::LINE_BITS,
    decode::{Concat, Decoder, Union},
    distance::WINDOW,
};

pub const USAGE: &str = "\
Predict the stack distance for each memory access

Usage: stack-distance [OPTIONS] TRACE

Arguments:
  TRACE                  ChampSim trace, raw or .xz

Options:
  -s, --simulate N       Simulate N instructions [default: 10000000]
  -p, --policy NAME      Address policy, union or concat [default: union]
  -w, --window N         Window of the estimated stack distance [default: 64]
      --line-bits N      Cache line size exponent [default: 6]
      --json PATH        Also write a miss ratio summary to PATH
      --buffer-size N    Instructions per read block [default: 16384]
      --queue-size N     Read blocks buffered ahead [default: 32]
  -h, --help             Print this help
";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Args(#[from] pico_args::Error),
    #[error("missing required argument TRACE")]
    MissingTrace,
    #[error("unexpected argument {0:?}")]
    Unexpected(OsString),
    #[error("unknown address policy `{0}`, expected `union` or `concat`")]
    UnknownPolicy(String),
    #[error("{0} must be {1}")]
    OutOfRange(&'static str, &'static str),
}

#[derive(Debug)]
pub struct Knobs {
    pub trace_path: PathBuf,
    pub n_simulate: usize,
    pub decoder: Box<dyn Decoder>,
    pub window: usize,
    pub line_bits: u32,
    pub json: Option<PathBuf>,
    pub instr_per_block: usize,
    pub blocks_per_queue: usize,
}

#[derive(Debug)]
pub enum Command {
    Help,
    Run(Knobs),
}

pub fn to_decoder(name: &str) -> Result<Box<dyn Decoder>, ConfigError> {
    match name {
        "union" => Ok(Box::new(Union)),
        "concat" => Ok(Box::new(Concat)),
        _ => Err(ConfigError::UnknownPolicy(name.to_string())),
    }
}

impl Knobs {
    pub fn parse(mut args: pico_args::Arguments) -> Result<Command, ConfigError> {
        if args.contains(["-h", "--help"]) {
            return Ok(Command::Help);
        }

        let n_simulate: usize = args
            .opt_value_from_str(["-s", "--simulate"])?
            .unwrap_or(10_000_000);
        let policy: String = args
            .opt_value_from_str(["-p", "--policy"])?
            .unwrap_or_else(|| "union".to_string());
        let window: usize = args
            .opt_value_from_str(["-w", "--window"])?
            .unwrap_or(WINDOW);
        let line_bits: u32 = args
            .opt_value_from_str("--line-bits")?
            .unwrap_or(LINE_BITS);
        let json: Option<PathBuf> = args.opt_value_from_os_str("--json", parse_path)?;
        let instr_per_block: usize = args
            .opt_value_from_str("--buffer-size")?
            .unwrap_or(1024 * 16);
        let blocks_per_queue: usize = args.opt_value_from_str("--queue-size")?.unwrap_or(32);

        let trace_path = args
            .opt_free_from_os_str(parse_path)?
            .ok_or(ConfigError::MissingTrace)?;
        // pico-args hands unknown options back as free arguments
        if trace_path.to_string_lossy().starts_with('-') {
            return Err(ConfigError::Unexpected(trace_path.into_os_string()));
        }
        if let Some(extra) = args.finish().into_iter().next() {
            return Err(ConfigError::Unexpected(extra));
        }

        if window == 0 {
            return Err(ConfigError::OutOfRange("--window", "at least 1"));
        }
        if line_bits > 63 {
            return Err(ConfigError::OutOfRange("--line-bits", "at most 63"));
        }
        if instr_per_block == 0 || blocks_per_queue == 0 {
            return Err(ConfigError::OutOfRange(
                "--buffer-size and --queue-size",
                "at least 1",
            ));
        }

        Ok(Command::Run(Knobs {
            trace_path,
            n_simulate,
            decoder: to_decoder(&policy)?,
            window,
            line_bits,
            json,
            instr_per_block,
            blocks_per_queue,
        }))
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(PathBuf::from(s))
}
