mod addr_trace;
mod config;
mod decode;
mod distance;
mod report;
mod summary;
mod trace;

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process,
};

use log::{error, info};

use crate::{
    addr_trace::BuildError,
    config::{Command, Knobs, USAGE},
    summary::Summary,
    trace::TraceReader,
};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("cannot open trace {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("cannot write report: {0}")]
    Report(#[from] io::Error),
    #[error("cannot write summary {path}: {source}")]
    Summary {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let knobs = match Knobs::parse(pico_args::Arguments::from_env()) {
        Ok(Command::Run(knobs)) => knobs,
        Ok(Command::Help) => {
            print!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            process::exit(2);
        }
    };

    if let Err(err) = run(&knobs) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(knobs: &Knobs) -> Result<(), Error> {
    let stream = {
        let mut reader = TraceReader::open(
            &knobs.trace_path,
            knobs.instr_per_block,
            knobs.blocks_per_queue,
        )
        .map_err(|source| Error::Open {
            path: knobs.trace_path.clone(),
            source,
        })?;
        addr_trace::build(
            &mut reader,
            knobs.n_simulate,
            knobs.decoder.as_ref(),
            knobs.line_bits,
        )?
    };

    let profile = distance::profile(&stream, knobs.window);

    let mut out = BufWriter::new(io::stdout().lock());
    report::write_report(&mut out, &stream, &profile)?;
    out.flush()?;

    if let Some(path) = &knobs.json {
        let summary = Summary::new(
            knobs.n_simulate,
            knobs.decoder.name(),
            knobs.window,
            &profile,
            &summary::default_sizes(),
        );
        write_summary(path, &summary).map_err(|source| Error::Summary {
            path: path.clone(),
            source,
        })?;
        info!("wrote miss ratio summary to {}", path.display());
    }

    Ok(())
}

fn write_summary(path: &Path, summary: &Summary) -> Result<(), serde_json::Error> {
    let mut writer = BufWriter::new(fs::File::create(path).map_err(serde_json::Error::io)?);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush().map_err(serde_json::Error::io)
}
