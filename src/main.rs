use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

use mips32_assembler::assembler::{assemble_files, AssembleResult};
use mips32_assembler::segment::Segment;
use mips32_assembler::writer;

/// A two-pass assembler for the MIPS32 instruction set.
#[derive(Parser, Debug)]
#[command(name = "mips32-assembler", version, about)]
struct Cli {
    /// One or more MIPS assembly source files, assembled in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the object file to OUT.
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Dump the user-text segment's raw bytes to PATH.
    #[arg(short = 't', long = "text-dump", value_name = "PATH")]
    text_dump: Option<PathBuf>,

    /// Dump the user-data segment's raw bytes to PATH.
    #[arg(short = 'd', long = "data-dump", value_name = "PATH")]
    data_dump: Option<PathBuf>,

    /// Assemble and report diagnostics, write no files.
    #[arg(short, long)]
    assemble_only: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> ExitCode {
    let mut files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let _span = info_span!("read_source", file = %path.display()).entered();
        match std::fs::read_to_string(path) {
            Ok(source) => files.push((Some(path.clone()), source)),
            Err(err) => {
                error!(file = %path.display(), %err, "failed to read input file");
                return ExitCode::from(2);
            }
        }
    }

    info!(files = files.len(), "assembling");
    let result = assemble_files(files);

    for err in &result.errors {
        eprintln!("{err}");
    }

    if !result.ok() {
        error!(errors = result.errors.len(), "assembly failed");
        return ExitCode::from(1);
    }

    if cli.assemble_only {
        info!("assemble-only: no files written");
        return ExitCode::SUCCESS;
    }

    if let Err(err) = write_outputs(&cli, &result) {
        error!(%err, "failed to write output");
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}

fn write_outputs(cli: &Cli, result: &AssembleResult) -> std::io::Result<()> {
    if let Some(path) = &cli.output {
        writer::write_object_file(path, &result.segments)?;
        info!(path = %path.display(), "wrote object file");
    }
    if let Some(path) = &cli.text_dump {
        writer::dump_segment(path, result.segment(Segment::UserText))?;
        info!(path = %path.display(), "wrote text dump");
    }
    if let Some(path) = &cli.data_dump {
        writer::dump_segment(path, result.segment(Segment::UserData))?;
        info!(path = %path.display(), "wrote data dump");
    }
    Ok(())
}
