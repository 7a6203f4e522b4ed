//! `vm-exec`: load a bytecode image and run it to completion or fault (§6).

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use vm::interpreter::host::DefaultHost;
use vm::interpreter::{Interpreter, StackConfig};

/// Run a scriptvm bytecode file to completion.
#[derive(Debug, Parser)]
#[command(name = "vm-exec")]
struct Args {
    /// Path to the flat bytecode file (first byte is the first opcode).
    bytecode_file: std::path::PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            // §6: exit code -1 on startup/validation failure or a fault.
            ExitCode::from(255)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let code = std::fs::read(&args.bytecode_file)
        .with_context(|| format!("reading bytecode file {}", args.bytecode_file.display()))?;

    let mut vm = Interpreter::new(code, StackConfig::Default, DefaultHost::new());
    vm.run().context("executing program")?;
    Ok(())
}
