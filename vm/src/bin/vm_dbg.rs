//! `vm-dbg`: load a bytecode image, optionally a debug database, and drive
//! it interactively through [`DebugSession`] (§6).

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use vm::debug_db::DebugDatabase;
use vm::debugger::frontend::{DebuggerCommand, DebuggerFrontend, ModifyTarget};
use vm::debugger::DebugSession;
use vm::interpreter::host::DefaultHost;
use vm::interpreter::{Interpreter, StackConfig};

/// Interactively step through a scriptvm bytecode file.
#[derive(Debug, Parser)]
#[command(name = "vm-dbg")]
struct Args {
    /// Path to the flat bytecode file.
    bytecode_file: std::path::PathBuf,
    /// Path to an optional debug database (§4.5, §6).
    debug_database_file: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(255)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let code = std::fs::read(&args.bytecode_file)
        .with_context(|| format!("reading bytecode file {}", args.bytecode_file.display()))?;

    let db = match &args.debug_database_file {
        Some(path) => {
            let buf = std::fs::read(path).with_context(|| format!("reading debug database {}", path.display()))?;
            DebugDatabase::load_or_warn(buf)
        }
        None => None,
    };

    let vm = Interpreter::new(code, StackConfig::Default, DefaultHost::new());
    let frontend = TerminalFrontend::new();
    let mut session = DebugSession::new(vm, db, frontend);
    session.run().context("debugger session")?;
    Ok(())
}

/// A [`DebuggerFrontend`] backed by the controlling terminal's stdin/stdout
/// (§9: the real counterpart to the in-process scripted test double).
struct TerminalFrontend {
    stdin: std::io::Stdin,
}

impl TerminalFrontend {
    fn new() -> Self {
        Self { stdin: std::io::stdin() }
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        std::io::stdout().flush().ok()?;
        let mut line = String::new();
        self.stdin.lock().read_line(&mut line).ok()?;
        let trimmed = line.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    fn read_hex_u64(&mut self, prompt: &str) -> Option<u64> {
        let line = self.read_line(prompt)?;
        u64::from_str_radix(line.trim_start_matches("0x"), 16).ok()
    }
}

impl DebuggerFrontend for TerminalFrontend {
    fn read_command(&mut self) -> DebuggerCommand {
        match self.read_line("(vm-dbg) ") {
            Some(s) => DebuggerCommand::from_char(s.chars().next().unwrap_or('n')),
            None => DebuggerCommand::StepInstruction,
        }
    }

    fn prompt_hex_address(&mut self) -> Option<u64> {
        self.read_hex_u64("address (hex): ")
    }

    fn prompt_offset_and_size(&mut self) -> Option<(i64, usize)> {
        let line = self.read_line("offset size: ")?;
        let mut parts = line.split_whitespace();
        let off = parts.next()?.parse().ok()?;
        let size = parts.next()?.parse().ok()?;
        Some((off, size))
    }

    fn prompt_stack_offset(&mut self) -> Option<i64> {
        self.read_line("stack offset: ")?.parse().ok()
    }

    fn prompt_modify(&mut self) -> Option<ModifyTarget> {
        let line = self.read_line("modify (reg N value | stack OFF value): ")?;
        let mut parts = line.split_whitespace();
        match parts.next()? {
            "reg" => {
                let idx: u8 = parts.next()?.parse().ok()?;
                let value: u64 = parts.next()?.parse().ok()?;
                let reg = vm_asm::RegId::new(idx).ok()?;
                Some(ModifyTarget::Register { reg, value })
            }
            "stack" => {
                let offset: usize = parts.next()?.parse().ok()?;
                let value: u8 = parts.next()?.parse().ok()?;
                Some(ModifyTarget::StackByte { offset, value })
            }
            _ => None,
        }
    }

    fn prompt_filter(&mut self) -> Option<String> {
        self.read_line("filter substring: ")
    }

    fn print_line(&mut self, line: &str) {
        println!("{line}");
    }
}
