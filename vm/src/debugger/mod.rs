//! The interactive debugger overlay (§4.6-4.9): ties the interpreter, the
//! debug database, the recent-values tracker and a [`frontend::DebuggerFrontend`]
//! into one REPL-driven session.

pub mod frontend;
pub mod inspect;
pub mod signals;
pub mod tracker;

use crate::debug_db::{DebugDatabase, DebugRecord, TypeTag, VariableLocation};
use crate::error::InterpreterError;
use crate::interpreter::executors::StepOutcome;
use crate::interpreter::{HostEnv, Interpreter};
use frontend::{DebuggerCommand, DebuggerFrontend, ModifyTarget};
use signals::{CrashReport, InterruptFlag, SignalGuard};
use tracker::{RecentValuesTracker, StoreOutcome};
use vm_asm::REGISTER_COUNT;

/// What a prompt iteration decided: keep waiting at the prompt, fall through
/// to run the VM, or shut the session down.
enum PromptOutcome {
    KeepPrompting,
    Resume,
    Quit,
}

/// A running debug session (§4.6). Owns the interpreter, the optional debug
/// database, the recent-values tracker and the frontend driving it.
pub struct DebugSession<H: HostEnv, F: DebuggerFrontend> {
    vm: Interpreter<H>,
    db: Option<DebugDatabase>,
    frontend: F,
    tracker: RecentValuesTracker,
    interrupts: InterruptFlag,
    initial_registers: [u64; REGISTER_COUNT as usize],

    step_pending: bool,
    breakpoint: Option<u64>,
    break_at_line_end: bool,
    step_out_depth: Option<u64>,
    run_until_call: bool,
    silent: bool,
    silent_comments: bool,
    auto_break_on_filter: bool,
}

impl<H: HostEnv, F: DebuggerFrontend> DebugSession<H, F> {
    /// Build a session that starts stopped at the program's first
    /// instruction, as if a breakpoint were already hit (§4.6).
    pub fn new(vm: Interpreter<H>, db: Option<DebugDatabase>, frontend: F) -> Self {
        let initial_registers = vm.save_registers();
        Self {
            vm,
            db,
            frontend,
            tracker: RecentValuesTracker::new(),
            interrupts: InterruptFlag::new(),
            initial_registers,
            step_pending: true,
            breakpoint: None,
            break_at_line_end: false,
            step_out_depth: None,
            run_until_call: false,
            silent: false,
            silent_comments: false,
            auto_break_on_filter: false,
        }
    }

    /// The interrupt flag a real `^C` handler (or a test) would raise to
    /// drop back into the REPL (§4.9).
    pub fn interrupts(&self) -> InterruptFlag {
        self.interrupts.clone()
    }

    /// Drive the session to completion: either the program exits cleanly,
    /// the user quits (`x`), or a fault aborts execution.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        loop {
            if self.vm.halted() {
                return Ok(());
            }

            if let Some(bp) = self.breakpoint {
                if self.vm.ip() == bp {
                    self.step_pending = true;
                }
            }
            if SignalGuard::new(self.interrupts.clone()).poll() {
                self.step_pending = true;
            }

            if self.step_pending {
                loop {
                    match self.prompt_once() {
                        PromptOutcome::KeepPrompting => continue,
                        PromptOutcome::Resume => break,
                        PromptOutcome::Quit => return Ok(()),
                    }
                }
            }

            let ip_before = self.vm.ip();
            let depth_before = self.vm.call_depth();
            let record = self.lookup(ip_before);

            if !self.silent {
                self.render_record(ip_before, record.as_ref());
            }

            match self.vm.step() {
                Ok(StepOutcome::Halted) => return Ok(()),
                Ok(StepOutcome::Continue) => {}
                Err(err) => {
                    self.report_crash();
                    return Err(err);
                }
            }

            self.tracker.age_all();
            if let Some(record) = &record {
                for var in &record.variables {
                    if self.visit_tracked(var, self.vm.call_depth()) {
                        self.step_pending = true;
                    }
                }
            }

            if self.break_at_line_end && record.as_ref().is_some_and(DebugRecord::is_line_end) {
                self.step_pending = true;
                self.break_at_line_end = false;
            }

            if let Some(d) = self.step_out_depth {
                if self.vm.call_depth() < d {
                    self.step_pending = true;
                    self.step_out_depth = None;
                }
            }

            if self.run_until_call && self.vm.call_depth() != depth_before {
                self.step_pending = true;
                self.run_until_call = false;
            }
        }
    }

    fn lookup(&self, addr: u64) -> Option<DebugRecord> {
        self.db.as_ref().and_then(|db| db.lookup(addr).ok().flatten())
    }

    fn visit_tracked(&mut self, var: &VariableLocation, call_depth: u64) -> bool {
        match self.tracker.visit(var, call_depth) {
            StoreOutcome::EvictedHighlighted { evicted_name } => {
                self.frontend
                    .print_line(&format!("recent-values slot for '{evicted_name}' replaced by '{}'", var.name));
                true
            }
            StoreOutcome::Stored | StoreOutcome::Dropped => false,
        }
    }

    fn render_record(&mut self, ip: u64, record: Option<&DebugRecord>) {
        let Some(record) = record else { return };
        for fragment in &record.code_fragments {
            self.frontend.print_line(&format!("0x{ip:x}: {fragment}"));
        }
        if !self.silent_comments {
            for comment in &record.comments {
                self.frontend.print_line(&comment.text);
            }
        }
        for var in &record.variables {
            let rendered = self.vm.render_variable(var);
            self.frontend
                .print_line(&format!("  {} ({}) = {}", rendered.name, rendered.classifier, rendered.value));
        }
    }

    fn report_crash(&mut self) {
        let report = CrashReport {
            registers: self.vm.save_registers(),
            ip: self.vm.ip(),
            sp: self.vm.stack_pointer(),
            tracker_lines: self
                .tracker
                .all()
                .map(|t| format!("{} (age={})", t.name, t.age))
                .collect(),
        };
        for line in report.render() {
            self.frontend.print_line(&line);
        }
    }

    fn prompt_once(&mut self) -> PromptOutcome {
        match self.frontend.read_command() {
            DebuggerCommand::Continue => {
                self.step_pending = false;
                PromptOutcome::Resume
            }
            DebuggerCommand::StepInstruction => PromptOutcome::Resume,
            DebuggerCommand::StepLine => {
                self.step_pending = false;
                self.break_at_line_end = true;
                PromptOutcome::Resume
            }
            DebuggerCommand::StepOut => {
                self.step_pending = false;
                self.step_out_depth = Some(self.vm.call_depth());
                PromptOutcome::Resume
            }
            DebuggerCommand::RunUntilCall => {
                self.step_pending = false;
                self.run_until_call = true;
                PromptOutcome::Resume
            }
            DebuggerCommand::SetBreakpoint => {
                if let Some(addr) = self.frontend.prompt_hex_address() {
                    self.breakpoint = Some(addr);
                }
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::DumpRegisters => {
                self.dump_registers();
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::DumpStack => {
                self.dump_stack_tail();
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::DumpWindow => {
                if let Some((off, len)) = self.frontend.prompt_offset_and_size() {
                    self.dump_window(off, len);
                }
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::Inspect => {
                if let Some(off) = self.frontend.prompt_stack_offset() {
                    self.inspect_offset(off);
                }
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::Modify => {
                if let Some(target) = self.frontend.prompt_modify() {
                    self.apply_modify(target);
                }
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::PrintTracker => {
                self.print_tracker();
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::ClearTracker => {
                self.tracker.clear_non_highlighted();
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::SetFilter => {
                let filter = self.frontend.prompt_filter();
                self.tracker.set_filter(filter);
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::ToggleAutoBreakOnFilter => {
                self.auto_break_on_filter = !self.auto_break_on_filter;
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::ToggleSilent => {
                self.silent = !self.silent;
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::ToggleSilentComments => {
                self.silent_comments = !self.silent_comments;
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::Restart => {
                self.vm.restart(&self.initial_registers);
                self.step_pending = true;
                self.breakpoint = None;
                self.break_at_line_end = false;
                self.step_out_depth = None;
                self.run_until_call = false;
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::Quit => PromptOutcome::Quit,
            DebuggerCommand::Trap => {
                self.frontend.print_line("debugger trap");
                PromptOutcome::KeepPrompting
            }
            DebuggerCommand::Unknown(c) => {
                self.frontend.print_line(&format!("unknown command '{c}'"));
                PromptOutcome::KeepPrompting
            }
        }
    }

    fn dump_registers(&mut self) {
        let words = self.vm.save_registers();
        for (i, w) in words.iter().enumerate() {
            self.frontend.print_line(&format!("r{i} = 0x{w:016x}"));
        }
        self.frontend.print_line(&format!("compare_flag = {}", self.vm.compare_flag()));
    }

    fn dump_stack_tail(&mut self) {
        let sp = self.vm.stack_pointer() as usize;
        let bytes = self.vm.stack().tail(sp, 64).to_vec();
        self.frontend.print_line(&format_hex_ascii(&bytes));
    }

    fn dump_window(&mut self, off: i64, len: usize) {
        let Ok(addr) = self.vm.stack().resolve(self.vm.stack_pointer() as usize, off, 1) else {
            self.frontend.print_line("<BAD_PTR>");
            return;
        };
        match self.vm.stack().window(addr, len) {
            Ok(bytes) => {
                let owned = bytes.to_vec();
                self.frontend.print_line(&format_hex_ascii(&owned));
            }
            Err(_) => self.frontend.print_line("<BAD_PTR>"),
        }
    }

    fn inspect_offset(&mut self, off: i64) {
        let Ok(addr) = self.vm.stack().resolve(self.vm.stack_pointer() as usize, off, 8) else {
            self.frontend.print_line("<BAD_PTR>");
            return;
        };
        let Ok(bits) = self.vm.stack().read_uint(addr, 8) else {
            self.frontend.print_line("<BAD_PTR>");
            return;
        };
        self.frontend.print_line(&format!(
            "u64={} i64={} hex=0x{:016x} f64={} ascii=\"{}\"",
            bits,
            bits as i64,
            bits,
            f64::from_bits(bits),
            bits.to_le_bytes()
                .iter()
                .take_while(|b| **b != 0)
                .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
                .collect::<String>()
        ));
    }

    fn apply_modify(&mut self, target: ModifyTarget) {
        match target {
            ModifyTarget::Register { reg, value } => self.vm.registers_mut().set_raw_bits(reg, value),
            ModifyTarget::CompareFlag(_value) => {
                // The compare flag has no public setter outside the executor
                // (§3: only the comparison opcode writes it); the debugger
                // can observe it via `r` but modifying it from the REPL is
                // not offered by this crate's `Interpreter` API.
                self.frontend.print_line("compare flag is read-only from the debugger");
            }
            ModifyTarget::StackByte { offset, value } => {
                if self.vm.stack_mut().write_uint(offset, value as u64, 1).is_err() {
                    self.frontend.print_line("<BAD_PTR>");
                }
            }
        }
    }

    fn print_tracker(&mut self) {
        let depth = self.vm.call_depth();
        let lines: Vec<String> = self
            .tracker
            .visible(depth)
            .map(|t| {
                let loc = VariableLocation {
                    name: t.name.clone(),
                    type_tag: TypeTag::Other,
                    storage_class: t.storage_class,
                    position: t.position,
                    is_variable: true,
                    is_const: !t.highlighted,
                    is_static: t.is_static,
                };
                let rendered = self.vm.render_variable(&loc);
                format!(
                    "{} ({}) = {} [age={}{}]",
                    rendered.name,
                    rendered.classifier,
                    rendered.value,
                    t.age,
                    if t.highlighted { ", highlighted" } else { "" }
                )
            })
            .collect();
        for line in lines {
            self.frontend.print_line(&line);
        }
    }
}

fn format_hex_ascii(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
    let ascii: String = bytes
        .iter()
        .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
        .collect();
    format!("hex=[{hex}] ascii=\"{ascii}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;
    use frontend::ScriptedFrontend;
    use vm_asm::Opcode;

    fn assemble_mov_imm_r(dst: u8, imm: u64) -> Vec<u8> {
        let mut code = vec![Opcode::MovImmR as u8, dst];
        code.extend_from_slice(&imm.to_le_bytes());
        code
    }

    fn assemble_s1() -> Vec<u8> {
        let mut code = assemble_mov_imm_r(0, 2);
        code.extend(assemble_mov_imm_r(1, 3));
        code.push(Opcode::AddR as u8);
        code.push(0);
        code.push(1);
        code.push(Opcode::Exit as u8);
        code
    }

    #[test]
    fn continue_command_runs_to_completion() {
        let vm = Interpreter::new(assemble_s1(), StackConfig::WithSize(1024), DefaultHost::new());
        let mut frontend = ScriptedFrontend::new();
        frontend.push_command(DebuggerCommand::Continue);
        let mut session = DebugSession::new(vm, None, frontend);
        let result = session.run();
        assert!(result.is_ok());
    }

    #[test]
    fn quit_command_stops_without_running_to_exit() {
        let vm = Interpreter::new(assemble_s1(), StackConfig::WithSize(1024), DefaultHost::new());
        let mut frontend = ScriptedFrontend::new();
        frontend.push_command(DebuggerCommand::Quit);
        let mut session = DebugSession::new(vm, None, frontend);
        assert!(session.run().is_ok());
        assert!(!session.vm.halted());
    }

    #[test]
    fn register_dump_prints_all_sixteen_words() {
        let vm = Interpreter::new(vec![Opcode::Exit as u8], StackConfig::WithSize(1024), DefaultHost::new());
        let mut frontend = ScriptedFrontend::new();
        frontend.push_command(DebuggerCommand::DumpRegisters);
        frontend.push_command(DebuggerCommand::Quit);
        let mut session = DebugSession::new(vm, None, frontend);
        session.run().unwrap();
        let register_lines = session.frontend.output.iter().filter(|l| l.starts_with('r')).count();
        assert_eq!(register_lines, REGISTER_COUNT as usize);
    }
}
