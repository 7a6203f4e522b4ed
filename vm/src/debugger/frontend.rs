//! The terminal abstraction the REPL drives (§4.6, §9: "isolate behind a
//! `DebuggerFrontend` abstraction ... so that a headless harness can drive
//! the same core by supplying a scripted command source").

use vm_asm::RegId;

/// One of the single-character commands from §4.6's command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerCommand {
    Continue,
    StepInstruction,
    StepLine,
    StepOut,
    RunUntilCall,
    SetBreakpoint,
    DumpRegisters,
    DumpStack,
    DumpWindow,
    Inspect,
    Modify,
    PrintTracker,
    ClearTracker,
    SetFilter,
    ToggleAutoBreakOnFilter,
    ToggleSilent,
    ToggleSilentComments,
    Restart,
    Quit,
    Trap,
    /// Anything the frontend couldn't map to a known command.
    Unknown(char),
}

impl DebuggerCommand {
    /// Map a single input character to its command (§4.6's key table).
    pub fn from_char(c: char) -> Self {
        match c {
            'c' => Self::Continue,
            'n' => Self::StepInstruction,
            'l' => Self::StepLine,
            'f' => Self::StepOut,
            'F' => Self::RunUntilCall,
            'b' => Self::SetBreakpoint,
            'r' => Self::DumpRegisters,
            'p' => Self::DumpStack,
            'y' => Self::DumpWindow,
            'i' => Self::Inspect,
            'm' => Self::Modify,
            'v' => Self::PrintTracker,
            'o' => Self::ClearTracker,
            'w' => Self::SetFilter,
            'W' => Self::ToggleAutoBreakOnFilter,
            's' => Self::ToggleSilent,
            'S' => Self::ToggleSilentComments,
            'q' => Self::Restart,
            'x' => Self::Quit,
            'z' => Self::Trap,
            other => Self::Unknown(other),
        }
    }
}

/// What the `m` (modify) command targets (§4.6: "modify a register, the
/// compare flag, or a stack byte").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyTarget {
    Register { reg: RegId, value: u64 },
    CompareFlag(bool),
    StackByte { offset: usize, value: u8 },
}

/// Everything the REPL needs from a terminal, abstracted so a scripted
/// headless driver can stand in for it in tests (§9).
pub trait DebuggerFrontend {
    /// Block for one command character.
    fn read_command(&mut self) -> DebuggerCommand;
    /// Prompt for a hex instruction address (`b`).
    fn prompt_hex_address(&mut self) -> Option<u64>;
    /// Prompt for an offset and a byte count (`y`).
    fn prompt_offset_and_size(&mut self) -> Option<(i64, usize)>;
    /// Prompt for a stack displacement to inspect (`i`).
    fn prompt_stack_offset(&mut self) -> Option<i64>;
    /// Prompt for a modify target and new value (`m`).
    fn prompt_modify(&mut self) -> Option<ModifyTarget>;
    /// Prompt for a substring filter (`w`).
    fn prompt_filter(&mut self) -> Option<String>;
    /// Emit one line of output (register dumps, tracker prints, source
    /// fragments, crash reports, ...).
    fn print_line(&mut self, line: &str);
}

/// An in-process frontend driven by a pre-scripted list of commands and
/// prompt answers, for tests that exercise the REPL without a real
/// terminal (§9).
#[derive(Debug, Default)]
pub struct ScriptedFrontend {
    commands: std::collections::VecDeque<DebuggerCommand>,
    hex_addresses: std::collections::VecDeque<u64>,
    offset_sizes: std::collections::VecDeque<(i64, usize)>,
    stack_offsets: std::collections::VecDeque<i64>,
    modify_targets: std::collections::VecDeque<ModifyTarget>,
    filters: std::collections::VecDeque<String>,
    pub output: Vec<String>,
}

impl ScriptedFrontend {
    /// An empty script; `Continue` is returned forever once the script is
    /// exhausted, so a headless run terminates on the VM halting rather than
    /// looping on an empty command queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_command(&mut self, cmd: DebuggerCommand) -> &mut Self {
        self.commands.push_back(cmd);
        self
    }

    pub fn push_hex_address(&mut self, addr: u64) -> &mut Self {
        self.hex_addresses.push_back(addr);
        self
    }

    pub fn push_filter(&mut self, filter: impl Into<String>) -> &mut Self {
        self.filters.push_back(filter.into());
        self
    }
}

impl DebuggerFrontend for ScriptedFrontend {
    fn read_command(&mut self) -> DebuggerCommand {
        self.commands.pop_front().unwrap_or(DebuggerCommand::Continue)
    }

    fn prompt_hex_address(&mut self) -> Option<u64> {
        self.hex_addresses.pop_front()
    }

    fn prompt_offset_and_size(&mut self) -> Option<(i64, usize)> {
        self.offset_sizes.pop_front()
    }

    fn prompt_stack_offset(&mut self) -> Option<i64> {
        self.stack_offsets.pop_front()
    }

    fn prompt_modify(&mut self) -> Option<ModifyTarget> {
        self.modify_targets.pop_front()
    }

    fn prompt_filter(&mut self) -> Option<String> {
        self.filters.pop_front()
    }

    fn print_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_character_maps_to_unknown() {
        assert_eq!(DebuggerCommand::from_char('$'), DebuggerCommand::Unknown('$'));
    }

    #[test]
    fn every_documented_key_maps_to_a_named_command() {
        for c in "cnlfFbrpyimvowWsSqxz".chars() {
            assert_ne!(DebuggerCommand::from_char(c), DebuggerCommand::Unknown(c));
        }
    }

    #[test]
    fn scripted_frontend_replays_pushed_commands_then_defaults_to_continue() {
        let mut f = ScriptedFrontend::new();
        f.push_command(DebuggerCommand::StepInstruction);
        assert_eq!(f.read_command(), DebuggerCommand::StepInstruction);
        assert_eq!(f.read_command(), DebuggerCommand::Continue);
    }
}
