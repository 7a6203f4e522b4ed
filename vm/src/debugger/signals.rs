//! Interrupt/fault interception as a scoped resource rather than global
//! handler state (§4.9, §9: "model as a scoped registration that is
//! installed when the VM enters and uninstalled before it returns").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a real `^C` handler would set; a [`SignalGuard`] just reads
/// and clears it on the REPL's behalf. Kept as a plain `Arc<AtomicBool>`
/// rather than a trait object: the only thing that needs to cross the
/// handler/REPL boundary is one bit.
#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag (what a real signal handler would do; exposed here so
    /// a test can simulate `^C` without installing an OS handler).
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Read and clear the flag in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// A scoped interrupt registration (§4.9: "on a user interrupt, the handler
/// sets `step_pending = true`"). Constructing one is the "install", and
/// dropping it is the "uninstall before it returns" — there is no global
/// mutable handler table, just this guard's own [`InterruptFlag`].
pub struct SignalGuard {
    flag: InterruptFlag,
}

impl SignalGuard {
    /// Install a fresh guard sharing `flag` with whatever raises interrupts
    /// (a real `^C` handler in a binary, or a test driver).
    pub fn new(flag: InterruptFlag) -> Self {
        Self { flag }
    }

    /// Whether an interrupt arrived since the last call; consuming it here
    /// mirrors the one-shot nature of re-entering the REPL once per `^C`
    /// (§7: "a second interrupt at the prompt exits").
    pub fn poll(&self) -> bool {
        self.flag.take()
    }
}

/// What to print when an asynchronous fatal fault interrupts execution
/// outside the REPL's normal step boundary (§4.9: "dumps the recent-values
/// tracker, registers, and stack offset, then lets the default handling
/// proceed").
pub struct CrashReport {
    pub registers: [u64; vm_asm::REGISTER_COUNT as usize],
    pub ip: u64,
    pub sp: u64,
    pub tracker_lines: Vec<String>,
}

impl CrashReport {
    /// Render the report as the lines a [`super::frontend::DebuggerFrontend`]
    /// would print, one crash-report field per line.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("fatal fault at ip=0x{:x}, sp=0x{:x}", self.ip, self.sp)];
        for (i, word) in self.registers.iter().enumerate() {
            lines.push(format!("r{i} = 0x{word:016x}"));
        }
        lines.push("recent values:".to_string());
        lines.extend(self.tracker_lines.iter().cloned());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_flag_is_cleared_by_take() {
        let flag = InterruptFlag::new();
        assert!(!flag.take());
        flag.raise();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn signal_guard_polls_the_shared_flag() {
        let flag = InterruptFlag::new();
        let guard = SignalGuard::new(flag.clone());
        assert!(!guard.poll());
        flag.raise();
        assert!(guard.poll());
    }

    #[test]
    fn crash_report_renders_registers_and_tracker_lines() {
        let report = CrashReport {
            registers: [0u64; vm_asm::REGISTER_COUNT as usize],
            ip: 0x10,
            sp: 0x20,
            tracker_lines: vec!["x = 5".to_string()],
        };
        let rendered = report.render();
        assert!(rendered[0].contains("0x10"));
        assert!(rendered.iter().any(|l| l == "x = 5"));
    }
}
