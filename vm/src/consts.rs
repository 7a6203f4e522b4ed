//! VM parameters (§3, §6).
//!
//! Register-file sizing (`REGISTER_COUNT`, `FLOAT_REG_BASE`) lives in
//! `vm_asm`, not here — the instruction set already owns that shape, and
//! every use site in this crate imports it from there.

/// Default stack size: 24 KiB (§6).
pub const DEFAULT_STACK_SIZE: usize = 24 * 1024;

/// Smallest stack size the VM will accept (§3: "must be >= some reasonable floor").
pub const MIN_STACK_SIZE: usize = 4 * 1024;

/// Number of recent-values tracker slots (§3, §4.8: "a fixed-size array (>=10 slots)").
pub const RECENT_VALUES_SLOTS: usize = 16;
