//! The fetch/decode/execute loop and the per-instruction dispatch table
//! (§2: "Executor — the hot loop").

pub mod instruction;
pub mod main;

pub use main::StepOutcome;
