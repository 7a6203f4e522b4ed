use thiserror::Error;

/// Faults that can occur while reading the next [`crate::Instruction`] out of
/// the code stream (§4.1, §7 "Decode fault").
///
/// These are distinct from execution-time faults (illegal stack access,
/// unknown builtin id, ...) which the `vm` crate's `FaultKind` composes
/// alongside this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeFault {
    /// The code stream ended before a full instruction could be read.
    #[error("truncated instruction at ip={ip}: needed {needed} more byte(s)")]
    Truncated {
        /// Address of the opcode byte that started the truncated read.
        ip: u64,
        /// How many more bytes were needed.
        needed: usize,
    },
    /// The opcode byte does not name a known instruction.
    #[error("unknown opcode byte 0x{0:02x}")]
    UnknownOpcode(u8),
    /// A register-reference operand named an index `>= 16`.
    #[error("illegal register index {0} (must be < 16)")]
    IllegalRegister(u8),
    /// A width-in-bytes operand was not one of `{1, 2, 4, 8}`.
    #[error("illegal operand width {0} (must be 1, 2, 4 or 8)")]
    IllegalWidth(u8),
    /// A `MOV_RUNTIME_PARAM_R` id did not name a known runtime parameter.
    #[error("illegal runtime parameter id {0}")]
    IllegalRuntimeParamId(u8),
}
