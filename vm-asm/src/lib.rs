//! Wire format for `scriptvm` bytecode: the [`Opcode`] set, decoded
//! [`Instruction`]s, register references and the sequential [`Decoder`].
//!
//! This crate only describes *shape* — what bytes make up an instruction and
//! how they're validated on the way in. Instruction *semantics* live in the
//! `vm` crate's executor, which consumes the [`Instruction`] values this
//! crate produces.

#![warn(missing_docs)]

mod decoder;
mod fault;
mod instruction;
mod opcode;
mod reg;

pub use decoder::Decoder;
pub use fault::DecodeFault;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use reg::{RegClass, RegId};

/// Number of logical registers in the register file (§3).
pub const REGISTER_COUNT: u8 = 16;

/// First float register index; registers below this are integer registers.
pub const FLOAT_REG_BASE: u8 = 8;
