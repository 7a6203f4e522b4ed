use crate::fault::DecodeFault;
use crate::reg::RegId;

/// A partial-store/partial-load width, one of `{1, 2, 4, 8}` bytes (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Width(u8);

impl Width {
    /// Validate a raw width byte.
    pub fn new(raw: u8) -> Result<Self, DecodeFault> {
        match raw {
            1 | 2 | 4 | 8 => Ok(Self(raw)),
            other => Err(DecodeFault::IllegalWidth(other)),
        }
    }

    /// The width in bytes.
    pub const fn bytes(self) -> usize {
        self.0 as usize
    }
}

/// The runtime-parameter ids readable by `MOV_RUNTIME_PARAM_R` (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuntimeParamId {
    /// Base address of the loaded code image.
    CodeBasePointer,
    /// The current instruction pointer, at the point the instruction runs.
    CurrentIp,
    /// Base address of the stack buffer.
    StackBasePointer,
}

impl RuntimeParamId {
    /// Validate a raw id byte. Any other id is fatal (§4.2).
    pub fn new(raw: u8) -> Result<Self, DecodeFault> {
        match raw {
            0 => Ok(Self::CodeBasePointer),
            1 => Ok(Self::CurrentIp),
            2 => Ok(Self::StackBasePointer),
            other => Err(DecodeFault::IllegalRuntimeParamId(other)),
        }
    }
}

/// A fully decoded instruction, ready for the executor (§4.2).
///
/// Immediate operands that can carry either an integer or a double (`imm`
/// fields below) are stored as raw `u64` bit patterns: the decoder does not
/// know which interpretation applies, because that depends on the *register
/// class* of the destination, which is an executor-time concern (§4.2,
/// `MOV_IMM_R`). Call [`u64::from_ne_bytes`]/[`f64::from_bits`] at the use
/// site, never here.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    /// `MOV_IMM_R R, imm`
    MovImmR { dst: RegId, imm: u64 },
    /// `MOV_R_R Rd, Rs`
    MovRR { dst: RegId, src: RegId },
    /// `MOV_R_STACK off, Rs`
    MovRStack { off: i64, src: RegId },
    /// `MOV_R_STACK_N off, Rs, n`
    MovRStackN { off: i64, src: RegId, width: Width },
    /// `MOV_STACK_R Rd, off`
    MovStackR { dst: RegId, off: i64 },
    /// `MOV_STACK_STACK dst_off, src_off`
    MovStackStack { dst_off: i64, src_off: i64 },
    /// `MOV_STACK_STACK_N dst_off, src_off, n`
    MovStackStackN { dst_off: i64, src_off: i64, width: Width },
    /// `MOV_R_PTRINR Rp, Rs`
    MovRPtrInR { ptr: RegId, src: RegId },
    /// `MOV_R_PTRINR_N Rp, Rs, n`
    MovRPtrInRN { ptr: RegId, src: RegId, width: Width },
    /// `MOV_PTRINR_R Rd, Rp`
    MovPtrInRR { dst: RegId, ptr: RegId },
    /// `LEA_STACK Rd, off`
    LeaStack { dst: RegId, off: i64 },

    /// `STACK_INC_IMM i`
    StackIncImm { imm: i64 },
    /// `STACK_INC_R R`
    StackIncR { src: RegId },
    /// `STACK_DEC_IMM i`
    StackDecImm { imm: i64 },
    /// `STACK_DEC_R R`
    StackDecR { src: RegId },
    /// `PUSH_R R`
    PushR { src: RegId },
    /// `POP_R R`
    PopR { dst: RegId },

    /// `ADD_IMM R, imm`
    AddImm { dst: RegId, imm: u64 },
    /// `ADD_R Rd, Rs`
    AddR { dst: RegId, src: RegId },
    /// `MULI_IMM R, imm`
    MuliImm { dst: RegId, imm: u64 },
    /// `MULI_R Rd, Rs`
    MuliR { dst: RegId, src: RegId },
    /// `DIVI_IMM R, imm`
    DiviImm { dst: RegId, imm: u64 },
    /// `DIVI_R Rd, Rs`
    DiviR { dst: RegId, src: RegId },
    /// `MULU_IMM R, imm`
    MuluImm { dst: RegId, imm: u64 },
    /// `MULU_R Rd, Rs`
    MuluR { dst: RegId, src: RegId },
    /// `DIVU_IMM R, imm`
    DivuImm { dst: RegId, imm: u64 },
    /// `DIVU_R Rd, Rs`
    DivuR { dst: RegId, src: RegId },
    /// `MOD_IMM R, imm`
    ModImm { dst: RegId, imm: u64 },
    /// `MOD_R Rd, Rs`
    ModR { dst: RegId, src: RegId },
    /// `BSL_R Rd, Rs`
    BslR { dst: RegId, src: RegId },
    /// `BSR_R Rd, Rs`
    BsrR { dst: RegId, src: RegId },
    /// `AND_IMM`
    AndImm { dst: RegId, imm: u64 },
    /// `AND_R`
    AndR { dst: RegId, src: RegId },
    /// `OR_R`
    OrR { dst: RegId, src: RegId },
    /// `XOR_R`
    XorR { dst: RegId, src: RegId },
    /// `LOGICAL_AND_R Rd, Rs`
    LogicalAndR { dst: RegId, src: RegId },
    /// `LOGICAL_OR_R Rd, Rs`
    LogicalOrR { dst: RegId, src: RegId },
    /// `NEGATE_R R`
    NegateR { reg: RegId },
    /// `INV_R R`
    InvR { reg: RegId },
    /// `NOT_R R`
    NotR { reg: RegId },
    /// `EQ_R Rd, Rs`
    EqR { dst: RegId, src: RegId },
    /// `LT_R Rd, Rs`
    LtR { dst: RegId, src: RegId },
    /// `GT_R Rd, Rs`
    GtR { dst: RegId, src: RegId },

    /// `CMP_NEQ_IMM_R R, imm`
    CmpNeqImmR { reg: RegId, imm: u64 },
    /// `JCC off`
    Jcc { off: i64 },
    /// `JMP off`
    Jmp { off: i64 },

    /// `CALL_INTERNAL off`
    CallInternal { off: i64 },
    /// `RETURN_INTERNAL`
    ReturnInternal,
    /// `CALL_EXTERNAL Rd`
    CallExternal { dst: RegId },
    /// `CALL_BUILTIN Rid, Rd`
    CallBuiltin { id_reg: RegId, dst: RegId },

    /// `MOV_RUNTIME_PARAM_R id, Rd`
    MovRuntimeParamR { id: RuntimeParamId, dst: RegId },

    /// `EXIT`
    Exit,
}
