use crate::fault::DecodeFault;

/// The complete instruction set (§4.2), one byte per opcode.
///
/// Discriminants are explicit and stable: they are the on-disk encoding
/// produced by the external compiler (§1), not an implementation detail, so
/// they must never be renumbered once a compiler targets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[non_exhaustive]
pub enum Opcode {
    // --- data movement ---
    MovImmR = 0x00,
    MovRR = 0x01,
    MovRStack = 0x02,
    MovRStackN = 0x03,
    MovStackR = 0x04,
    MovStackStack = 0x05,
    MovStackStackN = 0x06,
    MovRPtrInR = 0x07,
    MovRPtrInRN = 0x08,
    MovPtrInRR = 0x09,
    LeaStack = 0x0a,

    // --- stack pointer ---
    StackIncImm = 0x10,
    StackIncR = 0x11,
    StackDecImm = 0x12,
    StackDecR = 0x13,
    PushR = 0x14,
    PopR = 0x15,

    // --- arithmetic / logic ---
    AddImm = 0x20,
    AddR = 0x21,
    MuliImm = 0x22,
    MuliR = 0x23,
    DiviImm = 0x24,
    DiviR = 0x25,
    MuluImm = 0x26,
    MuluR = 0x27,
    DivuImm = 0x28,
    DivuR = 0x29,
    ModImm = 0x2a,
    ModR = 0x2b,
    BslR = 0x2c,
    BsrR = 0x2d,
    AndImm = 0x2e,
    AndR = 0x2f,
    OrR = 0x30,
    XorR = 0x31,
    LogicalAndR = 0x32,
    LogicalOrR = 0x33,
    NegateR = 0x34,
    InvR = 0x35,
    NotR = 0x36,
    EqR = 0x37,
    LtR = 0x38,
    GtR = 0x39,

    // --- compare and branch ---
    CmpNeqImmR = 0x40,
    Jcc = 0x41,
    Jmp = 0x42,

    // --- calls ---
    CallInternal = 0x50,
    ReturnInternal = 0x51,
    CallExternal = 0x52,
    CallBuiltin = 0x53,

    // --- runtime parameters ---
    MovRuntimeParamR = 0x60,

    // --- termination ---
    Exit = 0x70,
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeFault;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match byte {
            0x00 => MovImmR,
            0x01 => MovRR,
            0x02 => MovRStack,
            0x03 => MovRStackN,
            0x04 => MovStackR,
            0x05 => MovStackStack,
            0x06 => MovStackStackN,
            0x07 => MovRPtrInR,
            0x08 => MovRPtrInRN,
            0x09 => MovPtrInRR,
            0x0a => LeaStack,

            0x10 => StackIncImm,
            0x11 => StackIncR,
            0x12 => StackDecImm,
            0x13 => StackDecR,
            0x14 => PushR,
            0x15 => PopR,

            0x20 => AddImm,
            0x21 => AddR,
            0x22 => MuliImm,
            0x23 => MuliR,
            0x24 => DiviImm,
            0x25 => DiviR,
            0x26 => MuluImm,
            0x27 => MuluR,
            0x28 => DivuImm,
            0x29 => DivuR,
            0x2a => ModImm,
            0x2b => ModR,
            0x2c => BslR,
            0x2d => BsrR,
            0x2e => AndImm,
            0x2f => AndR,
            0x30 => OrR,
            0x31 => XorR,
            0x32 => LogicalAndR,
            0x33 => LogicalOrR,
            0x34 => NegateR,
            0x35 => InvR,
            0x36 => NotR,
            0x37 => EqR,
            0x38 => LtR,
            0x39 => GtR,

            0x40 => CmpNeqImmR,
            0x41 => Jcc,
            0x42 => Jmp,

            0x50 => CallInternal,
            0x51 => ReturnInternal,
            0x52 => CallExternal,
            0x53 => CallBuiltin,

            0x60 => MovRuntimeParamR,

            0x70 => Exit,

            other => return Err(DecodeFault::UnknownOpcode(other)),
        })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn round_trips_every_opcode_through_its_byte() {
        for op in Opcode::iter() {
            let byte: u8 = op.into();
            assert_eq!(Opcode::try_from(byte), Ok(op));
        }
    }

    #[test]
    fn rejects_unassigned_bytes() {
        assert_eq!(Opcode::try_from(0xff), Err(DecodeFault::UnknownOpcode(0xff)));
    }
}
