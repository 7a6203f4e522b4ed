use crate::fault::DecodeFault;
use crate::instruction::{Instruction, RuntimeParamId, Width};
use crate::opcode::Opcode;
use crate::reg::RegId;

/// Sequential reader over a code image (§4.1).
///
/// The decoder has no buffering and no state besides the borrowed code
/// slice: every call to [`Decoder::decode_at`] is independent, given an
/// address. The executor owns `ip` and advances it by the returned byte
/// count plus whatever control-transfer the instruction itself performs.
pub struct Decoder<'c> {
    code: &'c [u8],
}

/// A cursor into `code` used only while decoding a single instruction. Kept
/// private: callers only ever see the fully-decoded [`Instruction`].
struct Cursor<'c> {
    code: &'c [u8],
    ip: u64,
    pos: usize,
}

impl<'c> Cursor<'c> {
    fn read_u8(&mut self) -> Result<u8, DecodeFault> {
        let byte = *self.code.get(self.pos).ok_or(DecodeFault::Truncated {
            ip: self.ip,
            needed: 1,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], DecodeFault> {
        let end = self.pos + N;
        let slice = self.code.get(self.pos..end).ok_or(DecodeFault::Truncated {
            ip: self.ip,
            needed: end.saturating_sub(self.code.len()),
        })?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn reg(&mut self) -> Result<RegId, DecodeFault> {
        RegId::new(self.read_u8()?)
    }

    fn width(&mut self) -> Result<Width, DecodeFault> {
        Width::new(self.read_u8()?)
    }

    fn imm_u64(&mut self) -> Result<u64, DecodeFault> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>()?))
    }

    fn displacement(&mut self) -> Result<i64, DecodeFault> {
        Ok(i64::from_le_bytes(self.read_bytes::<8>()?))
    }
}

impl<'c> Decoder<'c> {
    /// Wrap a code image for decoding. Borrowed for the lifetime of the VM
    /// run — the decoder never copies or owns the program bytes.
    pub const fn new(code: &'c [u8]) -> Self {
        Self { code }
    }

    /// Length of the wrapped code image, in bytes.
    pub const fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Decode the instruction starting at byte offset `ip`.
    ///
    /// Returns the instruction and the number of bytes it occupied, so the
    /// caller can compute the address of the next instruction as
    /// `ip + consumed` before applying any relative jump (§4.1: "applied
    /// *after* the operand has been consumed").
    pub fn decode_at(&self, ip: u64) -> Result<(Instruction, u64), DecodeFault> {
        let start = usize::try_from(ip).map_err(|_| DecodeFault::Truncated { ip, needed: 1 })?;
        let mut cur = Cursor {
            code: self.code,
            ip,
            pos: start,
        };

        let opcode = Opcode::try_from(cur.read_u8()?)?;
        let instr = Self::decode_operands(opcode, &mut cur)?;
        let consumed = (cur.pos - start) as u64;
        Ok((instr, consumed))
    }

    fn decode_operands(opcode: Opcode, cur: &mut Cursor<'_>) -> Result<Instruction, DecodeFault> {
        use Opcode as Op;
        Ok(match opcode {
            Op::MovImmR => Instruction::MovImmR {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::MovRR => Instruction::MovRR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::MovRStack => Instruction::MovRStack {
                off: cur.displacement()?,
                src: cur.reg()?,
            },
            Op::MovRStackN => Instruction::MovRStackN {
                off: cur.displacement()?,
                src: cur.reg()?,
                width: cur.width()?,
            },
            Op::MovStackR => Instruction::MovStackR {
                dst: cur.reg()?,
                off: cur.displacement()?,
            },
            Op::MovStackStack => Instruction::MovStackStack {
                dst_off: cur.displacement()?,
                src_off: cur.displacement()?,
            },
            Op::MovStackStackN => Instruction::MovStackStackN {
                dst_off: cur.displacement()?,
                src_off: cur.displacement()?,
                width: cur.width()?,
            },
            Op::MovRPtrInR => Instruction::MovRPtrInR {
                ptr: cur.reg()?,
                src: cur.reg()?,
            },
            Op::MovRPtrInRN => Instruction::MovRPtrInRN {
                ptr: cur.reg()?,
                src: cur.reg()?,
                width: cur.width()?,
            },
            Op::MovPtrInRR => Instruction::MovPtrInRR {
                dst: cur.reg()?,
                ptr: cur.reg()?,
            },
            Op::LeaStack => Instruction::LeaStack {
                dst: cur.reg()?,
                off: cur.displacement()?,
            },

            Op::StackIncImm => Instruction::StackIncImm { imm: cur.displacement()? },
            Op::StackIncR => Instruction::StackIncR { src: cur.reg()? },
            Op::StackDecImm => Instruction::StackDecImm { imm: cur.displacement()? },
            Op::StackDecR => Instruction::StackDecR { src: cur.reg()? },
            Op::PushR => Instruction::PushR { src: cur.reg()? },
            Op::PopR => Instruction::PopR { dst: cur.reg()? },

            Op::AddImm => Instruction::AddImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::AddR => Instruction::AddR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::MuliImm => Instruction::MuliImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::MuliR => Instruction::MuliR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::DiviImm => Instruction::DiviImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::DiviR => Instruction::DiviR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::MuluImm => Instruction::MuluImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::MuluR => Instruction::MuluR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::DivuImm => Instruction::DivuImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::DivuR => Instruction::DivuR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::ModImm => Instruction::ModImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::ModR => Instruction::ModR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::BslR => Instruction::BslR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::BsrR => Instruction::BsrR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::AndImm => Instruction::AndImm {
                dst: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::AndR => Instruction::AndR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::OrR => Instruction::OrR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::XorR => Instruction::XorR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::LogicalAndR => Instruction::LogicalAndR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::LogicalOrR => Instruction::LogicalOrR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::NegateR => Instruction::NegateR { reg: cur.reg()? },
            Op::InvR => Instruction::InvR { reg: cur.reg()? },
            Op::NotR => Instruction::NotR { reg: cur.reg()? },
            Op::EqR => Instruction::EqR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::LtR => Instruction::LtR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },
            Op::GtR => Instruction::GtR {
                dst: cur.reg()?,
                src: cur.reg()?,
            },

            Op::CmpNeqImmR => Instruction::CmpNeqImmR {
                reg: cur.reg()?,
                imm: cur.imm_u64()?,
            },
            Op::Jcc => Instruction::Jcc { off: cur.displacement()? },
            Op::Jmp => Instruction::Jmp { off: cur.displacement()? },

            Op::CallInternal => Instruction::CallInternal { off: cur.displacement()? },
            Op::ReturnInternal => Instruction::ReturnInternal,
            Op::CallExternal => Instruction::CallExternal { dst: cur.reg()? },
            Op::CallBuiltin => Instruction::CallBuiltin {
                id_reg: cur.reg()?,
                dst: cur.reg()?,
            },

            Op::MovRuntimeParamR => Instruction::MovRuntimeParamR {
                id: RuntimeParamId::new(cur.read_u8()?)?,
                dst: cur.reg()?,
            },

            Op::Exit => Instruction::Exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exit_alone() {
        let code = [Opcode::Exit as u8];
        let dec = Decoder::new(&code);
        let (instr, consumed) = dec.decode_at(0).unwrap();
        assert_eq!(instr, Instruction::Exit);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn decodes_mov_imm_r() {
        let mut code = vec![Opcode::MovImmR as u8, 3];
        code.extend_from_slice(&7u64.to_le_bytes());
        let dec = Decoder::new(&code);
        let (instr, consumed) = dec.decode_at(0).unwrap();
        assert_eq!(
            instr,
            Instruction::MovImmR {
                dst: RegId::new(3).unwrap(),
                imm: 7,
            }
        );
        assert_eq!(consumed, 10);
    }

    #[test]
    fn truncated_instruction_is_a_decode_fault_not_a_panic() {
        let code = [Opcode::MovImmR as u8, 3, 1, 2, 3];
        let dec = Decoder::new(&code);
        let err = dec.decode_at(0).unwrap_err();
        assert!(matches!(err, DecodeFault::Truncated { ip: 0, .. }));
    }

    #[test]
    fn single_trailing_byte_fails_as_decode_fault() {
        let code = [Opcode::MovImmR as u8];
        let dec = Decoder::new(&code);
        let err = dec.decode_at(0).unwrap_err();
        assert!(matches!(err, DecodeFault::Truncated { ip: 0, needed: 1 }));
    }

    #[test]
    fn illegal_register_index_is_a_decode_fault() {
        let mut code = vec![Opcode::MovImmR as u8, 200];
        code.extend_from_slice(&0u64.to_le_bytes());
        let dec = Decoder::new(&code);
        assert_eq!(dec.decode_at(0).unwrap_err(), DecodeFault::IllegalRegister(200));
    }

    #[test]
    fn illegal_width_is_a_decode_fault() {
        let code = [Opcode::MovRStackN as u8, 0, 0, 0, 0, 0, 0, 0, 0, 3, 9];
        let dec = Decoder::new(&code);
        assert_eq!(dec.decode_at(0).unwrap_err(), DecodeFault::IllegalWidth(9));
    }
}
