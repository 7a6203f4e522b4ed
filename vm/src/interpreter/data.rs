//! Data-movement and stack-pointer opcodes (§4.2, opcodes `0x00`-`0x15`).
//!
//! Every pointer dereference here (`MOV_R_PTRINR`/`MOV_R_PTRINR_N`/
//! `MOV_PTRINR_R`) treats the register's value as an absolute offset into
//! the stack buffer — the only directly addressable memory region this
//! crate models (§1: heap blocks returned by `ALLOC` are opaque handles,
//! not addresses into a flat space). A pointer outside the buffer is
//! [`FaultKind::BadPointer`], not [`FaultKind::StackBounds`]: §7 lists it as
//! its own fault kind, and the debugger's guarded-read rule (§4.7) treats
//! dereference failures differently from ordinary stack over/underflow.

use crate::error::FaultKind;
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;
use vm_asm::{RegId, RuntimeParamId, Width};

impl<H: HostEnv> Interpreter<H> {
    /// `MOV_IMM_R R, imm`.
    pub(crate) fn data_mov_imm_r(&mut self, dst: RegId, imm: u64) {
        self.registers.set_raw_bits(dst, imm);
    }

    /// `MOV_R_STACK off, Rs`: write 8 bytes of `Rs` to `stack[sp-off]`.
    pub(crate) fn data_mov_r_stack(&mut self, off: i64, src: RegId) -> Result<(), FaultKind> {
        let addr = self.stack.resolve(self.sp as usize, off, 8)?;
        let bits = self.registers.raw_bits(src);
        self.stack.write_uint(addr, bits, 8)
    }

    /// `MOV_R_STACK_N off, Rs, n`: write the low `n` bytes of `Rs`. The
    /// slot's remaining upper bytes are left as whatever was already on the
    /// stack, not zero-extended.
    pub(crate) fn data_mov_r_stack_n(&mut self, off: i64, src: RegId, width: Width) -> Result<(), FaultKind> {
        let addr = self.stack.resolve(self.sp as usize, off, width.bytes())?;
        let bits = self.registers.raw_bits(src);
        self.stack.write_uint(addr, bits, width.bytes())
    }

    /// `MOV_STACK_R Rd, off`: read 8 bytes from `stack[sp-off]` into `Rd`.
    pub(crate) fn data_mov_stack_r(&mut self, dst: RegId, off: i64) -> Result<(), FaultKind> {
        let addr = self.stack.resolve(self.sp as usize, off, 8)?;
        let bits = self.stack.read_uint(addr, 8)?;
        self.registers.set_raw_bits(dst, bits);
        Ok(())
    }

    /// `MOV_STACK_STACK dst_off, src_off`: copy 8 bytes.
    pub(crate) fn data_mov_stack_stack(&mut self, dst_off: i64, src_off: i64) -> Result<(), FaultKind> {
        let dst = self.stack.resolve(self.sp as usize, dst_off, 8)?;
        let src = self.stack.resolve(self.sp as usize, src_off, 8)?;
        self.stack.copy_within(dst, src, 8)
    }

    /// `MOV_STACK_STACK_N dst_off, src_off, n`: copy `n` bytes.
    pub(crate) fn data_mov_stack_stack_n(&mut self, dst_off: i64, src_off: i64, width: Width) -> Result<(), FaultKind> {
        let dst = self.stack.resolve(self.sp as usize, dst_off, width.bytes())?;
        let src = self.stack.resolve(self.sp as usize, src_off, width.bytes())?;
        self.stack.copy_within(dst, src, width.bytes())
    }

    /// `MOV_R_PTRINR Rp, Rs`: write 8 bytes of `Rs` to `*Rp`.
    pub(crate) fn data_mov_r_ptrinr(&mut self, ptr: RegId, src: RegId) -> Result<(), FaultKind> {
        if !ptr.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let address = self.registers.int(ptr);
        let addr = usize::try_from(address).map_err(|_| FaultKind::BadPointer(address))?;
        let bits = self.registers.raw_bits(src);
        self.stack
            .write_uint(addr, bits, 8)
            .map_err(|_| FaultKind::BadPointer(address))
    }

    /// `MOV_R_PTRINR_N Rp, Rs, n`: write the low `n` bytes.
    pub(crate) fn data_mov_r_ptrinr_n(&mut self, ptr: RegId, src: RegId, width: Width) -> Result<(), FaultKind> {
        if !ptr.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let address = self.registers.int(ptr);
        let addr = usize::try_from(address).map_err(|_| FaultKind::BadPointer(address))?;
        let bits = self.registers.raw_bits(src);
        self.stack
            .write_uint(addr, bits, width.bytes())
            .map_err(|_| FaultKind::BadPointer(address))
    }

    /// `MOV_PTRINR_R Rd, Rp`: read 8 bytes at `*Rp` into `Rd`.
    pub(crate) fn data_mov_ptrinr_r(&mut self, dst: RegId, ptr: RegId) -> Result<(), FaultKind> {
        if !ptr.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let address = self.registers.int(ptr);
        let addr = usize::try_from(address).map_err(|_| FaultKind::BadPointer(address))?;
        let bits = self
            .stack
            .read_uint(addr, 8)
            .map_err(|_| FaultKind::BadPointer(address))?;
        self.registers.set_raw_bits(dst, bits);
        Ok(())
    }

    /// `LEA_STACK Rd, off`: `Rd` ← address of `stack[sp-off]` (integer only).
    pub(crate) fn data_lea_stack(&mut self, dst: RegId, off: i64) -> Result<(), FaultKind> {
        if !dst.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let addr = self.stack.resolve(self.sp as usize, off, 1)?;
        self.registers.set_int(dst, addr as u64);
        Ok(())
    }

    fn move_sp(&mut self, delta: i64) -> Result<(), FaultKind> {
        let new_sp = (self.sp as i64)
            .checked_add(delta)
            .filter(|s| *s >= 0 && *s as usize <= self.stack.len())
            .ok_or(FaultKind::StackBounds {
                sp: self.sp as usize,
                delta,
                stack_size: self.stack.len(),
            })?;
        self.sp = new_sp as u64;
        Ok(())
    }

    /// `STACK_INC_IMM i`.
    pub(crate) fn data_stack_inc_imm(&mut self, imm: i64) -> Result<(), FaultKind> {
        self.move_sp(imm)
    }

    /// `STACK_INC_R R`.
    pub(crate) fn data_stack_inc_r(&mut self, src: RegId) -> Result<(), FaultKind> {
        if !src.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let delta = self.registers.int(src) as i64;
        self.move_sp(delta)
    }

    /// `STACK_DEC_IMM i`.
    pub(crate) fn data_stack_dec_imm(&mut self, imm: i64) -> Result<(), FaultKind> {
        self.move_sp(-imm)
    }

    /// `STACK_DEC_R R`.
    pub(crate) fn data_stack_dec_r(&mut self, src: RegId) -> Result<(), FaultKind> {
        if !src.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let delta = self.registers.int(src) as i64;
        self.move_sp(-delta)
    }

    /// `PUSH_R R`: write 8 bytes of `R` to `stack[sp]`, then `sp += 8`.
    pub(crate) fn data_push_r(&mut self, src: RegId) -> Result<(), FaultKind> {
        let addr = self.stack.resolve(self.sp as usize, 0, 8)?;
        let bits = self.registers.raw_bits(src);
        self.stack.write_uint(addr, bits, 8)?;
        self.move_sp(8)
    }

    /// `POP_R R`: `sp -= 8`, then read 8 bytes into `R`.
    pub(crate) fn data_pop_r(&mut self, dst: RegId) -> Result<(), FaultKind> {
        self.move_sp(-8)?;
        let addr = self.stack.resolve(self.sp as usize, 0, 8)?;
        let bits = self.stack.read_uint(addr, 8)?;
        self.registers.set_raw_bits(dst, bits);
        Ok(())
    }

    /// `MOV_RUNTIME_PARAM_R id, Rd` (§4.2).
    ///
    /// `CodeBasePointer`/`StackBasePointer` are synthetic zero bases: this
    /// crate has no single flat address space spanning code and stack the
    /// way the original process image did, so both "pointers" are offsets
    /// from `0` within their own buffer rather than real process addresses.
    pub(crate) fn data_mov_runtime_param_r(&mut self, id: RuntimeParamId, dst: RegId) -> Result<(), FaultKind> {
        if !dst.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let value = match id {
            RuntimeParamId::CodeBasePointer => 0,
            RuntimeParamId::CurrentIp => self.ip,
            RuntimeParamId::StackBasePointer => 0,
        };
        self.registers.set_int(dst, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;

    fn r(i: u8) -> RegId {
        RegId::new(i).unwrap()
    }

    fn vm() -> Interpreter<DefaultHost> {
        Interpreter::new(vec![], StackConfig::WithSize(256), DefaultHost::new())
    }

    #[test]
    fn push_then_pop_round_trips_through_stack_pointer_motion() {
        let mut vm = vm();
        vm.registers.set_int(r(0), 0xABCD);
        vm.data_push_r(r(0)).unwrap();
        assert_eq!(vm.stack_pointer(), 8);
        vm.data_pop_r(r(1)).unwrap();
        assert_eq!(vm.stack_pointer(), 0);
        assert_eq!(vm.registers().int(r(1)), 0xABCD);
    }

    #[test]
    fn negative_displacement_write_then_read_round_trips() {
        let mut vm = vm();
        vm.set_stack_pointer(16);
        vm.registers.set_int(r(0), 99);
        vm.data_mov_r_stack(8, r(0)).unwrap();
        vm.data_mov_stack_r(r(1), 8).unwrap();
        assert_eq!(vm.registers().int(r(1)), 99);
    }

    #[test]
    fn pointer_dereference_out_of_range_is_bad_pointer_not_stack_bounds() {
        let mut vm = vm();
        vm.registers.set_int(r(0), 1_000_000);
        vm.registers.set_int(r(1), 1);
        assert_eq!(vm.data_mov_r_ptrinr(r(0), r(1)), Err(FaultKind::BadPointer(1_000_000)));
    }

    #[test]
    fn stack_pointer_motion_is_bounds_checked() {
        let mut vm = vm();
        assert!(vm.data_stack_dec_imm(1).is_err());
    }
}
