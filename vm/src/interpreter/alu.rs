//! Arithmetic and logic helpers (§4.2, opcodes `0x20`-`0x39`).
//!
//! `ADD`/`MULI`/`DIVI`/`NEGATE` are class-dispatched: the destination
//! register's class decides whether the immediate/source operand is read as
//! a signed integer or a double, and register-register forms additionally
//! require both operands share a class (§4.2: "type-mixed operands ... are
//! fatal"). Everything else in this block — `MULU`/`DIVU`/`MOD`, the shifts,
//! the bitwise family, the boolean/compare family — only ever operates on
//! integer registers; giving any of them a float register is the same
//! `TypeMismatch` fault.

use crate::error::FaultKind;
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;
use vm_asm::{RegClass, RegId};

fn require_integer(r: RegId) -> Result<(), FaultKind> {
    if r.is_integer() {
        Ok(())
    } else {
        Err(FaultKind::TypeMismatch {
            expected: "integer",
            actual: "float",
        })
    }
}

fn require_same_class(dst: RegId, src: RegId) -> Result<(), FaultKind> {
    if dst.class() == src.class() {
        Ok(())
    } else {
        Err(FaultKind::TypeMismatch {
            expected: match dst.class() {
                RegClass::Integer => "integer",
                RegClass::Float => "float",
            },
            actual: match src.class() {
                RegClass::Integer => "integer",
                RegClass::Float => "float",
            },
        })
    }
}

impl<H: HostEnv> Interpreter<H> {
    /// `ADD_IMM`/`ADD_R`: wrapping signed/float add, class-dispatched by `dst`.
    pub(crate) fn alu_add_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        match dst.class() {
            RegClass::Integer => {
                let v = self.registers.int(dst) as i64;
                self.registers.set_int(dst, v.wrapping_add(imm as i64) as u64);
            }
            RegClass::Float => {
                let v = self.registers.float(dst);
                self.registers.set_float(dst, v + f64::from_bits(imm));
            }
        }
        Ok(())
    }

    pub(crate) fn alu_add_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_same_class(dst, src)?;
        match dst.class() {
            RegClass::Integer => {
                let a = self.registers.int(dst) as i64;
                let b = self.registers.int(src) as i64;
                self.registers.set_int(dst, a.wrapping_add(b) as u64);
            }
            RegClass::Float => {
                let a = self.registers.float(dst);
                let b = self.registers.float(src);
                self.registers.set_float(dst, a + b);
            }
        }
        Ok(())
    }

    /// `MULI_IMM`/`MULI_R`: signed/float multiply.
    pub(crate) fn alu_muli_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        match dst.class() {
            RegClass::Integer => {
                let v = self.registers.int(dst) as i64;
                self.registers.set_int(dst, v.wrapping_mul(imm as i64) as u64);
            }
            RegClass::Float => {
                let v = self.registers.float(dst);
                self.registers.set_float(dst, v * f64::from_bits(imm));
            }
        }
        Ok(())
    }

    pub(crate) fn alu_muli_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_same_class(dst, src)?;
        match dst.class() {
            RegClass::Integer => {
                let a = self.registers.int(dst) as i64;
                let b = self.registers.int(src) as i64;
                self.registers.set_int(dst, a.wrapping_mul(b) as u64);
            }
            RegClass::Float => {
                let a = self.registers.float(dst);
                let b = self.registers.float(src);
                self.registers.set_float(dst, a * b);
            }
        }
        Ok(())
    }

    /// `DIVI_IMM`/`DIVI_R`: signed/float divide. A zero integer divisor is a
    /// fatal [`FaultKind::DivisionByZero`]; a zero float divisor follows
    /// IEEE 754 and produces `inf`/`NaN`, same as the original host's raw
    /// hardware `fdiv`.
    pub(crate) fn alu_divi_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        match dst.class() {
            RegClass::Integer => {
                let divisor = imm as i64;
                if divisor == 0 {
                    return Err(FaultKind::DivisionByZero);
                }
                let v = self.registers.int(dst) as i64;
                self.registers.set_int(dst, v.wrapping_div(divisor) as u64);
            }
            RegClass::Float => {
                let v = self.registers.float(dst);
                self.registers.set_float(dst, v / f64::from_bits(imm));
            }
        }
        Ok(())
    }

    pub(crate) fn alu_divi_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_same_class(dst, src)?;
        match dst.class() {
            RegClass::Integer => {
                let divisor = self.registers.int(src) as i64;
                if divisor == 0 {
                    return Err(FaultKind::DivisionByZero);
                }
                let v = self.registers.int(dst) as i64;
                self.registers.set_int(dst, v.wrapping_div(divisor) as u64);
            }
            RegClass::Float => {
                let a = self.registers.float(dst);
                let b = self.registers.float(src);
                self.registers.set_float(dst, a / b);
            }
        }
        Ok(())
    }

    /// `MULU_IMM`/`MULU_R`: unsigned multiply, integer registers only.
    pub(crate) fn alu_mulu_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        require_integer(dst)?;
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v.wrapping_mul(imm));
        Ok(())
    }

    pub(crate) fn alu_mulu_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let a = self.registers.int(dst);
        let b = self.registers.int(src);
        self.registers.set_int(dst, a.wrapping_mul(b));
        Ok(())
    }

    /// `DIVU_IMM`/`DIVU_R`: unsigned divide, integer registers only. Zero
    /// divisor is fatal, same rationale as [`Self::alu_divi_imm`].
    pub(crate) fn alu_divu_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        require_integer(dst)?;
        if imm == 0 {
            return Err(FaultKind::DivisionByZero);
        }
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v / imm);
        Ok(())
    }

    pub(crate) fn alu_divu_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let divisor = self.registers.int(src);
        if divisor == 0 {
            return Err(FaultKind::DivisionByZero);
        }
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v / divisor);
        Ok(())
    }

    /// `MOD_IMM`/`MOD_R`: unsigned remainder, integer registers only.
    pub(crate) fn alu_mod_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        require_integer(dst)?;
        if imm == 0 {
            return Err(FaultKind::DivisionByZero);
        }
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v % imm);
        Ok(())
    }

    pub(crate) fn alu_mod_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let divisor = self.registers.int(src);
        if divisor == 0 {
            return Err(FaultKind::DivisionByZero);
        }
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v % divisor);
        Ok(())
    }

    /// `BSL_R`/`BSR_R`: logical shift left/right by the low byte of `src`
    /// (matching the original host's shift-amount truncation to a byte).
    pub(crate) fn alu_bsl_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let shift = (self.registers.int(src) & 0x3f) as u32;
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v.wrapping_shl(shift));
        Ok(())
    }

    pub(crate) fn alu_bsr_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let shift = (self.registers.int(src) & 0x3f) as u32;
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v.wrapping_shr(shift));
        Ok(())
    }

    /// `AND_IMM`/`AND_R`/`OR_R`/`XOR_R`: bitwise family, integer only.
    pub(crate) fn alu_and_imm(&mut self, dst: RegId, imm: u64) -> Result<(), FaultKind> {
        require_integer(dst)?;
        let v = self.registers.int(dst);
        self.registers.set_int(dst, v & imm);
        Ok(())
    }

    pub(crate) fn alu_and_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let v = self.registers.int(dst) & self.registers.int(src);
        self.registers.set_int(dst, v);
        Ok(())
    }

    pub(crate) fn alu_or_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let v = self.registers.int(dst) | self.registers.int(src);
        self.registers.set_int(dst, v);
        Ok(())
    }

    pub(crate) fn alu_xor_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let v = self.registers.int(dst) ^ self.registers.int(src);
        self.registers.set_int(dst, v);
        Ok(())
    }

    /// `LOGICAL_AND_R`/`LOGICAL_OR_R`: boolean `{0,1}` assignment (§9, Open
    /// Question resolved from the original host: both operands are treated
    /// as `nonzero == true`, and the result is written back as `{0, 1}`, not
    /// the raw bitwise value).
    pub(crate) fn alu_logical_and_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let result = (self.registers.int(dst) != 0) && (self.registers.int(src) != 0);
        self.registers.set_int(dst, result as u64);
        Ok(())
    }

    pub(crate) fn alu_logical_or_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let result = (self.registers.int(dst) != 0) || (self.registers.int(src) != 0);
        self.registers.set_int(dst, result as u64);
        Ok(())
    }

    /// `NEGATE_R`: arithmetic negation, class-dispatched.
    pub(crate) fn alu_negate_r(&mut self, reg: RegId) -> Result<(), FaultKind> {
        match reg.class() {
            RegClass::Integer => {
                let v = self.registers.int(reg) as i64;
                self.registers.set_int(reg, v.wrapping_neg() as u64);
            }
            RegClass::Float => {
                let v = self.registers.float(reg);
                self.registers.set_float(reg, -v);
            }
        }
        Ok(())
    }

    /// `INV_R`: bitwise complement, integer only.
    pub(crate) fn alu_inv_r(&mut self, reg: RegId) -> Result<(), FaultKind> {
        require_integer(reg)?;
        let v = self.registers.int(reg);
        self.registers.set_int(reg, !v);
        Ok(())
    }

    /// `NOT_R`: boolean negation, integer only, result in `{0, 1}`.
    pub(crate) fn alu_not_r(&mut self, reg: RegId) -> Result<(), FaultKind> {
        require_integer(reg)?;
        let v = self.registers.int(reg);
        self.registers.set_int(reg, (v == 0) as u64);
        Ok(())
    }

    /// `EQ_R`/`LT_R`/`GT_R`: unsigned comparison, integer only, result
    /// written into `dst` as `{0, 1}`.
    pub(crate) fn alu_eq_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let result = self.registers.int(dst) == self.registers.int(src);
        self.registers.set_int(dst, result as u64);
        Ok(())
    }

    pub(crate) fn alu_lt_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let result = self.registers.int(dst) < self.registers.int(src);
        self.registers.set_int(dst, result as u64);
        Ok(())
    }

    pub(crate) fn alu_gt_r(&mut self, dst: RegId, src: RegId) -> Result<(), FaultKind> {
        require_integer(dst)?;
        require_integer(src)?;
        let result = self.registers.int(dst) > self.registers.int(src);
        self.registers.set_int(dst, result as u64);
        Ok(())
    }

    /// `CMP_NEQ_IMM_R`: sets the compare flag to `reg != imm`, integer only
    /// (§9, Open Question resolved from the original host: the comparison
    /// is unsigned and the flag records inequality, not equality).
    pub(crate) fn alu_cmp_neq_imm_r(&mut self, reg: RegId, imm: u64) -> Result<(), FaultKind> {
        require_integer(reg)?;
        self.compare_flag = self.registers.int(reg) != imm;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;
    use vm_asm::RegId;

    fn vm() -> Interpreter<DefaultHost> {
        Interpreter::new(vec![], StackConfig::Default, DefaultHost::new())
    }

    fn r(i: u8) -> RegId {
        RegId::new(i).unwrap()
    }

    #[test]
    fn signed_division_by_zero_is_fatal() {
        let mut vm = vm();
        vm.registers.set_int(r(0), 10);
        assert_eq!(vm.alu_divi_imm(r(0), 0), Err(FaultKind::DivisionByZero));
    }

    #[test]
    fn unsigned_division_and_modulus_agree_with_hardware_semantics() {
        let mut vm = vm();
        vm.registers.set_int(r(0), 17);
        vm.registers.set_int(r(1), 5);
        vm.alu_divu_r(r(0), r(1)).unwrap();
        assert_eq!(vm.registers.int(r(0)), 3);

        vm.registers.set_int(r(0), 17);
        vm.alu_mod_r(r(0), r(1)).unwrap();
        assert_eq!(vm.registers.int(r(0)), 2);
    }

    #[test]
    fn type_mixed_operand_is_a_fault() {
        let mut vm = vm();
        assert!(vm.alu_add_r(r(0), r(8)).is_err());
    }

    #[test]
    fn logical_and_or_write_boolean_not_bitwise() {
        let mut vm = vm();
        vm.registers.set_int(r(0), 2);
        vm.registers.set_int(r(1), 4);
        vm.alu_logical_and_r(r(0), r(1)).unwrap();
        assert_eq!(vm.registers.int(r(0)), 1);
    }

    #[test]
    fn float_division_by_zero_follows_ieee754_not_a_fault() {
        let mut vm = vm();
        vm.registers.set_float(r(8), 1.0);
        vm.alu_divi_imm(r(8), 0.0f64.to_bits()).unwrap();
        assert!(vm.registers.float(r(8)).is_infinite());
    }
}
