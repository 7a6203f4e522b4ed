//! Full dispatch over every decoded [`vm_asm::Instruction`] (§4.2).
//!
//! This is the one place that knows every opcode's Rust-level meaning; it
//! is deliberately a flat match rather than a trait-object table, mirroring
//! the teacher's single giant `match` in its instruction executor — the
//! compiler gets to check exhaustiveness for free when a new opcode is
//! added to `vm-asm`.

use crate::error::FaultKind;
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;
use vm_asm::Instruction;

impl<H: HostEnv> Interpreter<H> {
    /// Execute one already-decoded instruction. `ip_after_decode` is the
    /// address immediately following this instruction's bytes — the base
    /// that relative jump/call targets are added to (§4.1).
    pub(crate) fn execute(&mut self, instr: Instruction, ip_after_decode: u64) -> Result<(), FaultKind> {
        use Instruction as I;
        match instr {
            I::MovImmR { dst, imm } => {
                self.data_mov_imm_r(dst, imm);
                self.ip = ip_after_decode;
            }
            I::MovRR { dst, src } => {
                self.registers.mov_r_r(dst, src);
                self.ip = ip_after_decode;
            }
            I::MovRStack { off, src } => {
                self.data_mov_r_stack(off, src)?;
                self.ip = ip_after_decode;
            }
            I::MovRStackN { off, src, width } => {
                self.data_mov_r_stack_n(off, src, width)?;
                self.ip = ip_after_decode;
            }
            I::MovStackR { dst, off } => {
                self.data_mov_stack_r(dst, off)?;
                self.ip = ip_after_decode;
            }
            I::MovStackStack { dst_off, src_off } => {
                self.data_mov_stack_stack(dst_off, src_off)?;
                self.ip = ip_after_decode;
            }
            I::MovStackStackN { dst_off, src_off, width } => {
                self.data_mov_stack_stack_n(dst_off, src_off, width)?;
                self.ip = ip_after_decode;
            }
            I::MovRPtrInR { ptr, src } => {
                self.data_mov_r_ptrinr(ptr, src)?;
                self.ip = ip_after_decode;
            }
            I::MovRPtrInRN { ptr, src, width } => {
                self.data_mov_r_ptrinr_n(ptr, src, width)?;
                self.ip = ip_after_decode;
            }
            I::MovPtrInRR { dst, ptr } => {
                self.data_mov_ptrinr_r(dst, ptr)?;
                self.ip = ip_after_decode;
            }
            I::LeaStack { dst, off } => {
                self.data_lea_stack(dst, off)?;
                self.ip = ip_after_decode;
            }

            I::StackIncImm { imm } => {
                self.data_stack_inc_imm(imm)?;
                self.ip = ip_after_decode;
            }
            I::StackIncR { src } => {
                self.data_stack_inc_r(src)?;
                self.ip = ip_after_decode;
            }
            I::StackDecImm { imm } => {
                self.data_stack_dec_imm(imm)?;
                self.ip = ip_after_decode;
            }
            I::StackDecR { src } => {
                self.data_stack_dec_r(src)?;
                self.ip = ip_after_decode;
            }
            I::PushR { src } => {
                self.data_push_r(src)?;
                self.ip = ip_after_decode;
            }
            I::PopR { dst } => {
                self.data_pop_r(dst)?;
                self.ip = ip_after_decode;
            }

            I::AddImm { dst, imm } => {
                self.alu_add_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::AddR { dst, src } => {
                self.alu_add_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::MuliImm { dst, imm } => {
                self.alu_muli_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::MuliR { dst, src } => {
                self.alu_muli_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::DiviImm { dst, imm } => {
                self.alu_divi_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::DiviR { dst, src } => {
                self.alu_divi_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::MuluImm { dst, imm } => {
                self.alu_mulu_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::MuluR { dst, src } => {
                self.alu_mulu_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::DivuImm { dst, imm } => {
                self.alu_divu_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::DivuR { dst, src } => {
                self.alu_divu_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::ModImm { dst, imm } => {
                self.alu_mod_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::ModR { dst, src } => {
                self.alu_mod_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::BslR { dst, src } => {
                self.alu_bsl_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::BsrR { dst, src } => {
                self.alu_bsr_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::AndImm { dst, imm } => {
                self.alu_and_imm(dst, imm)?;
                self.ip = ip_after_decode;
            }
            I::AndR { dst, src } => {
                self.alu_and_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::OrR { dst, src } => {
                self.alu_or_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::XorR { dst, src } => {
                self.alu_xor_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::LogicalAndR { dst, src } => {
                self.alu_logical_and_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::LogicalOrR { dst, src } => {
                self.alu_logical_or_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::NegateR { reg } => {
                self.alu_negate_r(reg)?;
                self.ip = ip_after_decode;
            }
            I::InvR { reg } => {
                self.alu_inv_r(reg)?;
                self.ip = ip_after_decode;
            }
            I::NotR { reg } => {
                self.alu_not_r(reg)?;
                self.ip = ip_after_decode;
            }
            I::EqR { dst, src } => {
                self.alu_eq_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::LtR { dst, src } => {
                self.alu_lt_r(dst, src)?;
                self.ip = ip_after_decode;
            }
            I::GtR { dst, src } => {
                self.alu_gt_r(dst, src)?;
                self.ip = ip_after_decode;
            }

            I::CmpNeqImmR { reg, imm } => {
                self.alu_cmp_neq_imm_r(reg, imm)?;
                self.ip = ip_after_decode;
            }
            I::Jcc { off } => self.flow_jcc(ip_after_decode, off)?,
            I::Jmp { off } => self.flow_jmp(ip_after_decode, off)?,

            I::CallInternal { off } => self.flow_call_internal(ip_after_decode, off)?,
            I::ReturnInternal => self.flow_return_internal()?,
            I::CallExternal { dst } => {
                self.exec_call_external(dst)?;
                self.ip = ip_after_decode;
            }
            I::CallBuiltin { id_reg, dst } => {
                self.exec_call_builtin(id_reg, dst)?;
                self.ip = ip_after_decode;
            }

            I::MovRuntimeParamR { id, dst } => {
                self.data_mov_runtime_param_r(id, dst)?;
                self.ip = ip_after_decode;
            }

            I::Exit => {
                self.halted = true;
                self.ip = ip_after_decode;
            }
        }
        Ok(())
    }
}
