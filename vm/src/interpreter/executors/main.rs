//! Fetch/decode/execute loop (§2: "Executor is the hot loop").

use crate::error::InterpreterError;
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;
use tracing::{debug, error, trace};
use vm_asm::Decoder;

/// What happened during one [`Interpreter::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction ran; the VM is ready for another step.
    Continue,
    /// `EXIT` ran; the VM has nothing left to execute.
    Halted,
}

impl<H: HostEnv> Interpreter<H> {
    /// Decode and execute exactly one instruction at the current `ip`.
    ///
    /// This is the unit the debugger UI steps over (§4.6): the caller gets
    /// control back between every instruction whether or not a debug
    /// session is attached.
    pub fn step(&mut self) -> Result<StepOutcome, InterpreterError> {
        if self.halted {
            return Ok(StepOutcome::Halted);
        }

        let decoder = Decoder::new(&self.code);
        let ip = self.ip;
        let (instr, consumed) = decoder
            .decode_at(ip)
            .map_err(|fault| InterpreterError::at(ip, fault.into()))?;
        let ip_after_decode = ip + consumed;

        trace!(ip, ?instr, "executing instruction");
        self.execute(instr, ip_after_decode).map_err(|kind| {
            error!(ip, ?kind, "instruction fault");
            InterpreterError::at(ip, kind)
        })?;

        if self.halted {
            debug!(ip, "EXIT reached, halting");
            Ok(StepOutcome::Halted)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    /// Run to completion (or fault), with no debugger attached (§4.6
    /// describes the debugger as an optional overlay over this same loop).
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        loop {
            if self.step()? == StepOutcome::Halted {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;
    use vm_asm::{Opcode, RegId};

    fn assemble_mov_imm_r(dst: u8, imm: u64) -> Vec<u8> {
        let mut code = vec![Opcode::MovImmR as u8, dst];
        code.extend_from_slice(&imm.to_le_bytes());
        code
    }

    #[test]
    fn s1_add_two_integers() {
        let mut code = assemble_mov_imm_r(0, 2);
        code.extend(assemble_mov_imm_r(1, 3));
        code.push(Opcode::AddR as u8);
        code.push(0);
        code.push(1);
        code.push(Opcode::Exit as u8);

        let mut vm = Interpreter::new(code, StackConfig::Default, DefaultHost::new());
        vm.run().unwrap();
        assert_eq!(vm.registers().int(RegId::new(0).unwrap()), 5);
    }

    #[test]
    fn halting_twice_is_a_no_op() {
        let code = vec![Opcode::Exit as u8];
        let mut vm = Interpreter::new(code, StackConfig::Default, DefaultHost::new());
        assert_eq!(vm.step().unwrap(), StepOutcome::Halted);
        assert_eq!(vm.step().unwrap(), StepOutcome::Halted);
    }

    #[test]
    fn decode_fault_names_the_offending_address() {
        let code = vec![0xffu8];
        let mut vm = Interpreter::new(code, StackConfig::Default, DefaultHost::new());
        let err = vm.run().unwrap_err();
        match err {
            InterpreterError::Fault { ip, .. } => assert_eq!(ip, 0),
            InterpreterError::Io(_) => panic!("expected a fault, not an I/O error"),
        }
    }
}
