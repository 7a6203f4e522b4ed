//! Control transfer: `JMP`/`JCC`/`CALL_INTERNAL`/`RETURN_INTERNAL` (§4.2,
//! opcodes `0x41`-`0x51`).
//!
//! Every relative target here is applied to `ip` *after* the instruction's
//! operands have been consumed — the decoder already advanced past the
//! whole instruction before the executor runs, so `new_ip = ip_after_decode
//! + off` (§4.2: "the displacement is relative to the address immediately
//! following the instruction").
//!
//! `CALL_INTERNAL`/`RETURN_INTERNAL` do not touch `sp` at all (§3: "No
//! separate frame data structure: return addresses are pushed ... at the
//! current sp"; §4.2: "write current ip ... to stack[sp] ... the callee is
//! expected to have reserved space"). The 8-byte slot at `sp` is simply
//! overwritten, then read back; it is the script's job to have moved `sp`
//! to a fresh slot first if it wants nested calls to nest correctly.

use crate::error::FaultKind;
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;

impl<H: HostEnv> Interpreter<H> {
    fn relative_target(&self, ip_after_decode: u64, off: i64) -> Result<u64, FaultKind> {
        let target = (ip_after_decode as i64)
            .checked_add(off)
            .filter(|t| *t >= 0)
            .ok_or(FaultKind::IpBounds {
                ip: ip_after_decode,
                code_len: self.code.len(),
            })?;
        let target = target as u64;
        if target as usize > self.code.len() {
            return Err(FaultKind::IpBounds {
                ip: target,
                code_len: self.code.len(),
            });
        }
        Ok(target)
    }

    /// `JMP off`: unconditional relative jump.
    pub(crate) fn flow_jmp(&mut self, ip_after_decode: u64, off: i64) -> Result<(), FaultKind> {
        self.ip = self.relative_target(ip_after_decode, off)?;
        Ok(())
    }

    /// `JCC off`: relative jump taken only if the compare flag is set
    /// (§3: "a single volatile compare flag").
    pub(crate) fn flow_jcc(&mut self, ip_after_decode: u64, off: i64) -> Result<(), FaultKind> {
        self.ip = if self.compare_flag {
            self.relative_target(ip_after_decode, off)?
        } else {
            ip_after_decode
        };
        Ok(())
    }

    /// `CALL_INTERNAL off`: overwrite `stack[sp]` with the return address
    /// and jump. Bumps the logical call-depth counter the debugger tracks.
    pub(crate) fn flow_call_internal(&mut self, ip_after_decode: u64, off: i64) -> Result<(), FaultKind> {
        let target = self.relative_target(ip_after_decode, off)?;
        let addr = self.stack.resolve(self.sp as usize, 0, 8)?;
        self.stack.write_uint(addr, ip_after_decode, 8)?;
        self.call_depth += 1;
        self.ip = target;
        Ok(())
    }

    /// `RETURN_INTERNAL`: read the return address back out of `stack[sp]`
    /// and resume there. Returning with no open call is fatal (§7: "call
    /// depth underflow").
    pub(crate) fn flow_return_internal(&mut self) -> Result<(), FaultKind> {
        self.call_depth = self.call_depth.checked_sub(1).ok_or(FaultKind::CallDepthUnderflow)?;
        let addr = self.stack.resolve(self.sp as usize, 0, 8)?;
        self.ip = self.stack.read_uint(addr, 8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;

    fn vm(code_len: usize) -> Interpreter<DefaultHost> {
        Interpreter::new(vec![0u8; code_len], StackConfig::Default, DefaultHost::new())
    }

    #[test]
    fn unconditional_jump_applies_offset_after_decode_point() {
        let mut vm = vm(64);
        vm.flow_jmp(10, 5).unwrap();
        assert_eq!(vm.ip(), 15);
    }

    #[test]
    fn conditional_jump_falls_through_when_flag_clear() {
        let mut vm = vm(64);
        vm.compare_flag = false;
        vm.flow_jcc(10, 5).unwrap();
        assert_eq!(vm.ip(), 10);
    }

    #[test]
    fn call_then_return_restores_ip_and_depth() {
        let mut vm = vm(64);
        vm.set_stack_pointer(16);
        vm.flow_call_internal(10, 20).unwrap();
        assert_eq!(vm.ip(), 30);
        assert_eq!(vm.call_depth(), 1);
        vm.flow_return_internal().unwrap();
        assert_eq!(vm.ip(), 10);
        assert_eq!(vm.call_depth(), 0);
    }

    #[test]
    fn return_with_no_open_call_is_fatal() {
        let mut vm = vm(64);
        assert_eq!(vm.flow_return_internal(), Err(FaultKind::CallDepthUnderflow));
    }
}
