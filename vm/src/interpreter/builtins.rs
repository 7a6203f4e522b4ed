//! `CALL_BUILTIN` dispatcher (§4.4).
//!
//! Five fixed ids, keyed by the current integer value of the id register.
//! Allocator/library failures write `0` into the destination and are not
//! fatal (§7: "Builtin failure ... not fatal, debugger highlights
//! 'failed'"); an id outside `0..=4` is the fatal case (§4.4: "Unknown ids
//! are fatal").

use crate::error::FaultKind;
use crate::interpreter::host::{Allocator, HostEnv, LibraryLoader};
use crate::interpreter::Interpreter;
use vm_asm::RegId;

const BUILTIN_ALLOC: u64 = 0;
const BUILTIN_FREE: u64 = 1;
const BUILTIN_REALLOC: u64 = 2;
const BUILTIN_LOAD_LIBRARY: u64 = 3;
const BUILTIN_GET_PROC_ADDRESS: u64 = 4;

impl<H: HostEnv> Interpreter<H> {
    /// Read a null-terminated byte string out of the stack buffer starting
    /// at `ptr`, treating `ptr` as an absolute offset into the stack image
    /// (§4.4: "pointer to null-terminated name").
    fn read_c_string(&self, ptr: u64) -> Result<Vec<u8>, FaultKind> {
        let start = usize::try_from(ptr).map_err(|_| FaultKind::BadPointer(ptr))?;
        let mut out = Vec::new();
        let mut addr = start;
        loop {
            let byte = self
                .stack
                .window(addr, 1)
                .map_err(|_| FaultKind::BadPointer(ptr))?[0];
            if byte == 0 {
                break;
            }
            out.push(byte);
            addr += 1;
        }
        Ok(out)
    }

    /// `CALL_BUILTIN Rid, Rd` (§4.4).
    pub(crate) fn exec_call_builtin(&mut self, id_reg: RegId, dst: RegId) -> Result<(), FaultKind> {
        if !id_reg.is_integer() {
            return Err(FaultKind::TypeMismatch {
                expected: "integer",
                actual: "float",
            });
        }
        let id = self.registers.int(id_reg);
        let result = match id {
            BUILTIN_ALLOC => {
                let size = self.registers.int(RegId::new(1).expect("1 < REGISTER_COUNT"));
                self.host.alloc(size)
            }
            BUILTIN_FREE => {
                let ptr = self.registers.int(RegId::new(1).expect("1 < REGISTER_COUNT"));
                self.host.free(ptr);
                0
            }
            BUILTIN_REALLOC => {
                let ptr = self.registers.int(RegId::new(1).expect("1 < REGISTER_COUNT"));
                let size = self.registers.int(RegId::new(2).expect("2 < REGISTER_COUNT"));
                self.host.realloc(ptr, size)
            }
            BUILTIN_LOAD_LIBRARY => {
                let name_ptr = self.registers.int(RegId::new(1).expect("1 < REGISTER_COUNT"));
                let name = self.read_c_string(name_ptr)?;
                self.host.load_library(&name)
            }
            BUILTIN_GET_PROC_ADDRESS => {
                let handle = self.registers.int(RegId::new(1).expect("1 < REGISTER_COUNT"));
                let name_ptr = self.registers.int(RegId::new(2).expect("2 < REGISTER_COUNT"));
                let name = self.read_c_string(name_ptr)?;
                self.host.get_proc_address(handle, &name)
            }
            other => return Err(FaultKind::UnknownBuiltin(other)),
        };
        self.registers.set_raw_bits(dst, result);
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

    #[test]
    fn alloc_free_realloc_round_trip_through_builtins() {
        let mut vm = Interpreter::new(vec![], StackConfig::Default, DefaultHost::new());

        vm.registers.set_int(r(0), 0); // ALLOC
        vm.registers.set_int(r(1), 64);
        vm.exec_call_builtin(r(0), r(2)).unwrap();
        let ptr = vm.registers().int(r(2));
        assert_ne!(ptr, 0);

        vm.registers.set_int(r(0), 2); // REALLOC
        vm.registers.set_int(r(1), ptr);
        vm.registers.set_int(r(2), 128);
        vm.exec_call_builtin(r(0), r(3)).unwrap();
        assert_eq!(vm.registers().int(r(3)), ptr);

        vm.registers.set_int(r(0), 1); // FREE
        vm.registers.set_int(r(1), ptr);
        vm.exec_call_builtin(r(0), r(2)).unwrap();
    }

    #[test]
    fn unknown_builtin_id_is_fatal() {
        let mut vm = Interpreter::new(vec![], StackConfig::Default, DefaultHost::new());
        vm.registers.set_int(r(0), 99);
        assert_eq!(
            vm.exec_call_builtin(r(0), r(1)),
            Err(FaultKind::UnknownBuiltin(99))
        );
    }

    #[test]
    fn load_library_and_get_proc_address_always_fail_with_stub_loader() {
        let mut vm = Interpreter::new(vec![0u8; 0], StackConfig::WithSize(64), DefaultHost::new());
        // write a null-terminated name into the stack image at address 0.
        vm.stack.write_uint(0, 0, 1).unwrap();
        vm.registers.set_int(r(0), 3); // LOAD_LIBRARY
        vm.registers.set_int(r(1), 0);
        vm.exec_call_builtin(r(0), r(2)).unwrap();
        assert_eq!(vm.registers().int(r(2)), 0);
    }
}
