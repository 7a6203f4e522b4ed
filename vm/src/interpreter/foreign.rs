//! Foreign-call parameter block (§4.3).
//!
//! `CALL_EXTERNAL` hands the bridge `sp`; everything below it on the stack
//! is the caller-laid block, walked top-down from `sp - 8`:
//!
//! ```text
//! sp -  8 : {tag, value}   (last parameter, if any)
//! sp - 24 : {tag, value}   (second-to-last parameter, if any)
//! ...
//! sp - 8k        : {tag == 0}  (terminator, no value half)
//! sp - 8k -  8    : return-type flag (0 = integer, 1 = float)
//! sp - 8k - 16    : target function address
//! ```
//!
//! Each `{tag, value}` pair occupies 16 bytes with the tag above the value
//! in memory (§4.3: "tag above value"), so consecutive pairs are 16 bytes
//! apart and the walk descends by 16 until the zero tag. The pair nearest
//! `sp` is read first but belongs to the *last* call argument; the parser
//! collects in read order and reverses once at the end to restore call
//! order.

use crate::error::FaultKind;
use crate::interpreter::host::{ForeignArg, ForeignTrampoline, HostEnv};
use crate::interpreter::Interpreter;
use crate::stack::Stack;

/// The fully-parsed contents of a parameter block: arguments in call order,
/// whether the callee returns a double, and the target address.
pub(crate) struct ForeignCall {
    pub(crate) args: Vec<ForeignArg>,
    pub(crate) returns_float: bool,
    pub(crate) target: u64,
}

fn parse_block(stack: &Stack, sp: usize) -> Result<ForeignCall, FaultKind> {
    let mut off: i64 = 8;
    let mut reversed = Vec::new();

    loop {
        let tag_addr = stack.resolve(sp, off, 8)?;
        let tag = stack.read_uint(tag_addr, 8)?;
        off += 8;

        if tag == 0 {
            break;
        }

        let value_addr = stack.resolve(sp, off, 8)?;
        let raw = stack.read_uint(value_addr, 8)?;
        off += 8;

        reversed.push(if tag == 1 {
            ForeignArg::Integer(raw)
        } else {
            ForeignArg::Float(f64::from_bits(raw))
        });
    }

    let returns_addr = stack.resolve(sp, off, 8)?;
    let returns_float = stack.read_uint(returns_addr, 8)? != 0;
    off += 8;

    let target_addr = stack.resolve(sp, off, 8)?;
    let target = stack.read_uint(target_addr, 8)?;

    reversed.reverse();
    Ok(ForeignCall {
        args: reversed,
        returns_float,
        target,
    })
}

impl<H: HostEnv> Interpreter<H> {
    /// `CALL_EXTERNAL Rd`: parse the parameter block below `sp`, invoke the
    /// bridge, and write the scalar result into `dst` (reinterpreted as a
    /// double when `dst` is a float register, §4.2).
    pub(crate) fn exec_call_external(&mut self, dst: vm_asm::RegId) -> Result<(), FaultKind> {
        let sp = self.sp as usize;
        let call = parse_block(&self.stack, sp)?;
        let raw = self.host.invoke(call.target, &call.args, call.returns_float);
        self.registers.set_raw_bits(dst, raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;
    use vm_asm::RegId;

    fn r(i: u8) -> RegId {
        RegId::new(i).unwrap()
    }

    /// Lay a block for `args` in call order. `parse_block` walks pairs
    /// nearest-`sp`-first and reverses at the end, so the pair nearest `sp`
    /// must be the *last* call argument — write `args` back-to-front.
    fn lay_block(buf: &mut [u8], sp: usize, args: &[(u64, u64)], returns_float: bool, target: u64) {
        let mut w = |addr: usize, v: u64| buf[addr..addr + 8].copy_from_slice(&v.to_le_bytes());
        let mut addr = sp;
        for (tag, value) in args.iter().rev() {
            addr -= 8;
            w(addr, *tag);
            addr -= 8;
            w(addr, *value);
        }
        addr -= 8;
        w(addr, 0); // terminator
        addr -= 8;
        w(addr, returns_float as u64);
        addr -= 8;
        w(addr, target);
    }

    #[test]
    fn parses_two_integer_args_and_invokes_target() {
        let mut buf = vec![0u8; 128];
        let sp = 96usize;
        lay_block(&mut buf, sp, &[(1, 2), (1, 3)], false, 0x1000);

        let stack = Stack::from_vec(buf);
        let parsed = parse_block(&stack, sp).unwrap();
        assert_eq!(parsed.target, 0x1000);
        assert!(!parsed.returns_float);
        assert_eq!(parsed.args, vec![ForeignArg::Integer(2), ForeignArg::Integer(3)]);
    }

    #[test]
    fn call_external_writes_scalar_into_destination() {
        let mut host = DefaultHost::new();
        host.foreign.register(0x1000, |args| match args {
            [ForeignArg::Integer(a), ForeignArg::Integer(b)] => a + b,
            _ => 0,
        });

        let mut buf = vec![0u8; 128];
        let sp = 96usize;
        lay_block(&mut buf, sp, &[(1, 2), (1, 3)], false, 0x1000);

        let mut vm = Interpreter::new(vec![], StackConfig::WithBuffer(buf), host);
        vm.set_stack_pointer(sp as u64);
        vm.exec_call_external(r(0)).unwrap();
        assert_eq!(vm.registers().int(r(0)), 5);
    }
}
