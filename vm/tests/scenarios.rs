//! End-to-end scenarios S2-S6 (§8: "Each is expressed as a short instruction
//! listing executed from a zeroed state with a 1 KiB stack"). S1 is covered
//! inline in `interpreter::executors::main`'s unit tests, where the fetch
//! loop it exercises lives.

use vm::interpreter::host::{DefaultHost, ForeignArg, RegistryTrampoline};
use vm::interpreter::{Interpreter, StackConfig};
use vm_asm::{Opcode, RegId};

const STACK_1KIB: usize = 1024;

fn reg(i: u8) -> RegId {
    RegId::new(i).unwrap()
}

fn mov_imm_r(dst: u8, imm: u64) -> Vec<u8> {
    let mut code = vec![Opcode::MovImmR as u8, dst];
    code.extend_from_slice(&imm.to_le_bytes());
    code
}

#[test]
fn s2_unsigned_division_and_modulus() {
    let mut code = mov_imm_r(0, 17);
    code.extend(mov_imm_r(1, 5));
    code.extend(mov_imm_r(2, 17));
    code.extend(mov_imm_r(3, 5));
    code.push(Opcode::DivuR as u8);
    code.push(0);
    code.push(1);
    code.push(Opcode::ModR as u8);
    code.push(2);
    code.push(3);
    code.push(Opcode::Exit as u8);

    let mut vm = Interpreter::new(code, StackConfig::WithSize(STACK_1KIB), DefaultHost::new());
    vm.run().unwrap();
    assert_eq!(vm.registers().int(reg(0)), 3);
    assert_eq!(vm.registers().int(reg(2)), 2);
}

#[test]
fn s3_call_and_return_preserves_ip() {
    // PUSH_R r0 (reserve a slot); CALL_INTERNAL +K to a callee that sets
    // r0 = 42 and returns; EXIT.
    let push = vec![Opcode::PushR as u8, 0];
    let callee = {
        let mut c = mov_imm_r(0, 42);
        c.push(Opcode::ReturnInternal as u8);
        c
    };
    // CALL_INTERNAL's displacement is relative to the address right after
    // its own operand (§4.1), i.e. right after this 9-byte instruction.
    let call_len = 1 + 8; // opcode + i64 displacement
    let call_offset = call_len as i64;
    let mut call = vec![Opcode::CallInternal as u8];
    call.extend_from_slice(&call_offset.to_le_bytes());

    let mut code = push;
    code.extend(call);
    code.extend(callee);
    code.push(Opcode::Exit as u8);

    let mut vm = Interpreter::new(code, StackConfig::WithSize(STACK_1KIB), DefaultHost::new());
    vm.run().unwrap();
    assert_eq!(vm.registers().int(reg(0)), 42);
    assert!(vm.halted());
}

#[test]
fn s4_conditional_branch_not_taken() {
    // MOV_IMM_R r0, 5; CMP_NEQ_IMM_R r0, 5; JCC +J; MOV_IMM_R r1, 111; EXIT;
    // (at +J:) MOV_IMM_R r1, 222; EXIT
    let mut code = mov_imm_r(0, 5);
    code.push(Opcode::CmpNeqImmR as u8);
    code.push(0);
    code.extend_from_slice(&5u64.to_le_bytes());

    let not_taken = {
        let mut c = mov_imm_r(1, 111);
        c.push(Opcode::Exit as u8);
        c
    };
    let jcc_len = 1 + 8;
    let jump_target_offset = not_taken.len() as i64;
    code.push(Opcode::Jcc as u8);
    code.extend_from_slice(&jump_target_offset.to_le_bytes());
    let _ = jcc_len;
    code.extend(not_taken);

    let mut taken = mov_imm_r(1, 222);
    taken.push(Opcode::Exit as u8);
    code.extend(taken);

    let mut vm = Interpreter::new(code, StackConfig::WithSize(STACK_1KIB), DefaultHost::new());
    vm.run().unwrap();
    assert_eq!(vm.registers().int(reg(1)), 111);
}

#[test]
fn s5_stack_round_trip() {
    let mut code = mov_imm_r(0, 0xDEAD_BEEF_CAFE_BABE);
    code.push(Opcode::StackIncImm as u8);
    code.extend_from_slice(&8i64.to_le_bytes());
    code.push(Opcode::MovRStack as u8);
    code.extend_from_slice(&8i64.to_le_bytes());
    code.push(0);
    code.push(Opcode::MovStackR as u8);
    code.push(1);
    code.extend_from_slice(&8i64.to_le_bytes());
    code.push(Opcode::Exit as u8);

    let mut vm = Interpreter::new(code, StackConfig::WithSize(STACK_1KIB), DefaultHost::new());
    vm.run().unwrap();
    assert_eq!(vm.registers().int(reg(1)), 0xDEAD_BEEF_CAFE_BABE);
}

#[test]
fn s6_builtin_alloc_free() {
    // r0 = 0 (ALLOC id); r1 = 128 (size); CALL_BUILTIN r0, r2;
    // r0 = 1 (FREE id); r1 = r2 (ptr to free); CALL_BUILTIN r0, r2; EXIT
    let mut code = mov_imm_r(0, 0);
    code.extend(mov_imm_r(1, 128));
    code.push(Opcode::CallBuiltin as u8);
    code.push(0);
    code.push(2);
    code.extend(mov_imm_r(0, 1));
    code.push(Opcode::MovRR as u8);
    code.push(1);
    code.push(2);
    code.push(Opcode::CallBuiltin as u8);
    code.push(0);
    code.push(2);
    code.push(Opcode::Exit as u8);

    let mut vm = Interpreter::new(code, StackConfig::WithSize(STACK_1KIB), DefaultHost::new());
    vm.run().unwrap();
    assert!(vm.halted());
}

#[test]
fn call_external_marshals_two_integer_arguments() {
    let mut host = DefaultHost::new();
    host.foreign = RegistryTrampoline::new();
    host.foreign.register(0x1234, |args| match args {
        [ForeignArg::Integer(a), ForeignArg::Integer(b)] => a + b,
        _ => 0,
    });

    let mut vm = Interpreter::new(
        vec![Opcode::CallExternal as u8, 0],
        StackConfig::WithSize(STACK_1KIB),
        host,
    );

    // Lay the block descending from `sp` (§4.3: walked top-down from
    // `sp - 8`): {tag=1,value=3}, {tag=1,value=4}, terminator, return-type
    // flag, target address.
    let sp = 256usize;
    let mut addr = sp;
    {
        let stack = vm.stack_mut();
        let mut write_down = |v: u64| {
            addr -= 8;
            stack.write_uint(addr, v, 8).unwrap();
        };
        write_down(1); // second pair's tag, written first since we descend
        write_down(4);
        write_down(1);
        write_down(3);
        write_down(0); // terminator
        write_down(0); // returns_float = false
        write_down(0x1234); // target
    }
    vm.set_stack_pointer(sp as u64);
    vm.run().unwrap();
    assert_eq!(vm.registers().int(reg(0)), 7);
}
