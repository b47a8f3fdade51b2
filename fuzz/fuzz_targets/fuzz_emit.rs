#![no_main]
//! Fuzz the typed emission surface with arbitrary operand combinations.
//!
//! Emitting well-formed operands must never panic: every call either
//! commits a complete instruction or reports a capacity failure. The
//! harness also checks the committed length never exceeds the per-entry
//! worst-case bound.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use x64_emit::{Catalog, CodeBuffer, CodeVec, FixedBuffer, Gpr, Mem, Op, Rm, Scale};

#[derive(Debug, Arbitrary)]
enum ArbMem {
    Indirect { base: u8 },
    IndirectDisp { base: u8, disp: i32 },
    Indexed { base: u8, index: u8, scale: u8, disp: i32 },
    RipRelative { disp: i32 },
}

impl ArbMem {
    fn build(&self) -> Mem {
        let reg = |code: u8| Gpr::from_code(code & 0x0F).unwrap();
        // RSP cannot be a SIB index; remap it rather than reject the input.
        let index_reg = |code: u8| {
            let index = reg(code);
            if index == Gpr::Rsp {
                Gpr::Rax
            } else {
                index
            }
        };
        let scale_of = |bits: u8| Scale::ALL[usize::from(bits & 3)];
        match *self {
            ArbMem::Indirect { base } => Mem::indirect(reg(base)),
            ArbMem::IndirectDisp { base, disp } => Mem::indirect_disp(reg(base), disp),
            ArbMem::Indexed {
                base,
                index,
                scale,
                disp,
            } => Mem::indirect_indexed(reg(base), index_reg(index), scale_of(scale), disp),
            ArbMem::RipRelative { disp } => Mem::rip_relative(disp),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum ArbRm {
    Reg { code: u8 },
    Mem(ArbMem),
}

impl ArbRm {
    fn build(&self) -> Rm {
        match self {
            ArbRm::Reg { code } => Rm::Reg(Gpr::from_code(code & 0x0F).unwrap()),
            ArbRm::Mem(mem) => Rm::Mem(mem.build()),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Request {
    Mov64 { dst: u8, src: ArbRm },
    Store64 { dst: ArbRm, src: u8 },
    Call { callee: ArbRm },
    Push64 { operand: ArbRm },
    Bt64 { bitstring: ArbRm, index: u8 },
    Bt32 { bitstring: ArbRm, index: u8 },
    Bts32 { bitstring: ArbRm, index: u8 },
    Cmp64 { operand: ArbRm, value: i8 },
    Lea64 { dst: u8, address: ArbMem },
}

impl Request {
    fn op(&self) -> Op {
        match self {
            Request::Mov64 { .. } => Op::Mov64,
            Request::Store64 { .. } => Op::Store64,
            Request::Call { .. } => Op::Call,
            Request::Push64 { .. } => Op::Push64,
            Request::Bt64 { .. } => Op::Bt64,
            Request::Bt32 { .. } => Op::Bt32,
            Request::Bts32 { .. } => Op::Bts32,
            Request::Cmp64 { .. } => Op::Cmp64,
            Request::Lea64 { .. } => Op::Lea64,
        }
    }

    fn emit<B: CodeBuffer>(&self, catalog: &Catalog, buf: &mut B) -> bool {
        let reg = |code: &u8| Gpr::from_code(code & 0x0F).unwrap();
        let result = match self {
            Request::Mov64 { dst, src } => catalog.mov64(buf, reg(dst), src.build()),
            Request::Store64 { dst, src } => catalog.store64(buf, dst.build(), reg(src)),
            Request::Call { callee } => catalog.call(buf, callee.build()),
            Request::Push64 { operand } => catalog.push64(buf, operand.build()),
            Request::Bt64 { bitstring, index } => catalog.bt64(buf, bitstring.build(), *index),
            Request::Bt32 { bitstring, index } => catalog.bt32(buf, bitstring.build(), *index),
            Request::Bts32 { bitstring, index } => catalog.bts32(buf, bitstring.build(), *index),
            Request::Cmp64 { operand, value } => catalog.cmp64(buf, operand.build(), *value),
            Request::Lea64 { dst, address } => catalog.lea64(buf, reg(dst), address.build()),
        };
        result.is_ok()
    }
}

fuzz_target!(|requests: Vec<Request>| {
    let catalog = Catalog::builtin().unwrap();

    // Growable buffer: every emit must succeed and stay within its bound.
    let mut code = CodeVec::new();
    for request in &requests {
        let before = code.len();
        assert!(request.emit(&catalog, &mut code));
        assert!(code.len() - before <= catalog.op(request.op()).max_len());
    }

    // Fixed buffer: emits may fail, but a failure must not move the end.
    let mut backing = [0u8; 48];
    let mut fixed = FixedBuffer::new(&mut backing);
    for request in &requests {
        let before = fixed.len();
        if !request.emit(&catalog, &mut fixed) {
            assert_eq!(fixed.len(), before);
        }
    }
});
