#![cfg(not(target_arch = "wasm32"))]
//! Property-based tests using proptest.
//!
//! These verify encoder invariants across large, randomly generated operand
//! spaces — complementing the byte-exact tables and the iced-x86
//! cross-validation tests.

use iced_x86::{Decoder, DecoderOptions, Mnemonic};
use proptest::prelude::*;
use x64_emit::{Catalog, CodeBuffer, CodeVec, FixedBuffer, Gpr, Mem, Op, Rm, Scale};

// ─── Strategies ──────────────────────────────────────────────────────────

fn arb_gpr() -> impl Strategy<Value = Gpr> {
    prop::sample::select(Gpr::ALL.to_vec())
}

/// Any register valid as a SIB index (everything but RSP).
fn arb_index() -> impl Strategy<Value = Gpr> {
    arb_gpr().prop_filter("rsp cannot be a SIB index", |reg| *reg != Gpr::Rsp)
}

fn arb_scale() -> impl Strategy<Value = Scale> {
    prop::sample::select(Scale::ALL.to_vec())
}

fn arb_mem() -> impl Strategy<Value = Mem> {
    prop_oneof![
        (arb_gpr(), any::<i32>()).prop_map(|(base, disp)| Mem::indirect_disp(base, disp)),
        (arb_gpr(), arb_index(), arb_scale(), any::<i32>()).prop_map(
            |(base, index, scale, disp)| Mem::indirect_indexed(base, index, scale, disp)
        ),
        any::<i32>().prop_map(Mem::rip_relative),
    ]
}

fn arb_rm() -> impl Strategy<Value = Rm> {
    prop_oneof![arb_gpr().prop_map(Rm::Reg), arb_mem().prop_map(Rm::Mem)]
}

/// Whether any register carried by the operand needs a REX extension bit.
fn rm_has_extended(rm: &Rm) -> bool {
    match rm {
        Rm::Reg(reg) => reg.is_extended(),
        Rm::Mem(mem) => {
            mem.base().is_some_and(|base| base.is_extended())
                || mem.index().is_some_and(|(index, _)| index.is_extended())
        }
    }
}

// ─── Properties ──────────────────────────────────────────────────────────

proptest! {
    /// The encoded length never exceeds the static bound, and the same
    /// operands always produce the same bytes.
    #[test]
    fn mov64_bounded_and_deterministic(dst in arb_gpr(), rm in arb_rm()) {
        let catalog = Catalog::builtin().unwrap();

        let mut first = CodeVec::new();
        catalog.mov64(&mut first, dst, rm).unwrap();
        let mut second = CodeVec::new();
        catalog.mov64(&mut second, dst, rm).unwrap();

        prop_assert!(first.len() <= catalog.op(Op::Mov64).max_len());
        prop_assert_eq!(first.as_slice(), second.as_slice());
    }

    /// REX presence is a pure function of the operand's register codes:
    /// call has no forced REX.W, so the prefix appears exactly when some
    /// register code is ≥ 8.
    #[test]
    fn call_rex_presence_is_pure(rm in arb_rm()) {
        let catalog = Catalog::builtin().unwrap();
        let mut buf = CodeVec::new();
        catalog.call(&mut buf, rm).unwrap();
        let code = buf.as_slice();

        let has_rex = (code[0] & 0xF0) == 0x40;
        prop_assert_eq!(has_rex, rm_has_extended(&rm));
        if !has_rex {
            prop_assert_eq!(code[0], 0xFF);
        }
    }

    /// The ModR/M reg field always carries call's opcode extension (/2),
    /// whatever the addressing form.
    #[test]
    fn call_modrm_reg_field_is_extension(rm in arb_rm()) {
        let catalog = Catalog::builtin().unwrap();
        let mut buf = CodeVec::new();
        catalog.call(&mut buf, rm).unwrap();
        let code = buf.as_slice();

        let opcode_at = usize::from((code[0] & 0xF0) == 0x40);
        prop_assert_eq!(code[opcode_at], 0xFF);
        let modrm = code[opcode_at + 1];
        prop_assert_eq!((modrm >> 3) & 7, 0x02);
    }

    /// A failed reservation is side-effect-free: the committed length stays
    /// put and nothing is written to the backing store.
    #[test]
    fn failed_reserve_writes_nothing(rm in arb_rm(), index in any::<u8>(), capacity in 0usize..=10) {
        let catalog = Catalog::builtin().unwrap();
        let mut backing = [0u8; 10];
        let mut buf = FixedBuffer::new(&mut backing[..capacity]);

        let before = buf.len();
        match catalog.bt64(&mut buf, rm, index) {
            Ok(()) => {
                prop_assert!(buf.len() <= capacity);
                prop_assert!(buf.len() > before);
            }
            Err(_) => {
                prop_assert_eq!(buf.len(), before);
                prop_assert!(buf.as_slice().is_empty());
                drop(buf);
                prop_assert_eq!(backing, [0u8; 10]);
            }
        }
    }

    /// Everything the encoder produces is a single valid instruction for an
    /// independent decoder, with no stray bytes.
    #[test]
    fn mov64_always_decodes(dst in arb_gpr(), rm in arb_rm()) {
        let catalog = Catalog::builtin().unwrap();
        let mut buf = CodeVec::new();
        catalog.mov64(&mut buf, dst, rm).unwrap();
        let code = buf.as_slice();

        let mut decoder = Decoder::with_ip(64, code, 0, DecoderOptions::NONE);
        let instr = decoder.decode();
        prop_assert_eq!(instr.mnemonic(), Mnemonic::Mov);
        prop_assert_eq!(instr.len(), code.len());
    }

    /// The displacement width decision is canonical: zero displacements on
    /// non-RBP/R13 bases add no displacement bytes, small ones add one,
    /// large ones add four.
    #[test]
    fn displacement_width_is_minimal(base in arb_gpr(), disp in any::<i32>()) {
        let catalog = Catalog::builtin().unwrap();
        let mut buf = CodeVec::new();
        catalog.call(&mut buf, Mem::indirect_disp(base, disp)).unwrap();

        let rex = usize::from(base.is_extended());
        let sib = usize::from(base.code() & 7 == 0b100);
        let disp_bytes = if disp == 0 && base.code() & 7 != 0b101 {
            0
        } else if (-128..=127).contains(&disp) {
            1
        } else {
            4
        };
        // REX? + opcode + ModRM + SIB? + disp
        prop_assert_eq!(buf.len(), rex + 2 + sib + disp_bytes);
    }
}
