//! Descriptor resolution and the byte-layout encode routine.
//!
//! Every instruction follows one fixed protocol:
//!
//! ```text
//! [REX?] [opcode...] [ModRM [SIB] [disp]]? [imm]?
//! ```
//!
//! [`Encoding::resolve`] runs once per descriptor at catalog-build time: it
//! checks the descriptor invariants and fixes which operand slot feeds each
//! encoding field, so the encode path never searches operands by kind.
//! [`Encoding::encode`] is a pure function of the resolved descriptor and
//! the operand values; it reserves the worst-case byte bound up front and
//! commits only what it wrote, so a failed reservation leaves the buffer
//! untouched.

use crate::buffer::CodeBuffer;
use crate::descriptor::{Descriptor, ImmWidth, OperandKind};
use crate::error::{CapacityError, DescriptorError};
use crate::ir::{Gpr, Mem, Operand, Rm};

// ─── REX / ModR/M / SIB byte construction ───────────────────────────────

/// Build a REX prefix byte (`0100WRXB`).
#[inline]
fn rex(w: bool, r: bool, x: bool, b: bool) -> u8 {
    0x40 | (u8::from(w) << 3) | (u8::from(r) << 2) | (u8::from(x) << 1) | u8::from(b)
}

/// Build a ModR/M byte.
#[inline]
fn modrm(mod_: u8, reg: u8, rm: u8) -> u8 {
    (mod_ << 6) | ((reg & 7) << 3) | (rm & 7)
}

/// Build a SIB byte.
#[inline]
fn sib(scale: u8, index: u8, base: u8) -> u8 {
    (scale << 6) | ((index & 7) << 3) | (base & 7)
}

// ─── Write cursor over the reserved region ──────────────────────────────

#[inline]
fn put(region: &mut [u8], at: &mut usize, byte: u8) {
    region[*at] = byte;
    *at += 1;
}

/// Serialize an unsigned immediate little-endian at its declared width.
fn put_unsigned(region: &mut [u8], at: &mut usize, value: u32, width: ImmWidth) {
    match width {
        ImmWidth::B1 => {
            assert!(value <= 0xFF, "unsigned immediate {} exceeds one byte", value);
            put(region, at, value as u8);
        }
        ImmWidth::B4 => {
            for byte in value.to_le_bytes() {
                put(region, at, byte);
            }
        }
    }
}

/// Serialize a signed value two's-complement little-endian at its declared
/// width. Kept separate from the unsigned path — the range rules differ.
fn put_signed(region: &mut [u8], at: &mut usize, value: i32, width: ImmWidth) {
    match width {
        ImmWidth::B1 => {
            assert!(
                (-128..=127).contains(&value),
                "signed immediate {} exceeds one byte",
                value
            );
            put(region, at, value as u8);
        }
        ImmWidth::B4 => {
            for byte in value.to_le_bytes() {
                put(region, at, byte);
            }
        }
    }
}

// ─── Memory-form ModR/M + SIB + displacement ────────────────────────────

/// ModR/M mod field and displacement width for an indirect reference.
///
/// `[rbp]`, `[r13]`, `[rbp + index]`, and `[r13 + index]` can't be encoded
/// with a zero-size displacement (those bit patterns mean RIP-relative
/// addressing in the first case and displacement-only mode inside a SIB in
/// the others), so they get an 8-bit displacement of 0 instead.
fn select_disp(base: Gpr, disp: i32) -> (u8, Option<ImmWidth>) {
    if disp == 0 && base.low_bits() != 0b101 {
        (0b00, None)
    } else if (-128..=127).contains(&disp) {
        (0b01, Some(ImmWidth::B1))
    } else {
        (0b10, Some(ImmWidth::B4))
    }
}

fn emit_mem_modrm(region: &mut [u8], at: &mut usize, reg_bits: u8, mem: Mem) {
    let Some(base) = mem.base() else {
        // RIP-relative: mod=00, r/m=101, disp32 always.
        put(region, at, modrm(0b00, reg_bits, 0b101));
        put_signed(region, at, mem.disp(), ImmWidth::B4);
        return;
    };

    let (mod_bits, disp_width) = select_disp(base, mem.disp());

    // An index register, or RSP/R12 as base, needs the SIB escape (r/m=100);
    // SIB index 100 encodes "no index".
    if mem.index().is_some() || base.low_bits() == 0b100 {
        let (scale_bits, index_bits) = match mem.index() {
            Some((index, scale)) => (scale.bits(), index.low_bits()),
            None => (0b00, 0b100),
        };
        put(region, at, modrm(mod_bits, reg_bits, 0b100));
        put(region, at, sib(scale_bits, index_bits, base.low_bits()));
    } else {
        put(region, at, modrm(mod_bits, reg_bits, base.low_bits()));
    }

    if let Some(width) = disp_width {
        put_signed(region, at, mem.disp(), width);
    }
}

// ─── Resolved descriptors ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImmSlot {
    slot: usize,
    signed: bool,
    width: ImmWidth,
}

/// A validated descriptor with operand roles resolved to fixed slots and
/// the worst-case encoded length precomputed.
///
/// Produced by catalog construction; immutable and freely shared across
/// threads afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Encoding {
    name: &'static str,
    rex_w: bool,
    opcode: &'static [u8],
    /// ModR/M reg bits when no register-field operand exists.
    extension: u8,
    reg_slot: Option<usize>,
    rm_slot: Option<usize>,
    imm: Option<ImmSlot>,
    arity: usize,
    max_len: usize,
}

impl Encoding {
    /// Validate a descriptor and resolve its operand roles.
    pub(crate) fn resolve(descriptor: &Descriptor) -> Result<Encoding, DescriptorError> {
        let name = descriptor.name;

        if descriptor.opcode.is_empty() {
            return Err(DescriptorError::EmptyOpcode { name });
        }

        let mut reg_slot = None;
        let mut rm_slot = None;
        let mut imm = None;

        for (slot, spec) in descriptor.operands.iter().enumerate() {
            match spec.kind {
                OperandKind::Reg => {
                    if reg_slot.replace(slot).is_some() {
                        return Err(DescriptorError::DuplicateReg { name });
                    }
                }
                OperandKind::RegMem => {
                    if rm_slot.replace(slot).is_some() {
                        return Err(DescriptorError::DuplicateRegMem { name });
                    }
                }
                OperandKind::Unsigned(width) => {
                    let slot = ImmSlot {
                        slot,
                        signed: false,
                        width,
                    };
                    if imm.replace(slot).is_some() {
                        return Err(DescriptorError::DuplicateImmediate { name });
                    }
                }
                OperandKind::Signed(width) => {
                    let slot = ImmSlot {
                        slot,
                        signed: true,
                        width,
                    };
                    if imm.replace(slot).is_some() {
                        return Err(DescriptorError::DuplicateImmediate { name });
                    }
                }
            }
        }

        let extension = match descriptor.extension {
            Some(_) if reg_slot.is_some() => {
                return Err(DescriptorError::ExtensionWithReg { name });
            }
            Some(extension) if extension > 7 => {
                return Err(DescriptorError::ExtensionOutOfRange { name, extension });
            }
            Some(extension) => extension,
            None => 0,
        };

        // Worst case: REX + opcode + ModRM + (SIB + disp32) + immediate.
        let max_len = 1
            + descriptor.opcode.len()
            + usize::from(reg_slot.is_some() || rm_slot.is_some())
            + if rm_slot.is_some() { 5 } else { 0 }
            + imm.map_or(0, |imm| imm.width.bytes());

        Ok(Encoding {
            name,
            rex_w: descriptor.rex_w,
            opcode: descriptor.opcode,
            extension,
            reg_slot,
            rm_slot,
            imm,
            arity: descriptor.operands.len(),
            max_len,
        })
    }

    /// Instruction name, as declared by the descriptor.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Statically computed worst-case encoded length in bytes. No operand
    /// assignment makes `encode` write more than this.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of operand values `encode` expects.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Encode one instruction into `buf`.
    ///
    /// Operand values are given in declared order. On success the buffer's
    /// committed length advances by the encoded size; on `Err` the buffer is
    /// untouched.
    ///
    /// # Errors
    ///
    /// [`CapacityError`] when the buffer cannot reserve the worst-case
    /// bound.
    ///
    /// # Panics
    ///
    /// Panics if the operand values don't match the declared kinds or
    /// count — that is an API-misuse defect, not a runtime condition. The
    /// typed methods on [`Catalog`](crate::Catalog) make it unrepresentable.
    pub fn encode<B: CodeBuffer>(
        &self,
        buf: &mut B,
        operands: &[Operand],
    ) -> Result<(), CapacityError> {
        assert_eq!(
            operands.len(),
            self.arity,
            "{}: expected {} operand(s), got {}",
            self.name,
            self.arity,
            operands.len()
        );

        let reg = self.reg_slot.map(|slot| match operands[slot] {
            Operand::Reg(reg) => reg,
            other => panic!("{}: operand {} must be a register, got {:?}", self.name, slot, other),
        });
        let rm = self.rm_slot.map(|slot| match operands[slot] {
            Operand::Rm(rm) => rm,
            other => panic!(
                "{}: operand {} must be register-or-memory, got {:?}",
                self.name, slot, other
            ),
        });

        let region = buf.reserve(self.max_len).ok_or(CapacityError)?;
        let mut at = 0;

        // REX prefix: emitted iff any of W/R/X/B is set.
        let w = self.rex_w;
        let r = reg.is_some_and(Gpr::is_extended);
        let (x, b) = match rm {
            Some(Rm::Reg(reg)) => (false, reg.is_extended()),
            Some(Rm::Mem(mem)) => (mem.rex_x(), mem.rex_b()),
            None => (false, false),
        };
        if w || r || x || b {
            put(region, &mut at, rex(w, r, x, b));
        }

        for &byte in self.opcode {
            put(region, &mut at, byte);
        }

        // ModR/M reg bits: the register operand if declared, else the
        // opcode extension, else 0.
        let reg_bits = reg.map_or(self.extension, Gpr::low_bits);
        match rm {
            Some(Rm::Reg(reg)) => put(region, &mut at, modrm(0b11, reg_bits, reg.low_bits())),
            Some(Rm::Mem(mem)) => emit_mem_modrm(region, &mut at, reg_bits, mem),
            None => {}
        }

        if let Some(imm) = self.imm {
            match (imm.signed, operands[imm.slot]) {
                (false, Operand::Unsigned(value)) => put_unsigned(region, &mut at, value, imm.width),
                (true, Operand::Signed(value)) => put_signed(region, &mut at, value, imm.width),
                (_, other) => panic!(
                    "{}: operand {} has the wrong immediate kind: {:?}",
                    self.name, imm.slot, other
                ),
            }
        }

        buf.commit(at);
        Ok(())
    }
}
