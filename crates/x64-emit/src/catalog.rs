//! The instruction catalog: a validated, immutable set of descriptors and
//! the typed emission surface built from it.
//!
//! [`Catalog::new`] performs the one-time validation/resolution pass over a
//! descriptor table. A malformed descriptor is a configuration defect — the
//! catalog refuses to finish building and no encoder exists for the entry.
//! Once built, a catalog is read-only and safely shared across threads.

use alloc::vec::Vec;

use crate::buffer::CodeBuffer;
use crate::descriptor::{Descriptor, ImmWidth, OperandKind, OperandSpec};
use crate::encoder::Encoding;
use crate::error::{CapacityError, DescriptorError};
use crate::ir::{Gpr, Mem, Operand, Rm};

/// The built-in descriptor table.
///
/// Entry order matches [`Op`].
pub const BUILTIN: &[Descriptor] = &[
    Descriptor {
        name: "mov64",
        rex_w: true,
        opcode: &[0x8B],
        extension: None,
        operands: &[
            OperandSpec {
                name: "destination",
                kind: OperandKind::Reg,
            },
            OperandSpec {
                name: "source",
                kind: OperandKind::RegMem,
            },
        ],
    },
    Descriptor {
        name: "store64",
        rex_w: true,
        opcode: &[0x89],
        extension: None,
        operands: &[
            OperandSpec {
                name: "destination",
                kind: OperandKind::RegMem,
            },
            OperandSpec {
                name: "source",
                kind: OperandKind::Reg,
            },
        ],
    },
    Descriptor {
        name: "call",
        rex_w: false,
        opcode: &[0xFF],
        extension: Some(0x02),
        operands: &[OperandSpec {
            name: "callee",
            kind: OperandKind::RegMem,
        }],
    },
    Descriptor {
        name: "push64",
        rex_w: false,
        opcode: &[0xFF],
        extension: Some(0x06),
        operands: &[OperandSpec {
            name: "operand",
            kind: OperandKind::RegMem,
        }],
    },
    Descriptor {
        name: "bt64",
        rex_w: true,
        opcode: &[0x0F, 0xBA],
        extension: Some(0x04),
        operands: &[
            OperandSpec {
                name: "bitstring",
                kind: OperandKind::RegMem,
            },
            OperandSpec {
                name: "index",
                kind: OperandKind::Unsigned(ImmWidth::B1),
            },
        ],
    },
    Descriptor {
        name: "bt32",
        rex_w: false,
        opcode: &[0x0F, 0xBA],
        extension: Some(0x04),
        operands: &[
            OperandSpec {
                name: "bitstring",
                kind: OperandKind::RegMem,
            },
            OperandSpec {
                name: "index",
                kind: OperandKind::Unsigned(ImmWidth::B1),
            },
        ],
    },
    Descriptor {
        name: "bts32",
        rex_w: false,
        opcode: &[0x0F, 0xBA],
        extension: Some(0x05),
        operands: &[
            OperandSpec {
                name: "bitstring",
                kind: OperandKind::RegMem,
            },
            OperandSpec {
                name: "index",
                kind: OperandKind::Unsigned(ImmWidth::B1),
            },
        ],
    },
    Descriptor {
        name: "cmp64",
        rex_w: true,
        opcode: &[0x83],
        extension: Some(0x07),
        operands: &[
            OperandSpec {
                name: "operand",
                kind: OperandKind::RegMem,
            },
            OperandSpec {
                name: "value",
                kind: OperandKind::Signed(ImmWidth::B1),
            },
        ],
    },
    Descriptor {
        name: "lea64",
        rex_w: true,
        opcode: &[0x8D],
        extension: None,
        operands: &[
            OperandSpec {
                name: "destination",
                kind: OperandKind::Reg,
            },
            OperandSpec {
                name: "address",
                kind: OperandKind::RegMem,
            },
        ],
    },
];

/// Index of each built-in entry, in [`BUILTIN`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Op {
    /// `mov r64, r/m64` (8B /r)
    Mov64,
    /// `mov r/m64, r64` (89 /r)
    Store64,
    /// `call r/m64` (FF /2)
    Call,
    /// `push r/m64` (FF /6)
    Push64,
    /// `bt r/m64, imm8` (0F BA /4)
    Bt64,
    /// `bt r/m32, imm8` (0F BA /4)
    Bt32,
    /// `bts r/m32, imm8` (0F BA /5)
    Bts32,
    /// `cmp r/m64, imm8` (83 /7)
    Cmp64,
    /// `lea r64, m` (8D /r)
    Lea64,
}

/// A validated, immutable instruction catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    encodings: Vec<Encoding>,
}

impl Catalog {
    /// Build and validate a catalog from a descriptor table.
    ///
    /// # Errors
    ///
    /// [`DescriptorError`] for the first malformed entry; no catalog is
    /// produced and the defect can never surface at encode time.
    pub fn new(table: &'static [Descriptor]) -> Result<Catalog, DescriptorError> {
        let mut encodings = Vec::with_capacity(table.len());
        for descriptor in table {
            encodings.push(Encoding::resolve(descriptor)?);
        }
        Ok(Catalog { encodings })
    }

    /// Build the built-in instruction set.
    pub fn builtin() -> Result<Catalog, DescriptorError> {
        Catalog::new(BUILTIN)
    }

    /// All encodings, in table order.
    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Look up an encoding by instruction name. Intended for build-time
    /// wiring; the emission path uses fixed indices.
    pub fn get(&self, name: &str) -> Option<&Encoding> {
        self.encodings.iter().find(|e| e.name() == name)
    }

    /// The pre-resolved encoding for a built-in entry.
    ///
    /// Only meaningful on catalogs built by [`Catalog::builtin`]; the typed
    /// methods below all go through here.
    pub fn op(&self, op: Op) -> &Encoding {
        &self.encodings[op as usize]
    }

    // ── Typed emission surface ──────────────────────────────────────────
    //
    // One method per built-in entry, typed to its declared operand kinds.
    // All of them forward to the generic `Encoding::encode`; `Err` means
    // the buffer could not reserve the worst-case bound and was left
    // untouched.

    /// `mov destination, source` — 64-bit load (8B /r).
    pub fn mov64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        destination: Gpr,
        source: impl Into<Rm>,
    ) -> Result<(), CapacityError> {
        self.op(Op::Mov64).encode(
            buf,
            &[Operand::Reg(destination), Operand::Rm(source.into())],
        )
    }

    /// `mov destination, source` — 64-bit store (89 /r).
    pub fn store64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        destination: impl Into<Rm>,
        source: Gpr,
    ) -> Result<(), CapacityError> {
        self.op(Op::Store64).encode(
            buf,
            &[Operand::Rm(destination.into()), Operand::Reg(source)],
        )
    }

    /// `call callee` — indirect near call (FF /2).
    pub fn call<B: CodeBuffer>(
        &self,
        buf: &mut B,
        callee: impl Into<Rm>,
    ) -> Result<(), CapacityError> {
        self.op(Op::Call).encode(buf, &[Operand::Rm(callee.into())])
    }

    /// `push operand` (FF /6).
    pub fn push64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        operand: impl Into<Rm>,
    ) -> Result<(), CapacityError> {
        self.op(Op::Push64)
            .encode(buf, &[Operand::Rm(operand.into())])
    }

    /// `bt bitstring, index` — 64-bit bit test (0F BA /4).
    pub fn bt64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        bitstring: impl Into<Rm>,
        index: u8,
    ) -> Result<(), CapacityError> {
        self.op(Op::Bt64).encode(
            buf,
            &[
                Operand::Rm(bitstring.into()),
                Operand::Unsigned(u32::from(index)),
            ],
        )
    }

    /// `bt bitstring, index` — 32-bit bit test (0F BA /4).
    pub fn bt32<B: CodeBuffer>(
        &self,
        buf: &mut B,
        bitstring: impl Into<Rm>,
        index: u8,
    ) -> Result<(), CapacityError> {
        self.op(Op::Bt32).encode(
            buf,
            &[
                Operand::Rm(bitstring.into()),
                Operand::Unsigned(u32::from(index)),
            ],
        )
    }

    /// `bts bitstring, index` — 32-bit bit test-and-set (0F BA /5).
    pub fn bts32<B: CodeBuffer>(
        &self,
        buf: &mut B,
        bitstring: impl Into<Rm>,
        index: u8,
    ) -> Result<(), CapacityError> {
        self.op(Op::Bts32).encode(
            buf,
            &[
                Operand::Rm(bitstring.into()),
                Operand::Unsigned(u32::from(index)),
            ],
        )
    }

    /// `cmp operand, value` — 64-bit compare with sign-extended imm8
    /// (83 /7).
    pub fn cmp64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        operand: impl Into<Rm>,
        value: i8,
    ) -> Result<(), CapacityError> {
        self.op(Op::Cmp64).encode(
            buf,
            &[
                Operand::Rm(operand.into()),
                Operand::Signed(i32::from(value)),
            ],
        )
    }

    /// `lea destination, address` (8D /r). Register-direct LEA does not
    /// exist, so the address is a [`Mem`], not an [`Rm`].
    pub fn lea64<B: CodeBuffer>(
        &self,
        buf: &mut B,
        destination: Gpr,
        address: Mem,
    ) -> Result<(), CapacityError> {
        self.op(Op::Lea64).encode(
            buf,
            &[Operand::Reg(destination), Operand::Rm(Rm::Mem(address))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_validates() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.encodings().len(), BUILTIN.len());
    }

    #[test]
    fn op_indices_match_names() {
        let catalog = Catalog::builtin().unwrap();
        let pairs = [
            (Op::Mov64, "mov64"),
            (Op::Store64, "store64"),
            (Op::Call, "call"),
            (Op::Push64, "push64"),
            (Op::Bt64, "bt64"),
            (Op::Bt32, "bt32"),
            (Op::Bts32, "bts32"),
            (Op::Cmp64, "cmp64"),
            (Op::Lea64, "lea64"),
        ];
        for (op, name) in pairs {
            assert_eq!(catalog.op(op).name(), name);
            assert_eq!(catalog.get(name).unwrap().name(), name);
        }
    }

    #[test]
    fn worst_case_bounds() {
        let catalog = Catalog::builtin().unwrap();
        let bounds = [
            ("mov64", 8),
            ("store64", 8),
            ("call", 8),
            ("push64", 8),
            ("bt64", 10),
            ("bt32", 10),
            ("bts32", 10),
            ("cmp64", 9),
            ("lea64", 8),
        ];
        for (name, expected) in bounds {
            assert_eq!(catalog.get(name).unwrap().max_len(), expected, "{}", name);
        }
    }

    #[test]
    fn unknown_name_lookup() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.get("mov32").is_none());
    }
}
