//! # x64-emit — Descriptor-Driven x86-64 Machine-Code Emitter
//!
//! `x64-emit` turns declarative instruction descriptors into byte-exact
//! x86-64 machine code: REX prefixes, ModR/M and SIB addressing forms,
//! opcode bytes, and immediate/displacement serialization, written straight
//! into a caller-owned code buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use x64_emit::{Catalog, CodeVec, Gpr, Mem};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let mut code = CodeVec::new();
//!
//! // mov rax, [rcx]
//! catalog.mov64(&mut code, Gpr::Rax, Mem::indirect(Gpr::Rcx)).unwrap();
//! assert_eq!(code.as_slice(), [0x48, 0x8B, 0x01]);
//! ```
//!
//! ## Features
//!
//! - **Pure Rust** — no C FFI, no system assembler, `#![forbid(unsafe_code)]`.
//! - **Descriptor table in, encoders out** — a one-time validation pass turns
//!   the table into ready-to-call emission routines; malformed descriptors
//!   are rejected before any code can be emitted.
//! - **Atomic emission** — an encode call either writes a complete
//!   instruction or leaves the buffer untouched.
//! - **`no_std` + `alloc`** — embeddable in JIT runtimes, kernels, WASM.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Lint policy ──────────────────────────────────────────────────────────
// An instruction encoder intentionally performs narrowing casts between
// integer widths (i32→u8, u32→u8) and uses dense hex literals without
// separators (0xFF, 0x0FBA).  The lints below are expected and acceptable
// in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::unreadable_literal,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

extern crate alloc;

/// Code buffer collaborator: `reserve`/`commit` contract and implementations.
pub mod buffer;
/// The built-in instruction catalog and its validated, emission-ready form.
pub mod catalog;
/// Declarative instruction descriptors (the build surface).
pub mod descriptor;
/// Descriptor resolution and the byte-layout encode routine.
pub mod encoder;
/// Error types: build-time descriptor defects, runtime capacity exhaustion.
pub mod error;
/// Value model: registers, memory operands, runtime operand values.
pub mod ir;

// Re-exports
pub use buffer::{CodeBuffer, CodeVec, FixedBuffer};
pub use catalog::{Catalog, Op, BUILTIN};
pub use descriptor::{Descriptor, ImmWidth, OperandKind, OperandSpec};
pub use encoder::Encoding;
pub use error::{CapacityError, DescriptorError};
pub use ir::{Gpr, Mem, Operand, Rm, Scale};
