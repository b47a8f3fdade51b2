//! Value model consumed by the encoder: general-purpose registers, scale
//! factors, memory references, and runtime operand values.

use core::fmt;

/// The sixteen x86-64 general-purpose registers.
///
/// The discriminant is the 4-bit hardware code. Codes 8–15 do not fit the
/// 3-bit ModR/M and SIB fields; their high bit travels in the REX prefix
/// (R, X, or B depending on which field the register lands in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Gpr {
    /// RAX — accumulator, hardware code 0.
    Rax = 0,
    /// RCX — counter.
    Rcx = 1,
    /// RDX — data.
    Rdx = 2,
    /// RBX — base.
    Rbx = 3,
    /// RSP — stack pointer. As a base register it forces a SIB byte; it
    /// cannot be a SIB index register.
    Rsp = 4,
    /// RBP — frame pointer. As a base register it cannot be encoded with a
    /// zero-size displacement.
    Rbp = 5,
    /// RSI — source index.
    Rsi = 6,
    /// RDI — destination index.
    Rdi = 7,
    /// R8–R15 — extended registers (need a REX extension bit).
    R8 = 8,
    /// Extended register.
    R9 = 9,
    /// Extended register.
    R10 = 10,
    /// Extended register.
    R11 = 11,
    /// Extended register. Shares RSP's low bits, so it forces a SIB byte as
    /// a base register.
    R12 = 12,
    /// Extended register. Shares RBP's low bits, so it cannot be encoded
    /// with a zero-size displacement as a base register.
    R13 = 13,
    /// Extended register.
    R14 = 14,
    /// Extended register.
    R15 = 15,
}

impl Gpr {
    /// All sixteen registers in hardware-code order.
    pub const ALL: [Gpr; 16] = [
        Gpr::Rax,
        Gpr::Rcx,
        Gpr::Rdx,
        Gpr::Rbx,
        Gpr::Rsp,
        Gpr::Rbp,
        Gpr::Rsi,
        Gpr::Rdi,
        Gpr::R8,
        Gpr::R9,
        Gpr::R10,
        Gpr::R11,
        Gpr::R12,
        Gpr::R13,
        Gpr::R14,
        Gpr::R15,
    ];

    /// The 4-bit hardware code (0–15).
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The register for a 4-bit hardware code, or `None` for codes ≥ 16.
    pub fn from_code(code: u8) -> Option<Gpr> {
        Gpr::ALL.get(usize::from(code)).copied()
    }

    /// The low 3 bits — what fits in a ModR/M or SIB field.
    #[inline]
    pub(crate) fn low_bits(self) -> u8 {
        self.code() & 7
    }

    /// Whether the register needs a REX extension bit (codes 8–15).
    #[inline]
    pub fn is_extended(self) -> bool {
        self.code() >= 8
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gpr::Rax => "rax",
            Gpr::Rcx => "rcx",
            Gpr::Rdx => "rdx",
            Gpr::Rbx => "rbx",
            Gpr::Rsp => "rsp",
            Gpr::Rbp => "rbp",
            Gpr::Rsi => "rsi",
            Gpr::Rdi => "rdi",
            Gpr::R8 => "r8",
            Gpr::R9 => "r9",
            Gpr::R10 => "r10",
            Gpr::R11 => "r11",
            Gpr::R12 => "r12",
            Gpr::R13 => "r13",
            Gpr::R14 => "r14",
            Gpr::R15 => "r15",
        };
        f.write_str(name)
    }
}

/// SIB index multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scale {
    /// ×1
    X1,
    /// ×2
    X2,
    /// ×4
    X4,
    /// ×8
    X8,
}

impl Scale {
    /// All four multipliers.
    pub const ALL: [Scale; 4] = [Scale::X1, Scale::X2, Scale::X4, Scale::X8];

    /// The 2-bit SIB scale field.
    #[inline]
    pub(crate) fn bits(self) -> u8 {
        match self {
            Scale::X1 => 0b00,
            Scale::X2 => 0b01,
            Scale::X4 => 0b10,
            Scale::X8 => 0b11,
        }
    }

    /// The multiplication factor (1, 2, 4, or 8).
    pub fn factor(self) -> u8 {
        1 << self.bits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) enum AddrBase {
    Reg(Gpr),
    Rip,
}

/// A memory reference: base register or RIP, optional scaled index, and a
/// signed 32-bit displacement.
///
/// The addressing forms a JIT emits are modeled: `[base]`, `[base + disp]`,
/// `[base + index*scale + disp]`, and `[rip + disp]`. Displacement-only
/// absolute addressing is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mem {
    pub(crate) base: AddrBase,
    pub(crate) index: Option<(Gpr, Scale)>,
    pub(crate) disp: i32,
}

impl Mem {
    /// `[base]`
    pub fn indirect(base: Gpr) -> Mem {
        Mem {
            base: AddrBase::Reg(base),
            index: None,
            disp: 0,
        }
    }

    /// `[base + disp]`
    pub fn indirect_disp(base: Gpr, disp: i32) -> Mem {
        Mem {
            base: AddrBase::Reg(base),
            index: None,
            disp,
        }
    }

    /// `[base + index*scale + disp]`
    ///
    /// # Panics
    ///
    /// Panics if `index` is RSP — the SIB index field has no encoding for it
    /// (its bit pattern means "no index").
    pub fn indirect_indexed(base: Gpr, index: Gpr, scale: Scale, disp: i32) -> Mem {
        assert!(
            index != Gpr::Rsp,
            "rsp cannot be used as a SIB index register"
        );
        Mem {
            base: AddrBase::Reg(base),
            index: Some((index, scale)),
            disp,
        }
    }

    /// `[rip + disp]` — position-relative addressing.
    pub fn rip_relative(disp: i32) -> Mem {
        Mem {
            base: AddrBase::Rip,
            index: None,
            disp,
        }
    }

    /// The same reference shifted by `delta` bytes.
    pub fn displaced(self, delta: i32) -> Mem {
        Mem {
            disp: self.disp + delta,
            ..self
        }
    }

    /// The base register, or `None` for the RIP-relative form.
    pub fn base(&self) -> Option<Gpr> {
        match self.base {
            AddrBase::Reg(reg) => Some(reg),
            AddrBase::Rip => None,
        }
    }

    /// The index register and scale, if any.
    pub fn index(&self) -> Option<(Gpr, Scale)> {
        self.index
    }

    /// The displacement.
    pub fn disp(&self) -> i32 {
        self.disp
    }

    /// Whether this is the RIP-relative form.
    pub fn is_rip_relative(&self) -> bool {
        matches!(self.base, AddrBase::Rip)
    }

    /// REX.X contribution: the index register's extension bit.
    #[inline]
    pub(crate) fn rex_x(&self) -> bool {
        self.index.is_some_and(|(index, _)| index.is_extended())
    }

    /// REX.B contribution: the base register's extension bit (RIP has none).
    #[inline]
    pub(crate) fn rex_b(&self) -> bool {
        match self.base {
            AddrBase::Reg(base) => base.is_extended(),
            AddrBase::Rip => false,
        }
    }
}

/// Value for a register-or-memory operand: either a register directly
/// (ModR/M mod=11) or a memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rm {
    /// Register-direct form.
    Reg(Gpr),
    /// Indirect memory form.
    Mem(Mem),
}

impl From<Gpr> for Rm {
    fn from(reg: Gpr) -> Rm {
        Rm::Reg(reg)
    }
}

impl From<Mem> for Rm {
    fn from(mem: Mem) -> Rm {
        Rm::Mem(mem)
    }
}

/// A runtime operand value, tagged by encoding kind.
///
/// The typed methods on [`Catalog`](crate::Catalog) construct these; the
/// generic [`Encoding::encode`](crate::Encoding::encode) consumes them in
/// declared operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Value for a register-field operand.
    Reg(Gpr),
    /// Value for a register-or-memory operand.
    Rm(Rm),
    /// Value for an unsigned immediate operand.
    Unsigned(u32),
    /// Value for a signed immediate/displacement operand.
    Signed(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr_codes_cover_0_to_15() {
        for (expected, reg) in Gpr::ALL.iter().enumerate() {
            assert_eq!(usize::from(reg.code()), expected);
            assert_eq!(Gpr::from_code(reg.code()), Some(*reg));
        }
        assert_eq!(Gpr::from_code(16), None);
    }

    #[test]
    fn extension_bit_starts_at_r8() {
        assert!(!Gpr::Rdi.is_extended());
        assert!(Gpr::R8.is_extended());
        assert!(Gpr::R15.is_extended());
    }

    #[test]
    fn low_bits_alias_across_extension() {
        assert_eq!(Gpr::Rsp.low_bits(), Gpr::R12.low_bits());
        assert_eq!(Gpr::Rbp.low_bits(), Gpr::R13.low_bits());
    }

    #[test]
    fn scale_factors() {
        let factors: alloc::vec::Vec<u8> = Scale::ALL.iter().map(|s| s.factor()).collect();
        assert_eq!(factors, [1, 2, 4, 8]);
    }

    #[test]
    fn displaced_adjusts_displacement() {
        let mem = Mem::indirect_disp(Gpr::Rbx, 8).displaced(-24);
        assert_eq!(mem.disp(), -16);
        assert_eq!(mem.base(), Some(Gpr::Rbx));
    }

    #[test]
    fn rip_relative_has_no_base() {
        let mem = Mem::rip_relative(-12);
        assert!(mem.is_rip_relative());
        assert_eq!(mem.base(), None);
        assert!(!mem.rex_b());
    }

    #[test]
    #[should_panic(expected = "rsp cannot be used as a SIB index register")]
    fn rsp_index_rejected() {
        let _ = Mem::indirect_indexed(Gpr::Rax, Gpr::Rsp, Scale::X1, 0);
    }
}
