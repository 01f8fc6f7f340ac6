// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Width-qualified register views.
//!
//! A view is an `(index, width)` pair. The same architectural register can be
//! named at several widths (`w5` and `x5`, or `h3`/`s3`/`d3`/`q3`), and every
//! comparison or store is performed against a specific view.

use std::fmt;

pub const NUMBER_OF_REGISTERS: usize = 32;
pub const NUMBER_OF_V_REGISTERS: usize = 32;
pub const NUMBER_OF_Z_REGISTERS: usize = 32;
pub const NUMBER_OF_P_REGISTERS: usize = 16;

/// Code 31 names the zero register in data-processing and store contexts.
pub const ZERO_REG_CODE: u8 = 31;
/// The stack pointer shares encoding 31 with the zero register, so it gets an
/// internal code that can never be a record index.
pub const SP_INTERNAL_CODE: u8 = 63;

pub const X_REG_SIZE: u32 = 64;
pub const W_REG_SIZE: u32 = 32;
pub const Q_REG_SIZE: u32 = 128;
pub const D_REG_SIZE: u32 = 64;
pub const S_REG_SIZE: u32 = 32;
pub const H_REG_SIZE: u32 = 16;

pub const X_REG_SIZE_IN_BYTES: u64 = 8;
pub const W_REG_SIZE_IN_BYTES: u64 = 4;
pub const Q_REG_SIZE_IN_BYTES: u64 = 16;
pub const D_REG_SIZE_IN_BYTES: u64 = 8;
pub const S_REG_SIZE_IN_BYTES: u64 = 4;
pub const H_REG_SIZE_IN_BYTES: u64 = 2;

pub const BITS_PER_BYTE: u32 = 8;
pub const MAX_VL_BITS: u32 = 2048;
pub const MAX_VL_BYTES: u64 = (MAX_VL_BITS / BITS_PER_BYTE) as u64;
/// One predicate bit per vector byte.
pub const MAX_PL_BYTES: u64 = MAX_VL_BYTES / 8;

/// Bitset of register codes.
pub type RegList = u64;

pub fn reg_bit(code: u8) -> RegList {
    1u64 << code
}

pub fn count_set_bits(list: RegList, width: usize) -> usize {
    let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
    (list & mask).count_ones() as usize
}

/// General-purpose register view (W or X).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    code: u8,
    size_bits: u32,
}

pub const SP: Register = Register {
    code: SP_INTERNAL_CODE,
    size_bits: X_REG_SIZE,
};
pub const WSP: Register = Register {
    code: SP_INTERNAL_CODE,
    size_bits: W_REG_SIZE,
};
pub const XZR: Register = Register {
    code: ZERO_REG_CODE,
    size_bits: X_REG_SIZE,
};
pub const WZR: Register = Register {
    code: ZERO_REG_CODE,
    size_bits: W_REG_SIZE,
};

impl Register {
    pub fn new(code: u8, size_bits: u32) -> Self {
        assert!(
            (code as usize) < NUMBER_OF_REGISTERS || code == SP_INTERNAL_CODE,
            "invalid register code {}",
            code
        );
        assert!(
            size_bits == X_REG_SIZE || size_bits == W_REG_SIZE,
            "invalid general register size {}",
            size_bits
        );
        Self { code, size_bits }
    }

    pub fn x(code: u8) -> Self {
        Self::new(code, X_REG_SIZE)
    }

    pub fn w(code: u8) -> Self {
        Self::new(code, W_REG_SIZE)
    }

    pub fn code(self) -> u8 {
        self.code
    }

    pub fn size_bits(self) -> u32 {
        self.size_bits
    }

    pub fn size_in_bytes(self) -> u64 {
        (self.size_bits / BITS_PER_BYTE) as u64
    }

    pub fn is_64_bits(self) -> bool {
        self.size_bits == X_REG_SIZE
    }

    pub fn is_32_bits(self) -> bool {
        self.size_bits == W_REG_SIZE
    }

    pub fn is_sp(self) -> bool {
        self.code == SP_INTERNAL_CODE
    }

    pub fn is_zero(self) -> bool {
        self.code == ZERO_REG_CODE
    }

    /// Same register, viewed at 64 bits.
    pub fn as_x(self) -> Self {
        Self {
            code: self.code,
            size_bits: X_REG_SIZE,
        }
    }

    /// Same register, viewed at 32 bits.
    pub fn as_w(self) -> Self {
        Self {
            code: self.code,
            size_bits: W_REG_SIZE,
        }
    }

    /// True if both views name the same architectural register.
    pub fn aliases(self, other: Register) -> bool {
        self.code == other.code
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.size_bits) {
            (SP_INTERNAL_CODE, X_REG_SIZE) => write!(f, "sp"),
            (SP_INTERNAL_CODE, _) => write!(f, "wsp"),
            (ZERO_REG_CODE, X_REG_SIZE) => write!(f, "xzr"),
            (ZERO_REG_CODE, _) => write!(f, "wzr"),
            (code, X_REG_SIZE) => write!(f, "x{}", code),
            (code, _) => write!(f, "w{}", code),
        }
    }
}

/// Floating-point / vector register view (H, S, D or Q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VRegister {
    code: u8,
    size_bits: u32,
}

impl VRegister {
    pub fn new(code: u8, size_bits: u32) -> Self {
        assert!(
            (code as usize) < NUMBER_OF_V_REGISTERS,
            "invalid V register code {}",
            code
        );
        assert!(
            matches!(size_bits, H_REG_SIZE | S_REG_SIZE | D_REG_SIZE | Q_REG_SIZE),
            "invalid V register size {}",
            size_bits
        );
        Self { code, size_bits }
    }

    pub fn h(code: u8) -> Self {
        Self::new(code, H_REG_SIZE)
    }

    pub fn s(code: u8) -> Self {
        Self::new(code, S_REG_SIZE)
    }

    pub fn d(code: u8) -> Self {
        Self::new(code, D_REG_SIZE)
    }

    pub fn q(code: u8) -> Self {
        Self::new(code, Q_REG_SIZE)
    }

    pub fn code(self) -> u8 {
        self.code
    }

    pub fn size_bits(self) -> u32 {
        self.size_bits
    }

    pub fn size_in_bytes(self) -> u64 {
        (self.size_bits / BITS_PER_BYTE) as u64
    }

    pub fn is_16_bits(self) -> bool {
        self.size_bits == H_REG_SIZE
    }

    pub fn is_32_bits(self) -> bool {
        self.size_bits == S_REG_SIZE
    }

    pub fn is_64_bits(self) -> bool {
        self.size_bits == D_REG_SIZE
    }

    pub fn is_128_bits(self) -> bool {
        self.size_bits == Q_REG_SIZE
    }
}

impl fmt::Display for VRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.size_bits {
            H_REG_SIZE => 'h',
            S_REG_SIZE => 's',
            D_REG_SIZE => 'd',
            _ => 'q',
        };
        write!(f, "{}{}", prefix, self.code)
    }
}

/// Scalable vector register; its width is the run-time vector length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZRegister(u8);

impl ZRegister {
    pub fn new(code: u8) -> Self {
        assert!((code as usize) < NUMBER_OF_Z_REGISTERS, "invalid Z register code {}", code);
        Self(code)
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

/// Scalable predicate register; one bit per vector byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PRegister(u8);

impl PRegister {
    pub fn new(code: u8) -> Self {
        assert!((code as usize) < NUMBER_OF_P_REGISTERS, "invalid P register code {}", code);
        Self(code)
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

/// Any register that can be the data operand of a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuRegister {
    R(Register),
    V(VRegister),
    Z(ZRegister),
    P(PRegister),
}

impl From<Register> for CpuRegister {
    fn from(reg: Register) -> Self {
        CpuRegister::R(reg)
    }
}

impl From<VRegister> for CpuRegister {
    fn from(reg: VRegister) -> Self {
        CpuRegister::V(reg)
    }
}

impl From<ZRegister> for CpuRegister {
    fn from(reg: ZRegister) -> Self {
        CpuRegister::Z(reg)
    }
}

impl From<PRegister> for CpuRegister {
    fn from(reg: PRegister) -> Self {
        CpuRegister::P(reg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterBank {
    General,
    Vector,
}

/// A set of registers from one bank, all viewed at the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegList {
    bank: RegisterBank,
    size_bits: u32,
    list: RegList,
}

impl CpuRegList {
    pub fn new(bank: RegisterBank, size_bits: u32, list: RegList) -> Self {
        Self {
            bank,
            size_bits,
            list,
        }
    }

    pub fn from_registers(regs: &[Register]) -> Self {
        let size_bits = regs.first().map_or(X_REG_SIZE, |r| r.size_bits());
        let mut list = 0;
        for reg in regs {
            assert_eq!(reg.size_bits(), size_bits, "mixed register sizes in list");
            assert!(!reg.is_sp(), "sp cannot be a list member");
            list |= reg_bit(reg.code());
        }
        Self::new(RegisterBank::General, size_bits, list)
    }

    pub fn bank(&self) -> RegisterBank {
        self.bank
    }

    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    pub fn list(&self) -> RegList {
        self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list == 0
    }

    pub fn count(&self) -> usize {
        self.list.count_ones() as usize
    }

    pub fn includes(&self, code: u8) -> bool {
        code < 64 && self.list & reg_bit(code) != 0
    }

    pub fn includes_alias_of(&self, reg: Register) -> bool {
        self.bank == RegisterBank::General && self.includes(reg.code())
    }

    pub fn combine(&mut self, other: &CpuRegList) {
        assert_eq!(self.bank, other.bank);
        self.list |= other.list;
    }

    pub fn remove(&mut self, other: &CpuRegList) {
        assert_eq!(self.bank, other.bank);
        self.list &= !other.list;
    }

    /// Removes and returns the register with the lowest code.
    pub fn pop_lowest_index(&mut self) -> Option<u8> {
        if self.list == 0 {
            return None;
        }
        let code = self.list.trailing_zeros() as u8;
        self.list &= !reg_bit(code);
        Some(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..64u8).filter(move |&c| self.includes(c))
    }

    /// Stack space taken by a push of this list, keeping sp 16-byte aligned.
    pub fn push_size_in_bytes(&self) -> u64 {
        let raw = self.count() as u64 * (self.size_bits / BITS_PER_BYTE) as u64;
        (raw + 15) & !15
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_alias() {
        let w5 = Register::w(5);
        let x5 = Register::x(5);
        assert!(w5.aliases(x5));
        assert_eq!(w5.as_x(), x5);
        assert_eq!(x5.to_string(), "x5");
        assert_eq!(w5.to_string(), "w5");
        assert_eq!(SP.to_string(), "sp");
        assert_eq!(WZR.to_string(), "wzr");
        assert!(!SP.aliases(XZR));
    }

    #[test]
    fn test_vregister_sizes() {
        assert_eq!(VRegister::h(1).size_in_bytes(), 2);
        assert_eq!(VRegister::s(1).size_in_bytes(), 4);
        assert_eq!(VRegister::d(1).size_in_bytes(), 8);
        assert_eq!(VRegister::q(31).size_in_bytes(), 16);
        assert_eq!(VRegister::q(31).to_string(), "q31");
    }

    #[test]
    #[should_panic(expected = "invalid V register code")]
    fn test_vregister_out_of_range() {
        VRegister::d(32);
    }

    #[test]
    fn test_pop_lowest_index() {
        let mut list = CpuRegList::from_registers(&[Register::x(3), Register::x(0), Register::x(2)]);
        assert_eq!(list.count(), 3);
        assert_eq!(list.push_size_in_bytes(), 32);
        assert_eq!(list.pop_lowest_index(), Some(0));
        assert_eq!(list.pop_lowest_index(), Some(2));
        assert_eq!(list.pop_lowest_index(), Some(3));
        assert_eq!(list.pop_lowest_index(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_count_set_bits_width() {
        assert_eq!(count_set_bits(u64::MAX, 32), 32);
        assert_eq!(count_set_bits(0b1011, 64), 3);
    }
}
