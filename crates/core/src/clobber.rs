// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Poison a set of registers so that accidental preservation shows up in a
//! later comparison.

use crate::compare::FP64_SIGNALLING_NAN;
use crate::masm::Emitter;
use crate::registers::{
    reg_bit, CpuRegList, RegList, Register, RegisterBank, VRegister, NUMBER_OF_REGISTERS,
    NUMBER_OF_V_REGISTERS, SP_INTERNAL_CODE, ZERO_REG_CODE,
};

pub const DEFAULT_POISON: u64 = 0xfedc_ba98_7654_3210;

pub fn default_fp_poison() -> f64 {
    f64::from_bits(FP64_SIGNALLING_NAN)
}

/// Writes `value` into every X register in `reg_list`. The literal is
/// materialized once, in the lowest register.
pub fn clobber<M: Emitter + ?Sized>(masm: &mut M, reg_list: RegList, value: u64) {
    assert_eq!(
        reg_list & reg_bit(ZERO_REG_CODE),
        0,
        "the zero register and sp cannot be clobbered"
    );
    assert_eq!(
        reg_list & reg_bit(SP_INTERNAL_CODE),
        0,
        "the zero register and sp cannot be clobbered"
    );

    let mut first: Option<Register> = None;
    for code in 0..NUMBER_OF_REGISTERS as u8 {
        if reg_list & reg_bit(code) == 0 {
            continue;
        }
        let xn = Register::x(code);
        match first {
            None => {
                masm.mov_imm(xn, value);
                first = Some(xn);
            }
            Some(src) => masm.mov(xn, src),
        }
    }
}

/// Writes `value` into every D register in `reg_list`.
pub fn clobber_fp<M: Emitter + ?Sized>(masm: &mut M, reg_list: RegList, value: f64) {
    let mut first: Option<VRegister> = None;
    for code in 0..NUMBER_OF_V_REGISTERS as u8 {
        if reg_list & reg_bit(code) == 0 {
            continue;
        }
        let dn = VRegister::d(code);
        match first {
            None => {
                masm.fmov_imm(dn, value);
                first = Some(dn);
            }
            Some(src) => masm.fmov(dn, src),
        }
    }
}

/// X registers for the general bank, D registers for the vector bank, each
/// with its default poison.
pub fn clobber_list<M: Emitter + ?Sized>(masm: &mut M, reg_list: CpuRegList) {
    match reg_list.bank() {
        RegisterBank::General => clobber(masm, reg_list.list(), DEFAULT_POISON),
        RegisterBank::Vector => clobber_fp(masm, reg_list.list(), default_fp_poison()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Instruction;
    use crate::masm::CodeBuffer;

    #[test]
    fn test_single_materialization() {
        let mut masm = CodeBuffer::default();
        clobber(&mut masm, 0b1010_0100, 0x42);
        assert_eq!(
            masm.instructions(),
            &[
                Instruction::MovImm {
                    rd: Register::x(2),
                    imm: 0x42
                },
                Instruction::Mov {
                    rd: Register::x(5),
                    rn: Register::x(2)
                },
                Instruction::Mov {
                    rd: Register::x(7),
                    rn: Register::x(2)
                },
            ]
        );
    }

    #[test]
    fn test_fp_single_materialization() {
        let mut masm = CodeBuffer::default();
        clobber_fp(&mut masm, reg_bit(3) | reg_bit(31), 1.5);
        assert_eq!(masm.len(), 2);
        assert!(matches!(
            masm.instructions()[0],
            Instruction::FmovImm { bits, .. } if bits == 1.5f64.to_bits()
        ));
    }

    #[test]
    fn test_empty_list_emits_nothing() {
        let mut masm = CodeBuffer::default();
        clobber(&mut masm, 0, DEFAULT_POISON);
        clobber_fp(&mut masm, 0, 0.0);
        assert!(masm.is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot be clobbered")]
    fn test_zero_register_rejected() {
        let mut masm = CodeBuffer::default();
        clobber(&mut masm, reg_bit(1) | reg_bit(ZERO_REG_CODE), DEFAULT_POISON);
    }

    #[test]
    fn test_list_dispatch() {
        let mut masm = CodeBuffer::default();
        clobber_list(&mut masm, CpuRegList::new(RegisterBank::Vector, 64, reg_bit(0)));
        clobber_list(&mut masm, CpuRegList::from_registers(&[Register::x(9)]));
        assert_eq!(
            masm.instructions()[0],
            Instruction::FmovImm {
                vd: VRegister::d(0),
                bits: FP64_SIGNALLING_NAN
            }
        );
        assert_eq!(
            masm.instructions()[1],
            Instruction::MovImm {
                rd: Register::x(9),
                imm: DEFAULT_POISON
            }
        );
    }
}
