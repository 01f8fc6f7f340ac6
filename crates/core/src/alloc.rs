// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registers::{
    count_set_bits, reg_bit, RegList, Register, VRegister, D_REG_SIZE, NUMBER_OF_REGISTERS,
    NUMBER_OF_V_REGISTERS, S_REG_SIZE, W_REG_SIZE, X_REG_SIZE,
};

/// General registers picked by `populate_register_array`, as parallel views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterArrays {
    pub list: RegList,
    /// At the requested size.
    pub r: Vec<Register>,
    pub x: Vec<Register>,
    pub w: Vec<Register>,
}

/// Vector registers picked by `populate_fp_register_array`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpRegisterArrays {
    pub list: RegList,
    /// At the requested size.
    pub v: Vec<VRegister>,
    pub d: Vec<VRegister>,
    pub s: Vec<VRegister>,
}

fn select(count: usize, limit: usize, allowed: RegList) -> Vec<u8> {
    (0..limit as u8)
        .filter(|&n| allowed & reg_bit(n) != 0)
        .take(count)
        .collect()
}

/// Takes the `reg_count` lowest codes in `allowed`.
pub fn populate_register_array(reg_size: u32, reg_count: usize, allowed: RegList) -> RegisterArrays {
    let codes = select(reg_count, NUMBER_OF_REGISTERS, allowed);
    let list = codes.iter().fold(0, |list, &n| list | reg_bit(n));
    assert_eq!(
        count_set_bits(list, NUMBER_OF_REGISTERS),
        reg_count,
        "requested {} registers from {:#x}",
        reg_count,
        allowed
    );

    RegisterArrays {
        list,
        r: codes.iter().map(|&n| Register::new(n, reg_size)).collect(),
        x: codes.iter().map(|&n| Register::new(n, X_REG_SIZE)).collect(),
        w: codes.iter().map(|&n| Register::new(n, W_REG_SIZE)).collect(),
    }
}

pub fn populate_fp_register_array(
    reg_size: u32,
    reg_count: usize,
    allowed: RegList,
) -> FpRegisterArrays {
    let codes = select(reg_count, NUMBER_OF_V_REGISTERS, allowed);
    let list = codes.iter().fold(0, |list, &n| list | reg_bit(n));
    assert_eq!(
        count_set_bits(list, NUMBER_OF_V_REGISTERS),
        reg_count,
        "requested {} V registers from {:#x}",
        reg_count,
        allowed
    );

    FpRegisterArrays {
        list,
        v: codes.iter().map(|&n| VRegister::new(n, reg_size)).collect(),
        d: codes.iter().map(|&n| VRegister::new(n, D_REG_SIZE)).collect(),
        s: codes.iter().map(|&n| VRegister::new(n, S_REG_SIZE)).collect(),
    }
}
