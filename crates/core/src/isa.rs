// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registers::{CpuRegList, CpuRegister, Register, VRegister};
use std::fmt;

/// The instructions the capture and clobbering helpers emit.
///
/// Memory operands are a base register plus a byte offset. The access width
/// of `Str`/`Ldr` is the width of the data register view; for Z and P
/// registers it is the run-time vector or predicate length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// rd = imm (truncated to the width of rd)
    MovImm { rd: Register, imm: u64 },
    /// rd = rn
    Mov { rd: Register, rn: Register },
    /// rd = rn + imm; rn may be the stack pointer
    AddImm { rd: Register, rn: Register, imm: u64 },
    Str { rt: CpuRegister, base: Register, offset: i64 },
    Ldr { rt: CpuRegister, base: Register, offset: i64 },
    /// Lowest code ends up at the lowest address.
    Push(CpuRegList),
    Pop(CpuRegList),
    MrsNzcv { rt: Register },
    MsrNzcv { rt: Register },
    /// rd = multiplier * VL (in bytes)
    Rdvl { rd: Register, multiplier: i64 },
    /// rd = rn + multiplier * VL (in bytes)
    AddVl { rd: Register, rn: Register, multiplier: i64 },
    /// rd = rn + multiplier * PL (in bytes)
    AddPl { rd: Register, rn: Register, multiplier: i64 },
    /// Load a raw floating-point bit pattern.
    FmovImm { vd: VRegister, bits: u64 },
    Fmov { vd: VRegister, vn: VRegister },
}

impl Instruction {
    pub fn requires_sve(&self) -> bool {
        match self {
            Instruction::Rdvl { .. } | Instruction::AddVl { .. } | Instruction::AddPl { .. } => {
                true
            }
            Instruction::Str { rt, .. } | Instruction::Ldr { rt, .. } => {
                matches!(rt, CpuRegister::Z(_) | CpuRegister::P(_))
            }
            _ => false,
        }
    }
}

fn fmt_cpu_register(reg: &CpuRegister) -> String {
    match reg {
        CpuRegister::R(r) => r.to_string(),
        CpuRegister::V(v) => v.to_string(),
        CpuRegister::Z(z) => format!("z{}", z.code()),
        CpuRegister::P(p) => format!("p{}", p.code()),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::MovImm { rd, imm } => write!(f, "mov {}, #{:#x}", rd, imm),
            Instruction::Mov { rd, rn } => write!(f, "mov {}, {}", rd, rn),
            Instruction::AddImm { rd, rn, imm } => write!(f, "add {}, {}, #{:#x}", rd, rn, imm),
            Instruction::Str { rt, base, offset } => {
                write!(f, "str {}, [{}, #{}]", fmt_cpu_register(rt), base, offset)
            }
            Instruction::Ldr { rt, base, offset } => {
                write!(f, "ldr {}, [{}, #{}]", fmt_cpu_register(rt), base, offset)
            }
            Instruction::Push(list) => write!(f, "push {:#x}", list.list()),
            Instruction::Pop(list) => write!(f, "pop {:#x}", list.list()),
            Instruction::MrsNzcv { rt } => write!(f, "mrs {}, nzcv", rt),
            Instruction::MsrNzcv { rt } => write!(f, "msr nzcv, {}", rt),
            Instruction::Rdvl { rd, multiplier } => write!(f, "rdvl {}, #{}", rd, multiplier),
            Instruction::AddVl { rd, rn, multiplier } => {
                write!(f, "addvl {}, {}, #{}", rd, rn, multiplier)
            }
            Instruction::AddPl { rd, rn, multiplier } => {
                write!(f, "addpl {}, {}, #{}", rd, rn, multiplier)
            }
            Instruction::FmovImm { vd, bits } => write!(f, "fmov {}, #{:#x}", vd, bits),
            Instruction::Fmov { vd, vn } => write!(f, "fmov {}, {}", vd, vn),
        }
    }
}
