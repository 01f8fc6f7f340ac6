// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::SystemBus;
use crate::flags::{CpuFeatures, Nzcv, NZCV_PSR_SHIFT};
use crate::isa::Instruction;
use crate::registers::{
    CpuRegList, CpuRegister, Register, RegisterBank, VRegister, BITS_PER_BYTE,
    NUMBER_OF_P_REGISTERS, NUMBER_OF_Z_REGISTERS, Q_REG_SIZE_IN_BYTES,
};
use crate::{Bus, Cpu, Machine, SimResult, SimulationError};
use regcheck_config::TargetDescriptor;

const MIN_VL_BYTES: usize = Q_REG_SIZE_IN_BYTES as usize;

/// Architectural state of the reference core.
///
/// Each Z register is stored as `vl_bytes` little-endian bytes; its low 16
/// bytes are the V register of the same index.
#[derive(Debug, Clone)]
pub struct Aarch64 {
    pub x: [u64; 31], // x0..x30. Code 31 is xzr, sp lives separately.
    pub sp: u64,
    pub z: Vec<Vec<u8>>,
    pub p: Vec<Vec<u8>>,
    pub nzcv: Nzcv,
    pub features: CpuFeatures,
    vl_bytes: usize,
}

impl Default for Aarch64 {
    fn default() -> Self {
        Self::new(CpuFeatures::FP | CpuFeatures::NEON, 128)
    }
}

impl Aarch64 {
    pub fn new(features: CpuFeatures, vl_bits: u32) -> Self {
        assert!(
            vl_bits % 128 == 0 && vl_bits >= 128,
            "vector length must be a multiple of 128 bits, got {}",
            vl_bits
        );
        let vl_bytes = (vl_bits / BITS_PER_BYTE) as usize;
        Self {
            x: [0; 31],
            sp: 0,
            z: vec![vec![0; vl_bytes]; NUMBER_OF_Z_REGISTERS],
            p: vec![vec![0; vl_bytes / 8]; NUMBER_OF_P_REGISTERS],
            nzcv: Nzcv::empty(),
            features,
            vl_bytes,
        }
    }

    pub fn vl_bytes(&self) -> usize {
        self.vl_bytes
    }

    pub fn pl_bytes(&self) -> usize {
        self.vl_bytes / 8
    }

    pub fn read_reg(&self, reg: Register) -> u64 {
        let val = if reg.is_sp() {
            self.sp
        } else if reg.is_zero() {
            0
        } else {
            self.x[reg.code() as usize]
        };
        if reg.is_32_bits() {
            val & 0xffff_ffff
        } else {
            val
        }
    }

    /// W writes zero the upper half. Writes to the zero register vanish.
    pub fn write_reg(&mut self, reg: Register, val: u64) {
        let val = if reg.is_32_bits() {
            val & 0xffff_ffff
        } else {
            val
        };
        if reg.is_sp() {
            self.sp = val;
        } else if !reg.is_zero() {
            self.x[reg.code() as usize] = val;
        }
    }

    /// Reads the low bits of V<n> at the view's width.
    pub fn read_vreg(&self, reg: VRegister) -> u128 {
        let bytes = &self.z[reg.code() as usize][..MIN_VL_BYTES];
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        let val = u128::from_le_bytes(buf);
        if reg.is_128_bits() {
            val
        } else {
            val & ((1u128 << reg.size_bits()) - 1)
        }
    }

    /// Scalar and vector writes zero every bit above the view, including the
    /// scalable part of the Z register.
    pub fn write_vreg(&mut self, reg: VRegister, val: u128) {
        let width = reg.size_in_bytes() as usize;
        let bytes = val.to_le_bytes();
        let z = &mut self.z[reg.code() as usize];
        z.iter_mut().for_each(|b| *b = 0);
        z[..width].copy_from_slice(&bytes[..width]);
    }

    pub fn set_dreg_bits(&mut self, code: u8, bits: u64) {
        self.write_vreg(VRegister::d(code), bits as u128);
    }

    pub fn set_zreg(&mut self, code: u8, bytes: &[u8]) {
        assert_eq!(bytes.len(), self.vl_bytes, "Z register value must be VL bytes");
        self.z[code as usize].copy_from_slice(bytes);
    }

    pub fn set_preg(&mut self, code: u8, bytes: &[u8]) {
        assert_eq!(bytes.len(), self.pl_bytes(), "P register value must be PL bytes");
        self.p[code as usize].copy_from_slice(bytes);
    }

    fn check_sve(&self, instr: &Instruction) -> SimResult<()> {
        if instr.requires_sve() && !self.features.contains(CpuFeatures::SVE) {
            return Err(SimulationError::UndefinedInstruction(instr.to_string()));
        }
        Ok(())
    }

    fn address(&self, base: Register, offset: i64) -> u64 {
        self.read_reg(base).wrapping_add(offset as u64)
    }

    fn store(&self, bus: &mut dyn Bus, rt: &CpuRegister, addr: u64) -> SimResult<()> {
        match rt {
            CpuRegister::R(r) => {
                let len = r.size_in_bytes() as usize;
                bus.write_bytes(addr, &self.read_reg(*r).to_le_bytes()[..len])
            }
            CpuRegister::V(v) => {
                let len = v.size_in_bytes() as usize;
                bus.write_bytes(addr, &self.read_vreg(*v).to_le_bytes()[..len])
            }
            CpuRegister::Z(z) => bus.write_bytes(addr, &self.z[z.code() as usize]),
            CpuRegister::P(p) => bus.write_bytes(addr, &self.p[p.code() as usize]),
        }
    }

    fn load(&mut self, bus: &mut dyn Bus, rt: &CpuRegister, addr: u64) -> SimResult<()> {
        match rt {
            CpuRegister::R(r) => {
                let bytes = bus.read_bytes(addr, r.size_in_bytes() as usize)?;
                let mut buf = [0u8; 8];
                buf[..bytes.len()].copy_from_slice(&bytes);
                self.write_reg(*r, u64::from_le_bytes(buf));
            }
            CpuRegister::V(v) => {
                let bytes = bus.read_bytes(addr, v.size_in_bytes() as usize)?;
                let mut buf = [0u8; 16];
                buf[..bytes.len()].copy_from_slice(&bytes);
                self.write_vreg(*v, u128::from_le_bytes(buf));
            }
            CpuRegister::Z(z) => {
                let bytes = bus.read_bytes(addr, self.vl_bytes)?;
                self.z[z.code() as usize] = bytes;
            }
            CpuRegister::P(p) => {
                let bytes = bus.read_bytes(addr, self.pl_bytes())?;
                self.p[p.code() as usize] = bytes;
            }
        }
        Ok(())
    }

    fn list_entries(list: &CpuRegList) -> Vec<CpuRegister> {
        list.codes()
            .map(|code| match list.bank() {
                RegisterBank::General => CpuRegister::R(Register::new(code, list.size_bits())),
                RegisterBank::Vector => CpuRegister::V(VRegister::new(code, list.size_bits())),
            })
            .collect()
    }

    fn push(&mut self, bus: &mut dyn Bus, list: &CpuRegList) -> SimResult<()> {
        if self.sp % 16 != 0 {
            return Err(SimulationError::StackAlignment(self.sp));
        }
        let slot = (list.size_bits() / BITS_PER_BYTE) as u64;
        let new_sp = self.sp.wrapping_sub(list.push_size_in_bytes());
        for (i, reg) in Self::list_entries(list).iter().enumerate() {
            self.store(bus, reg, new_sp + i as u64 * slot)?;
        }
        self.sp = new_sp;
        Ok(())
    }

    fn pop(&mut self, bus: &mut dyn Bus, list: &CpuRegList) -> SimResult<()> {
        if self.sp % 16 != 0 {
            return Err(SimulationError::StackAlignment(self.sp));
        }
        let slot = (list.size_bits() / BITS_PER_BYTE) as u64;
        let sp = self.sp;
        for (i, reg) in Self::list_entries(list).iter().enumerate() {
            self.load(bus, reg, sp + i as u64 * slot)?;
        }
        self.sp = sp.wrapping_add(list.push_size_in_bytes());
        Ok(())
    }
}

impl Cpu for Aarch64 {
    fn reset(&mut self) {
        let features = self.features;
        let vl_bits = (self.vl_bytes as u32) * BITS_PER_BYTE;
        *self = Self::new(features, vl_bits);
    }

    fn execute(&mut self, instr: &Instruction, bus: &mut dyn Bus) -> SimResult<()> {
        tracing::debug!("SP={:#x}, Instr=`{}`", self.sp, instr);
        self.check_sve(instr)?;

        match instr {
            Instruction::MovImm { rd, imm } => {
                self.write_reg(*rd, *imm);
            }
            Instruction::Mov { rd, rn } => {
                let val = self.read_reg(*rn);
                self.write_reg(*rd, val);
            }
            Instruction::AddImm { rd, rn, imm } => {
                let val = self.read_reg(*rn).wrapping_add(*imm);
                self.write_reg(*rd, val);
            }
            Instruction::Str { rt, base, offset } => {
                let addr = self.address(*base, *offset);
                self.store(bus, rt, addr)?;
            }
            Instruction::Ldr { rt, base, offset } => {
                let addr = self.address(*base, *offset);
                self.load(bus, rt, addr)?;
            }
            Instruction::Push(list) => self.push(bus, list)?,
            Instruction::Pop(list) => self.pop(bus, list)?,
            Instruction::MrsNzcv { rt } => {
                let psr = self.nzcv.to_psr();
                self.write_reg(*rt, psr);
            }
            Instruction::MsrNzcv { rt } => {
                let val = self.read_reg(*rt);
                self.nzcv = Nzcv::from_bits_truncate((val >> NZCV_PSR_SHIFT) as u32);
            }
            Instruction::Rdvl { rd, multiplier } => {
                let val = multiplier.wrapping_mul(self.vl_bytes as i64);
                self.write_reg(*rd, val as u64);
            }
            Instruction::AddVl { rd, rn, multiplier } => {
                let delta = multiplier.wrapping_mul(self.vl_bytes as i64);
                let val = self.read_reg(*rn).wrapping_add(delta as u64);
                self.write_reg(*rd, val);
            }
            Instruction::AddPl { rd, rn, multiplier } => {
                let delta = multiplier.wrapping_mul(self.pl_bytes() as i64);
                let val = self.read_reg(*rn).wrapping_add(delta as u64);
                self.write_reg(*rd, val);
            }
            Instruction::FmovImm { vd, bits } => {
                self.write_vreg(*vd, *bits as u128);
            }
            Instruction::Fmov { vd, vn } => {
                let val = self.read_vreg(*vn);
                self.write_vreg(*vd, val);
            }
        }

        Ok(())
    }

    fn set_sp(&mut self, val: u64) {
        self.sp = val;
    }

    fn get_sp(&self) -> u64 {
        self.sp
    }
}

impl Machine<Aarch64> {
    /// Builds a machine matching a target descriptor: RAM map, features and
    /// vector length.
    pub fn from_config(target: &TargetDescriptor) -> anyhow::Result<Self> {
        let bus = SystemBus::from_config(target)?;
        let cpu = Aarch64::new(
            CpuFeatures::from_target(target),
            target.vector_length_bits,
        );
        let mut machine = Self {
            cpu,
            bus,
            observers: Vec::new(),
        };
        machine.cpu.set_sp(machine.bus.stack_top());
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{SP, WSP, XZR};

    #[test]
    fn test_w_write_zero_extends() {
        let mut cpu = Aarch64::default();
        cpu.write_reg(Register::x(3), u64::MAX);
        cpu.write_reg(Register::w(3), 0x1234_5678);
        assert_eq!(cpu.x[3], 0x1234_5678);
    }

    #[test]
    fn test_zero_register_discards() {
        let mut machine = Machine::<Aarch64>::new();
        let program = [Instruction::MovImm {
            rd: XZR,
            imm: 0xdead,
        }];
        machine.run(&program).unwrap();
        assert_eq!(machine.cpu.read_reg(XZR), 0);
        assert!(machine.cpu.x.iter().all(|&x| x == 0));
    }

    #[test]
    fn test_add_from_sp() {
        let mut machine = Machine::<Aarch64>::new();
        machine.cpu.sp = 0x1_2000_fff0;
        let program = [
            Instruction::AddImm {
                rd: Register::x(1),
                rn: SP,
                imm: 0x20,
            },
            Instruction::AddImm {
                rd: Register::w(2),
                rn: WSP,
                imm: 0x20,
            },
        ];
        machine.run(&program).unwrap();
        assert_eq!(machine.cpu.x[1], 0x1_2001_0010);
        assert_eq!(machine.cpu.x[2], 0x2001_0010);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut machine = Machine::<Aarch64>::new();
        let sp = machine.cpu.sp;
        let list = CpuRegList::from_registers(&[Register::x(0), Register::x(1), Register::x(2)]);
        machine.cpu.x[0] = 10;
        machine.cpu.x[1] = 11;
        machine.cpu.x[2] = 12;

        machine.run(&[Instruction::Push(list)]).unwrap();
        assert_eq!(machine.cpu.sp, sp - 32);
        assert_eq!(machine.bus.read_u64(sp - 32).unwrap(), 10);
        assert_eq!(machine.bus.read_u64(sp - 16).unwrap(), 12);

        machine.cpu.x = [0; 31];
        machine.run(&[Instruction::Pop(list)]).unwrap();
        assert_eq!(machine.cpu.sp, sp);
        assert_eq!(&machine.cpu.x[..3], &[10, 11, 12]);
    }

    #[test]
    fn test_misaligned_push() {
        let mut machine = Machine::<Aarch64>::new();
        machine.cpu.sp -= 8;
        let list = CpuRegList::from_registers(&[Register::x(0)]);
        assert!(matches!(
            machine.run(&[Instruction::Push(list)]),
            Err(SimulationError::StackAlignment(_))
        ));
    }

    #[test]
    fn test_scalar_write_clears_upper_vector_bits() {
        let mut cpu = Aarch64::new(CpuFeatures::all(), 256);
        cpu.set_zreg(4, &[0xff; 32]);
        cpu.write_vreg(VRegister::s(4), 0x3f80_0000);
        assert_eq!(cpu.read_vreg(VRegister::q(4)), 0x3f80_0000);
        assert!(cpu.z[4][16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_flags_round_trip() {
        let mut machine = Machine::<Aarch64>::new();
        let program = [
            Instruction::MovImm {
                rd: Register::x(0),
                imm: (Nzcv::Z | Nzcv::C).to_psr(),
            },
            Instruction::MsrNzcv { rt: Register::x(0) },
            Instruction::MrsNzcv { rt: Register::x(1) },
        ];
        machine.run(&program).unwrap();
        assert_eq!(machine.cpu.nzcv, Nzcv::Z | Nzcv::C);
        assert_eq!(machine.cpu.x[1], 0x6000_0000);
    }

    #[test]
    fn test_sve_requires_feature() {
        let mut machine = Machine::<Aarch64>::new();
        let err = machine
            .run(&[Instruction::Rdvl {
                rd: Register::x(0),
                multiplier: 1,
            }])
            .unwrap_err();
        assert!(matches!(err, SimulationError::UndefinedInstruction(_)));
    }

    #[test]
    fn test_rdvl_and_addvl() {
        let target = TargetDescriptor {
            features: vec![
                regcheck_config::Feature::Fp,
                regcheck_config::Feature::Sve,
            ],
            vector_length_bits: 512,
            ..TargetDescriptor::default()
        };
        let mut machine = Machine::<Aarch64>::from_config(&target).unwrap();
        let program = [
            Instruction::Rdvl {
                rd: Register::x(0),
                multiplier: 8,
            },
            Instruction::AddVl {
                rd: Register::x(1),
                rn: Register::x(0),
                multiplier: 2,
            },
            Instruction::AddPl {
                rd: Register::x(2),
                rn: XZR,
                multiplier: 3,
            },
        ];
        machine.run(&program).unwrap();
        assert_eq!(machine.cpu.x[0], 512);
        assert_eq!(machine.cpu.x[1], 512 + 128);
        assert_eq!(machine.cpu.x[2], 24);
    }
}
