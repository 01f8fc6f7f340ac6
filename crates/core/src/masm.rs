// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::flags::CpuFeatures;
use crate::isa::Instruction;
use crate::registers::{
    reg_bit, CpuRegList, CpuRegister, RegList, Register, RegisterBank, VRegister, SP,
    ZERO_REG_CODE,
};

/// x16 and x17, the intra-procedure-call scratch registers.
pub const DEFAULT_SCRATCH_LIST: RegList = (1 << 16) | (1 << 17);
/// d30 and d31.
pub const DEFAULT_V_SCRATCH_LIST: RegList = (1 << 30) | (1 << 31);

/// Trait representing an in-progress instruction sequence.
///
/// Only `emit` and the three queries need implementing; the mnemonic helpers
/// are thin wrappers.
pub trait Emitter {
    fn emit(&mut self, instr: Instruction);
    fn cpu_features(&self) -> CpuFeatures;
    fn stack_pointer(&self) -> Register;
    fn scratch(&mut self) -> &mut ScratchPool;

    fn mov_imm(&mut self, rd: Register, imm: u64) {
        self.emit(Instruction::MovImm { rd, imm });
    }

    fn mov(&mut self, rd: Register, rn: Register) {
        self.emit(Instruction::Mov { rd, rn });
    }

    fn add(&mut self, rd: Register, rn: Register, imm: u64) {
        self.emit(Instruction::AddImm { rd, rn, imm });
    }

    fn str(&mut self, rt: CpuRegister, base: Register, offset: i64) {
        self.emit(Instruction::Str { rt, base, offset });
    }

    fn ldr(&mut self, rt: CpuRegister, base: Register, offset: i64) {
        self.emit(Instruction::Ldr { rt, base, offset });
    }

    fn push_list(&mut self, list: CpuRegList) {
        self.emit(Instruction::Push(list));
    }

    fn pop_list(&mut self, list: CpuRegList) {
        self.emit(Instruction::Pop(list));
    }

    fn mrs_nzcv(&mut self, rt: Register) {
        self.emit(Instruction::MrsNzcv { rt });
    }

    fn msr_nzcv(&mut self, rt: Register) {
        self.emit(Instruction::MsrNzcv { rt });
    }

    fn rdvl(&mut self, rd: Register, multiplier: i64) {
        self.emit(Instruction::Rdvl { rd, multiplier });
    }

    fn addvl(&mut self, rd: Register, rn: Register, multiplier: i64) {
        self.emit(Instruction::AddVl { rd, rn, multiplier });
    }

    fn addpl(&mut self, rd: Register, rn: Register, multiplier: i64) {
        self.emit(Instruction::AddPl { rd, rn, multiplier });
    }

    fn fmov_imm(&mut self, vd: VRegister, value: f64) {
        assert!(vd.is_64_bits(), "fmov immediate expects a D register");
        self.emit(Instruction::FmovImm {
            vd,
            bits: value.to_bits(),
        });
    }

    fn fmov(&mut self, vd: VRegister, vn: VRegister) {
        self.emit(Instruction::Fmov { vd, vn });
    }
}

/// Registers a helper may use for its own bookkeeping.
///
/// An acquired register leaves the pool, so two live acquisitions never
/// alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPool {
    available: RegList,
    available_v: RegList,
    depth: usize,
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_LIST, DEFAULT_V_SCRATCH_LIST)
    }
}

impl ScratchPool {
    pub fn new(available: RegList, available_v: RegList) -> Self {
        assert_eq!(
            available & reg_bit(ZERO_REG_CODE),
            0,
            "the zero register cannot be a scratch register"
        );
        Self {
            available,
            available_v,
            depth: 0,
        }
    }

    pub fn available(&self) -> RegList {
        self.available
    }

    pub fn available_v(&self) -> RegList {
        self.available_v
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_available(&self, reg: Register) -> bool {
        !reg.is_sp() && self.available & reg_bit(reg.code()) != 0
    }

    pub fn acquire_x(&mut self) -> Register {
        assert!(self.available != 0, "no scratch registers available");
        let code = self.available.trailing_zeros() as u8;
        self.available &= !reg_bit(code);
        Register::x(code)
    }

    pub fn acquire_d(&mut self) -> VRegister {
        assert!(self.available_v != 0, "no V scratch registers available");
        let code = self.available_v.trailing_zeros() as u8;
        self.available_v &= !reg_bit(code);
        VRegister::d(code)
    }

    pub fn include(&mut self, list: &CpuRegList) {
        match list.bank() {
            RegisterBank::General => {
                assert!(
                    !list.includes(ZERO_REG_CODE),
                    "the zero register cannot be a scratch register"
                );
                self.available |= list.list();
            }
            RegisterBank::Vector => self.available_v |= list.list(),
        }
    }

    pub fn exclude(&mut self, list: &CpuRegList) {
        match list.bank() {
            RegisterBank::General => self.available &= !list.list(),
            RegisterBank::Vector => self.available_v &= !list.list(),
        }
    }

    pub fn exclude_all(&mut self) {
        self.available = 0;
        self.available_v = 0;
    }
}

/// A strictly nested reservation of the scratch pool.
///
/// `open` remembers the pool; `close` puts it back. Scopes must be closed in
/// reverse order of opening.
#[must_use = "a scratch scope must be closed"]
#[derive(Debug)]
pub struct ScratchScope {
    saved: RegList,
    saved_v: RegList,
    depth: usize,
}

impl ScratchScope {
    pub fn open<M: Emitter + ?Sized>(masm: &mut M) -> Self {
        let pool = masm.scratch();
        pool.depth += 1;
        Self {
            saved: pool.available,
            saved_v: pool.available_v,
            depth: pool.depth,
        }
    }

    pub fn close<M: Emitter + ?Sized>(self, masm: &mut M) {
        let pool = masm.scratch();
        assert_eq!(
            pool.depth, self.depth,
            "scratch scopes must be closed innermost first"
        );
        pool.available = self.saved;
        pool.available_v = self.saved_v;
        pool.depth -= 1;
    }
}

/// In-memory emitter: collects the instruction sequence for later execution.
#[derive(Debug)]
pub struct CodeBuffer {
    instructions: Vec<Instruction>,
    features: CpuFeatures,
    stack_pointer: Register,
    scratch: ScratchPool,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new(CpuFeatures::FP | CpuFeatures::NEON)
    }
}

impl CodeBuffer {
    pub fn new(features: CpuFeatures) -> Self {
        Self {
            instructions: Vec::new(),
            features,
            stack_pointer: SP,
            scratch: ScratchPool::default(),
        }
    }

    /// Selects the register used as the stack pointer by push and pop.
    pub fn set_stack_pointer(&mut self, reg: Register) {
        assert!(reg.is_64_bits());
        self.stack_pointer = reg;
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn take(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.instructions)
    }
}

impl Emitter for CodeBuffer {
    fn emit(&mut self, instr: Instruction) {
        if instr.requires_sve() && !self.features.contains(CpuFeatures::SVE) {
            tracing::warn!("Emitting {} without SVE enabled", instr);
        }
        self.instructions.push(instr);
    }

    fn cpu_features(&self) -> CpuFeatures {
        self.features
    }

    fn stack_pointer(&self) -> Register {
        self.stack_pointer
    }

    fn scratch(&mut self) -> &mut ScratchPool {
        &mut self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_never_aliases() {
        let mut masm = CodeBuffer::default();
        let a = masm.scratch().acquire_x();
        let b = masm.scratch().acquire_x();
        assert_eq!(a, Register::x(16));
        assert_eq!(b, Register::x(17));
        assert!(!a.aliases(b));
        assert!(!masm.scratch().is_available(a));
        assert_eq!(masm.scratch().acquire_d(), VRegister::d(30));
        assert_eq!(masm.scratch().available_v(), 1 << 31);
    }

    #[test]
    #[should_panic(expected = "no scratch registers available")]
    fn test_acquire_from_empty_pool() {
        let mut masm = CodeBuffer::default();
        masm.scratch().exclude_all();
        masm.scratch().acquire_x();
    }

    #[test]
    fn test_scope_restores_pool() {
        let mut masm = CodeBuffer::default();
        let before = masm.scratch().clone();

        let outer = ScratchScope::open(&mut masm);
        masm.scratch().acquire_x();
        let inner = ScratchScope::open(&mut masm);
        masm.scratch().acquire_x();
        assert_eq!(masm.scratch().available(), 0);
        inner.close(&mut masm);
        assert_eq!(masm.scratch().available(), 1 << 17);
        outer.close(&mut masm);

        assert_eq!(*masm.scratch(), before);
    }

    #[test]
    #[should_panic(expected = "innermost first")]
    fn test_scope_out_of_order() {
        let mut masm = CodeBuffer::default();
        let outer = ScratchScope::open(&mut masm);
        let _inner = ScratchScope::open(&mut masm);
        outer.close(&mut masm);
    }

    #[test]
    fn test_include_exclude() {
        let mut masm = CodeBuffer::default();
        let list = CpuRegList::from_registers(&[Register::x(0), Register::x(1)]);
        masm.scratch().exclude_all();
        masm.scratch().include(&list);
        assert_eq!(masm.scratch().available(), 0b11);
        masm.scratch().exclude(&list);
        assert_eq!(masm.scratch().available(), 0);
    }

    #[test]
    fn test_helpers_emit() {
        let mut masm = CodeBuffer::default();
        masm.mov_imm(Register::x(1), 42);
        masm.add(Register::x(2), SP, 16);
        assert_eq!(masm.len(), 2);
        assert_eq!(masm.instructions()[1].to_string(), "add x2, sp, #0x10");
    }
}
