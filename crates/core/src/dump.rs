// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register state capture.
//!
//! `RegisterDump::dump` emits code that, once executed, writes every
//! architectural register into a record in target memory. The record is then
//! copied out with `RegisterDump::load` and inspected through the accessors.
//!
//! Record layout (little-endian, offsets from the record base):
//!
//! | field | size |
//! |-------|------|
//! | X0..X31 | 32 x 8 |
//! | W0..W31 | 32 x 4 |
//! | D0..D31 | 32 x 8 |
//! | S0..S31 | 32 x 4 |
//! | H0..H31 | 32 x 2 |
//! | Q0..Q31 | 32 x 16 |
//! | sp, wsp, flags, vl, completion marker | 8 each |
//! | Z0..Z31 | 32 x VL |
//! | P0..P15 | 16 x PL |
//!
//! The Z/P arena has a run-time stride, so it sits after every fixed field.
//! Index 31 of the general fields is the zero register.

use crate::flags::{CpuFeatures, Nzcv};
use crate::masm::{Emitter, ScratchScope};
use crate::registers::{
    CpuRegList, CpuRegister, PRegister, Register, RegisterBank, VRegister, ZRegister,
    BITS_PER_BYTE, D_REG_SIZE, D_REG_SIZE_IN_BYTES, H_REG_SIZE, H_REG_SIZE_IN_BYTES,
    MAX_VL_BITS, MAX_VL_BYTES, NUMBER_OF_P_REGISTERS, NUMBER_OF_REGISTERS,
    NUMBER_OF_V_REGISTERS, NUMBER_OF_Z_REGISTERS, Q_REG_SIZE, Q_REG_SIZE_IN_BYTES, SP,
    SP_INTERNAL_CODE, S_REG_SIZE, S_REG_SIZE_IN_BYTES, WSP, W_REG_SIZE, W_REG_SIZE_IN_BYTES,
    X_REG_SIZE, X_REG_SIZE_IN_BYTES,
};
use crate::value::{Float16, QRegisterValue};
use crate::{Bus, SimulationError};
use std::sync::atomic::{AtomicU64, Ordering};

pub const X_OFFSET: u64 = 0;
pub const W_OFFSET: u64 = X_OFFSET + NUMBER_OF_REGISTERS as u64 * X_REG_SIZE_IN_BYTES;
pub const D_OFFSET: u64 = W_OFFSET + NUMBER_OF_REGISTERS as u64 * W_REG_SIZE_IN_BYTES;
pub const S_OFFSET: u64 = D_OFFSET + NUMBER_OF_V_REGISTERS as u64 * D_REG_SIZE_IN_BYTES;
pub const H_OFFSET: u64 = S_OFFSET + NUMBER_OF_V_REGISTERS as u64 * S_REG_SIZE_IN_BYTES;
pub const Q_OFFSET: u64 = H_OFFSET + NUMBER_OF_V_REGISTERS as u64 * H_REG_SIZE_IN_BYTES;
pub const SP_OFFSET: u64 = Q_OFFSET + NUMBER_OF_V_REGISTERS as u64 * Q_REG_SIZE_IN_BYTES;
pub const WSP_OFFSET: u64 = SP_OFFSET + 8;
pub const FLAGS_OFFSET: u64 = WSP_OFFSET + 8;
pub const VL_OFFSET: u64 = FLAGS_OFFSET + 8;
pub const COMPLETED_OFFSET: u64 = VL_OFFSET + 8;
pub const Z_OFFSET: u64 = (COMPLETED_OFFSET + 8 + 15) & !15;

/// Bytes reserved for a record at the largest vector length.
pub const RECORD_CAPACITY: u64 = record_size(MAX_VL_BYTES);

/// Size of a record whose vector arena uses `vl_bytes` as its stride.
pub const fn record_size(vl_bytes: u64) -> u64 {
    p_offset(vl_bytes) + NUMBER_OF_P_REGISTERS as u64 * (vl_bytes / 8)
}

pub const fn z_entry_offset(code: u64, vl_bytes: u64) -> u64 {
    Z_OFFSET + code * vl_bytes
}

pub const fn p_offset(vl_bytes: u64) -> u64 {
    Z_OFFSET + NUMBER_OF_Z_REGISTERS as u64 * vl_bytes
}

pub const fn p_entry_offset(code: u64, vl_bytes: u64) -> u64 {
    p_offset(vl_bytes) + code * (vl_bytes / 8)
}

/// Scratch registers the capture pushes before doing anything else. They are
/// also the registers it needs back from the stack at the end.
pub const CAPTURE_SCRATCH_CODES: [u8; 4] = [0, 1, 2, 3];

/// Holds the record address while the scratch registers are popped. It must
/// not be one of them, and is reloaded from its own X slot last.
pub const RESTORE_BASE_CODE: u8 = 10;

/// High bits of every completion marker. Fresh memory never matches.
pub const CAPTURE_MARKER_TAG: u64 = 0xc0de_0000_0000_0000;

static NEXT_CAPTURE: AtomicU64 = AtomicU64::new(1);

fn next_capture_marker() -> u64 {
    CAPTURE_MARKER_TAG | (NEXT_CAPTURE.fetch_add(1, Ordering::Relaxed) & !CAPTURE_MARKER_TAG)
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Record at {base:#x} is incomplete (expected marker {expected:#x}, found {marker:#x})")]
    Incomplete { base: u64, expected: u64, marker: u64 },
    #[error("Record at {base:#x} holds an invalid vector length of {vl_bits} bits")]
    InvalidVectorLength { base: u64, vl_bits: u64 },
    #[error("Record at {base:#x} needs {required} bytes of readable memory")]
    Truncated { base: u64, required: u64 },
    #[error(transparent)]
    Bus(#[from] SimulationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Nothing emitted yet.
    Idle,
    /// Scratch originals are on the stack; the scratch registers are in use.
    Protected,
    /// Every scratch original is back in its record slot.
    Restored,
}

/// Two-phase protection of the registers the capture itself needs.
///
/// Phase one pushes the originals before any destructive use. Phase two pops
/// them and stores each straight into its own slot, then reloads the restore
/// base register from its slot as the very last instruction.
#[derive(Debug)]
pub struct CaptureProtocol {
    phase: CapturePhase,
    protected: CpuRegList,
}

impl CaptureProtocol {
    pub fn new(protected: CpuRegList) -> Self {
        assert_eq!(protected.bank(), RegisterBank::General);
        assert_eq!(protected.size_bits(), X_REG_SIZE);
        Self {
            phase: CapturePhase::Idle,
            protected,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn protected(&self) -> &CpuRegList {
        &self.protected
    }

    /// Stack space taken by phase one.
    pub fn push_size_in_bytes(&self) -> u64 {
        self.protected.push_size_in_bytes()
    }

    /// Phase one: push the originals, then hand the registers to the pool.
    pub fn protect<M: Emitter + ?Sized>(&mut self, masm: &mut M) {
        assert_eq!(self.phase, CapturePhase::Idle, "capture already protected");
        masm.scratch().exclude_all();
        masm.push_list(self.protected);
        masm.scratch().include(&self.protected);
        self.phase = CapturePhase::Protected;
    }

    /// Phase two: pop the originals directly into their record slots, then
    /// write `marker` to the completion slot as the final store.
    ///
    /// `dump_base` must be one of the protected registers; `restore_base`
    /// must not be, and must already hold its original value in the record.
    pub fn restore_into_record<M: Emitter + ?Sized>(
        &mut self,
        masm: &mut M,
        dump_base: Register,
        restore_base: Register,
        marker: u64,
    ) {
        assert_eq!(self.phase, CapturePhase::Protected, "nothing to restore");
        assert!(
            !self.protected.includes_alias_of(restore_base),
            "{} is both a protected scratch register and the restore base",
            restore_base
        );
        assert!(
            self.protected.includes_alias_of(dump_base),
            "{} holds the record address but is not protected",
            dump_base
        );
        assert!(!restore_base.is_sp() && !restore_base.is_zero());

        // Nothing may hand out the protected registers past this point.
        masm.scratch().exclude_all();

        masm.mov(restore_base, dump_base);
        masm.pop_list(self.protected);

        let mut pending = self.protected;
        let token = {
            let mut lowest = self.protected;
            lowest.pop_lowest_index().map(Register::x)
        };
        while let Some(code) = pending.pop_lowest_index() {
            let x = Register::x(code);
            let w = Register::w(code);
            masm.str(x.into(), restore_base, slot_offset(X_OFFSET, code, X_REG_SIZE_IN_BYTES));
            masm.str(w.into(), restore_base, slot_offset(W_OFFSET, code, W_REG_SIZE_IN_BYTES));
        }

        // The token's original is already in its slot; it carries the
        // marker and is reloaded from that slot.
        if let Some(token) = token {
            masm.mov_imm(token, marker);
            masm.str(token.into(), restore_base, COMPLETED_OFFSET as i64);
            masm.ldr(
                token.into(),
                restore_base,
                slot_offset(X_OFFSET, token.code(), X_REG_SIZE_IN_BYTES),
            );
        }

        masm.ldr(
            restore_base.into(),
            restore_base,
            slot_offset(X_OFFSET, restore_base.code(), X_REG_SIZE_IN_BYTES),
        );
        self.phase = CapturePhase::Restored;
    }
}

fn slot_offset(field: u64, code: u8, size: u64) -> i64 {
    (field + code as u64 * size) as i64
}

#[derive(Debug, Clone, Copy)]
enum Stride {
    Bytes(u64),
    VectorLength,
    PredicateLength,
}

/// Stores `count` registers into consecutive slots starting at
/// `dump_base + offset`, using one extra scratch register as the cursor.
fn dump_registers<M, F>(
    masm: &mut M,
    dump_base: Register,
    offset: u64,
    count: usize,
    reg: F,
    stride: Stride,
) where
    M: Emitter + ?Sized,
    F: Fn(u8) -> CpuRegister,
{
    let scope = ScratchScope::open(masm);
    let dump = masm.scratch().acquire_x();
    masm.add(dump, dump_base, offset);
    for code in 0..count as u8 {
        masm.str(reg(code), dump, 0);
        match stride {
            Stride::Bytes(bytes) => masm.add(dump, dump, bytes),
            Stride::VectorLength => masm.addvl(dump, dump, 1),
            Stride::PredicateLength => masm.addpl(dump, dump, 1),
        }
    }
    scope.close(masm);
}

/// A captured copy of the architectural register state.
#[derive(Debug)]
pub struct RegisterDump {
    base: u64,
    marker: u64,
    dump_cpu_features: CpuFeatures,
    record: Vec<u8>,
    emitted: bool,
    completed: bool,
}

impl RegisterDump {
    /// A dump whose record lives at `base` in target memory. The region must
    /// be at least `RECORD_CAPACITY` bytes.
    pub fn new(base: u64) -> Self {
        assert!(base != 0, "record address must be non-zero");
        assert_eq!(base % 16, 0, "record address must be 16-byte aligned");
        Self {
            base,
            marker: 0,
            dump_cpu_features: CpuFeatures::empty(),
            record: Vec::new(),
            emitted: false,
            completed: false,
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Value the emitted code leaves in the completion slot; zero until
    /// `dump` has run.
    pub fn marker(&self) -> u64 {
        self.marker
    }

    /// Emits the full capture sequence.
    ///
    /// The emitted code leaves every register, including the ones it borrows,
    /// at its pre-capture value. It must run without other register-touching
    /// code interleaved.
    pub fn dump<M: Emitter + ?Sized>(&mut self, masm: &mut M) {
        assert!(
            masm.stack_pointer() == SP,
            "capture requires sp as the active stack pointer, found {}",
            masm.stack_pointer()
        );
        assert!(!self.emitted, "register dump already emitted");

        let start = ScratchScope::open(masm);

        self.dump_cpu_features = masm.cpu_features();
        self.marker = next_capture_marker();
        tracing::debug!(
            "Emitting register dump to {:#x} (features {:?}, marker {:#x})",
            self.base,
            self.dump_cpu_features,
            self.marker
        );

        let scratch_regs: Vec<Register> = CAPTURE_SCRATCH_CODES
            .iter()
            .map(|&code| Register::x(code))
            .collect();
        let mut protocol = CaptureProtocol::new(CpuRegList::from_registers(&scratch_regs));
        protocol.protect(masm);

        let dump_base = masm.scratch().acquire_x();
        let tmp = masm.scratch().acquire_x();

        masm.mov_imm(dump_base, self.base);

        // The stack pointer can't be stored directly, and the protect phase
        // moved it.
        let pushed = protocol.push_size_in_bytes();
        masm.add(tmp, SP, pushed);
        masm.str(tmp.into(), dump_base, SP_OFFSET as i64);
        masm.add(tmp.as_w(), WSP, pushed);
        masm.str(tmp.as_w().into(), dump_base, WSP_OFFSET as i64);

        dump_registers(
            masm,
            dump_base,
            X_OFFSET,
            NUMBER_OF_REGISTERS,
            |code| Register::new(code, X_REG_SIZE).into(),
            Stride::Bytes(X_REG_SIZE_IN_BYTES),
        );
        dump_registers(
            masm,
            dump_base,
            W_OFFSET,
            NUMBER_OF_REGISTERS,
            |code| Register::new(code, W_REG_SIZE).into(),
            Stride::Bytes(W_REG_SIZE_IN_BYTES),
        );

        for (offset, size_bits, bytes) in [
            (Q_OFFSET, Q_REG_SIZE, Q_REG_SIZE_IN_BYTES),
            (D_OFFSET, D_REG_SIZE, D_REG_SIZE_IN_BYTES),
            (S_OFFSET, S_REG_SIZE, S_REG_SIZE_IN_BYTES),
            (H_OFFSET, H_REG_SIZE, H_REG_SIZE_IN_BYTES),
        ] {
            dump_registers(
                masm,
                dump_base,
                offset,
                NUMBER_OF_V_REGISTERS,
                |code| VRegister::new(code, size_bits).into(),
                Stride::Bytes(bytes),
            );
        }

        if self.dump_cpu_features.contains(CpuFeatures::SVE) {
            dump_registers(
                masm,
                dump_base,
                Z_OFFSET,
                NUMBER_OF_Z_REGISTERS,
                |code| ZRegister::new(code).into(),
                Stride::VectorLength,
            );

            // P0 starts right after Z31; its address is only known at run time.
            let scope = ScratchScope::open(masm);
            let p_base = masm.scratch().acquire_x();
            masm.addvl(p_base, dump_base, NUMBER_OF_Z_REGISTERS as i64);
            dump_registers(
                masm,
                p_base,
                Z_OFFSET,
                NUMBER_OF_P_REGISTERS,
                |code| PRegister::new(code).into(),
                Stride::PredicateLength,
            );
            scope.close(masm);

            masm.rdvl(tmp, BITS_PER_BYTE as i64);
            masm.str(tmp.into(), dump_base, VL_OFFSET as i64);
        }

        masm.mrs_nzcv(tmp);
        masm.str(tmp.into(), dump_base, FLAGS_OFFSET as i64);

        let restore_base = Register::x(RESTORE_BASE_CODE);
        protocol.restore_into_record(masm, dump_base, restore_base, self.marker);
        debug_assert_eq!(protocol.phase(), CapturePhase::Restored);

        start.close(masm);
        self.emitted = true;
    }

    /// Copies the record out of target memory once the emitted code has run.
    pub fn load(&mut self, bus: &dyn Bus) -> Result<(), DumpError> {
        assert!(self.emitted, "load called before the capture was emitted");
        assert!(!self.completed, "register dump is write-once");

        let marker = bus.read_u64(self.base + COMPLETED_OFFSET)?;
        if marker != self.marker {
            return Err(DumpError::Incomplete {
                base: self.base,
                expected: self.marker,
                marker,
            });
        }

        let vl_bytes = if self.dump_cpu_features.contains(CpuFeatures::SVE) {
            let vl_bits = bus.read_u64(self.base + VL_OFFSET)?;
            if vl_bits == 0 || vl_bits % 128 != 0 || vl_bits > MAX_VL_BITS as u64 {
                return Err(DumpError::InvalidVectorLength {
                    base: self.base,
                    vl_bits,
                });
            }
            vl_bits / BITS_PER_BYTE as u64
        } else {
            0
        };

        let required = record_size(vl_bytes);
        self.record = bus
            .read_bytes(self.base, required as usize)
            .map_err(|e| match e {
                SimulationError::MemoryViolation(_) => DumpError::Truncated {
                    base: self.base,
                    required,
                },
                other => DumpError::Bus(other),
            })?;
        self.completed = true;
        tracing::debug!(
            "Loaded register dump from {:#x} ({} bytes)",
            self.base,
            self.record.len()
        );
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn cpu_features(&self) -> CpuFeatures {
        self.check_complete();
        self.dump_cpu_features
    }

    fn check_complete(&self) {
        assert!(self.completed, "register dump read before completion");
    }

    fn bytes(&self, offset: u64, len: usize) -> &[u8] {
        self.check_complete();
        let start = offset as usize;
        &self.record[start..start + len]
    }

    fn read_u64(&self, offset: u64) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(offset, 8));
        u64::from_le_bytes(buf)
    }

    fn read_u32(&self, offset: u64) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.bytes(offset, 4));
        u32::from_le_bytes(buf)
    }

    fn read_u16(&self, offset: u64) -> u16 {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.bytes(offset, 2));
        u16::from_le_bytes(buf)
    }

    /// X register value; the internal stack pointer code reads `sp`.
    pub fn xreg(&self, code: u8) -> u64 {
        if code == SP_INTERNAL_CODE {
            return self.sp();
        }
        assert!((code as usize) < NUMBER_OF_REGISTERS);
        self.read_u64(X_OFFSET + code as u64 * X_REG_SIZE_IN_BYTES)
    }

    pub fn wreg(&self, code: u8) -> u32 {
        if code == SP_INTERNAL_CODE {
            return self.wsp();
        }
        assert!((code as usize) < NUMBER_OF_REGISTERS);
        self.read_u32(W_OFFSET + code as u64 * W_REG_SIZE_IN_BYTES)
    }

    pub fn sp(&self) -> u64 {
        self.read_u64(SP_OFFSET)
    }

    pub fn wsp(&self) -> u32 {
        self.read_u32(WSP_OFFSET)
    }

    pub fn dreg_bits(&self, code: u8) -> u64 {
        assert!((code as usize) < NUMBER_OF_V_REGISTERS);
        self.read_u64(D_OFFSET + code as u64 * D_REG_SIZE_IN_BYTES)
    }

    pub fn dreg(&self, code: u8) -> f64 {
        f64::from_bits(self.dreg_bits(code))
    }

    pub fn sreg_bits(&self, code: u8) -> u32 {
        assert!((code as usize) < NUMBER_OF_V_REGISTERS);
        self.read_u32(S_OFFSET + code as u64 * S_REG_SIZE_IN_BYTES)
    }

    pub fn sreg(&self, code: u8) -> f32 {
        f32::from_bits(self.sreg_bits(code))
    }

    pub fn hreg(&self, code: u8) -> Float16 {
        assert!((code as usize) < NUMBER_OF_V_REGISTERS);
        Float16::from_bits(self.read_u16(H_OFFSET + code as u64 * H_REG_SIZE_IN_BYTES))
    }

    pub fn qreg(&self, code: u8) -> QRegisterValue {
        assert!((code as usize) < NUMBER_OF_V_REGISTERS);
        let offset = Q_OFFSET + code as u64 * Q_REG_SIZE_IN_BYTES;
        QRegisterValue::new(self.read_u64(offset + 8), self.read_u64(offset))
    }

    /// The flags word, as N/Z/C/V in bits 3..0.
    pub fn flags_nzcv(&self) -> u32 {
        self.flags().bits()
    }

    pub fn flags(&self) -> Nzcv {
        Nzcv::from_psr(self.read_u64(FLAGS_OFFSET))
    }

    /// Vector length in bits, or zero if SVE was not enabled.
    pub fn vl_bits(&self) -> u64 {
        if self.dump_cpu_features.contains(CpuFeatures::SVE) {
            self.read_u64(VL_OFFSET)
        } else {
            0
        }
    }

    fn vl_bytes(&self) -> u64 {
        self.vl_bits() / BITS_PER_BYTE as u64
    }

    fn check_sve(&self) {
        self.check_complete();
        assert!(
            self.dump_cpu_features.contains(CpuFeatures::SVE),
            "dump was taken without SVE"
        );
    }

    pub fn zreg(&self, code: u8) -> &[u8] {
        self.check_sve();
        assert!((code as usize) < NUMBER_OF_Z_REGISTERS);
        let vl = self.vl_bytes();
        self.bytes(z_entry_offset(code as u64, vl), vl as usize)
    }

    /// One lane of a Z register, zero-extended. `lane_size_in_bytes` is 1, 2,
    /// 4 or 8.
    pub fn zreg_lane(&self, code: u8, lane_size_in_bytes: usize, lane: usize) -> u64 {
        assert!(matches!(lane_size_in_bytes, 1 | 2 | 4 | 8));
        let bytes = self.zreg(code);
        let start = lane * lane_size_in_bytes;
        assert!(start + lane_size_in_bytes <= bytes.len(), "lane {} out of range", lane);
        let mut buf = [0u8; 8];
        buf[..lane_size_in_bytes].copy_from_slice(&bytes[start..start + lane_size_in_bytes]);
        u64::from_le_bytes(buf)
    }

    pub fn preg_bits(&self, code: u8) -> &[u8] {
        self.check_sve();
        assert!((code as usize) < NUMBER_OF_P_REGISTERS);
        let vl = self.vl_bytes();
        self.bytes(p_entry_offset(code as u64, vl), (vl / 8) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Instruction;
    use crate::masm::CodeBuffer;
    use crate::registers::MAX_PL_BYTES;

    #[test]
    fn test_layout() {
        assert_eq!(W_OFFSET, 256);
        assert_eq!(D_OFFSET, 384);
        assert_eq!(Q_OFFSET % 16, 0);
        assert_eq!(Z_OFFSET % 16, 0);
        assert!(Z_OFFSET > COMPLETED_OFFSET);
        assert_eq!(p_offset(32), Z_OFFSET + 32 * 32);
        assert_eq!(p_entry_offset(2, 32), p_offset(32) + 8);
        assert_eq!(record_size(0), Z_OFFSET);
        assert_eq!(
            RECORD_CAPACITY,
            Z_OFFSET + 32 * MAX_VL_BYTES + 16 * MAX_PL_BYTES
        );
    }

    #[test]
    fn test_restore_base_reloaded_last() {
        let mut masm = CodeBuffer::default();
        let mut dump = RegisterDump::new(0x2000_0000);
        dump.dump(&mut masm);

        let x10 = Register::x(RESTORE_BASE_CODE);
        let last = masm.instructions().last().unwrap();
        assert_eq!(
            *last,
            Instruction::Ldr {
                rt: x10.into(),
                base: x10,
                offset: (X_OFFSET + 10 * 8) as i64,
            }
        );
        assert!(!CAPTURE_SCRATCH_CODES.contains(&RESTORE_BASE_CODE));
    }

    #[test]
    fn test_marker_is_last_store() {
        let mut masm = CodeBuffer::default();
        let mut dump = RegisterDump::new(0x2000_0000);
        dump.dump(&mut masm);

        let marker = dump.marker();
        assert_eq!(marker & CAPTURE_MARKER_TAG, CAPTURE_MARKER_TAG);
        let x0 = Register::x(0);
        let tail = &masm.instructions()[masm.len() - 4..];
        assert_eq!(tail[0], Instruction::MovImm { rd: x0, imm: marker });
        assert_eq!(
            tail[1],
            Instruction::Str {
                rt: x0.into(),
                base: Register::x(RESTORE_BASE_CODE),
                offset: COMPLETED_OFFSET as i64,
            }
        );
        assert!(!tail[2..]
            .iter()
            .any(|i| matches!(i, Instruction::Str { .. } | Instruction::Push(_))));
    }

    #[test]
    fn test_markers_unique_per_capture() {
        let mut first = RegisterDump::new(0x2000_0000);
        let mut second = RegisterDump::new(0x2000_0000);
        assert_eq!(first.marker(), 0);
        first.dump(&mut CodeBuffer::default());
        second.dump(&mut CodeBuffer::default());
        assert_ne!(first.marker(), second.marker());
        assert_ne!(first.marker(), first.base());
    }

    #[test]
    fn test_minimum_record_matches_config() {
        assert_eq!(record_size(0), regcheck_config::MIN_RECORD_BYTES);
    }

    #[test]
    fn test_pool_restored_after_dump() {
        let mut masm = CodeBuffer::default();
        let before = masm.scratch().clone();
        RegisterDump::new(0x2000_0000).dump(&mut masm);
        assert_eq!(*masm.scratch(), before);
    }

    #[test]
    fn test_sve_adds_vector_capture() {
        let mut plain = CodeBuffer::default();
        RegisterDump::new(0x2000_0000).dump(&mut plain);

        let mut sve = CodeBuffer::new(CpuFeatures::all());
        RegisterDump::new(0x2000_0000).dump(&mut sve);

        // A store and an increment per Z and per P register, one cursor setup
        // per bank, the P base, and the vector length readout.
        assert_eq!(
            sve.len() - plain.len(),
            2 * NUMBER_OF_Z_REGISTERS + 2 * NUMBER_OF_P_REGISTERS + 2 + 1 + 2
        );
        assert!(plain.instructions().iter().all(|i| !i.requires_sve()));
    }

    #[test]
    #[should_panic(expected = "active stack pointer")]
    fn test_rejects_other_stack_pointer() {
        let mut masm = CodeBuffer::default();
        masm.set_stack_pointer(Register::x(28));
        RegisterDump::new(0x2000_0000).dump(&mut masm);
    }

    #[test]
    #[should_panic(expected = "both a protected scratch register and the restore base")]
    fn test_restore_base_overlap_is_fatal() {
        let mut masm = CodeBuffer::default();
        let list = CpuRegList::from_registers(&[Register::x(0), Register::x(10)]);
        let mut protocol = CaptureProtocol::new(list);
        protocol.protect(&mut masm);
        protocol.restore_into_record(&mut masm, Register::x(0), Register::x(10), 1);
    }

    #[test]
    #[should_panic(expected = "nothing to restore")]
    fn test_restore_before_protect() {
        let mut masm = CodeBuffer::default();
        let list = CpuRegList::from_registers(&[Register::x(0)]);
        let mut protocol = CaptureProtocol::new(list);
        protocol.restore_into_record(&mut masm, Register::x(0), Register::x(10), 1);
    }

    #[test]
    #[should_panic(expected = "read before completion")]
    fn test_read_before_load() {
        let mut masm = CodeBuffer::default();
        let mut dump = RegisterDump::new(0x2000_0000);
        dump.dump(&mut masm);
        dump.xreg(0);
    }
}
