// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use regcheck_config::TargetDescriptor;
use regcheck_core::clobber::{clobber, clobber_fp};
use regcheck_core::compare::{equal_64_reg, equal_64_vreg, equal_nzcv, equal_registers};
use regcheck_core::cpu::Aarch64;
use regcheck_core::dump::{RegisterDump, RECORD_CAPACITY};
use regcheck_core::flags::{CpuFeatures, Nzcv};
use regcheck_core::masm::{CodeBuffer, Emitter};
use regcheck_core::metrics::PerformanceMetrics;
use regcheck_core::registers::{
    reg_bit, Register, VRegister, NUMBER_OF_V_REGISTERS, ZERO_REG_CODE,
};
use regcheck_core::snapshot::MachineSnapshot;
use regcheck_core::Machine;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_MISMATCH: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

/// Registers that keep the target's poison values instead of a seeded
/// pattern: the default scratch registers.
const POISONED_X: [u8; 2] = [16, 17];
const POISONED_D: [u8; 2] = [30, 31];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the target descriptor (YAML)
    #[arg(short = 'c', long)]
    target: Option<PathBuf>,

    /// Seed for the register values loaded before capture
    #[arg(short, long, default_value_t = 0x5eed)]
    seed: u64,

    /// Enable instruction-level execution tracing
    #[arg(short, long)]
    trace: bool,

    /// Write the first capture as JSON to this path
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    info!("Starting RegCheck");

    let target = match load_target(&args) {
        Ok(target) => target,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&args, &target) {
        Ok(true) => {
            info!("All registers match");
            ExitCode::from(EXIT_PASS)
        }
        Ok(false) => {
            error!("Register comparison failed");
            ExitCode::from(EXIT_MISMATCH)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn load_target(args: &Args) -> anyhow::Result<TargetDescriptor> {
    let target = if let Some(path) = &args.target {
        info!("Loading target descriptor: {:?}", path);
        TargetDescriptor::from_file(path)?
    } else {
        info!("Using default target");
        let target = TargetDescriptor::default();
        target.validate()?;
        target
    };
    // Two records, back to back.
    target.check_record_fits(2 * RECORD_CAPACITY)?;
    Ok(target)
}

/// splitmix64, keyed by register index.
fn seed_pattern(seed: u64, index: u64) -> u64 {
    let mut z = seed.wrapping_add((index + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

struct SeededState {
    x: Vec<u64>,
    d: Vec<u64>,
    nzcv: Nzcv,
}

fn seeded_state(seed: u64, target: &TargetDescriptor) -> SeededState {
    let x = (0..ZERO_REG_CODE)
        .map(|i| {
            if POISONED_X.contains(&i) {
                target.poison.general
            } else {
                seed_pattern(seed, i as u64)
            }
        })
        .collect();
    let d = (0..NUMBER_OF_V_REGISTERS as u8)
        .map(|i| {
            if POISONED_D.contains(&i) {
                target.poison.fp_bits
            } else {
                seed_pattern(seed, 32 + i as u64)
            }
        })
        .collect();
    let nzcv = Nzcv::from_bits_truncate((seed_pattern(seed, 64) & 0xf) as u32);
    SeededState { x, d, nzcv }
}

fn emit_seed(masm: &mut CodeBuffer, state: &SeededState) {
    // Flags go first; x0 is reseeded below.
    masm.mov_imm(Register::x(0), state.nzcv.to_psr());
    masm.msr_nzcv(Register::x(0));

    for (i, &value) in state.x.iter().enumerate() {
        clobber(masm, reg_bit(i as u8), value);
    }
    for (i, &bits) in state.d.iter().enumerate() {
        clobber_fp(masm, reg_bit(i as u8), f64::from_bits(bits));
    }
}

fn run(args: &Args, target: &TargetDescriptor) -> anyhow::Result<bool> {
    let mut machine = Machine::<Aarch64>::from_config(target)?;
    let metrics = Arc::new(PerformanceMetrics::new());
    machine.add_observer(metrics.clone());

    let features = CpuFeatures::from_target(target);
    info!(
        "Target '{}': features {:?}, VL {} bits",
        target.name, features, target.vector_length_bits
    );

    let state = seeded_state(args.seed, target);
    let mut masm = CodeBuffer::new(features);
    emit_seed(&mut masm, &state);
    machine
        .run(masm.instructions())
        .context("Failed to seed registers")?;

    let base = target.record_address();
    let mut first = RegisterDump::new(base);
    let mut second = RegisterDump::new(base + RECORD_CAPACITY);
    let mut masm = CodeBuffer::new(features);
    first.dump(&mut masm);
    second.dump(&mut masm);
    info!(
        "Capturing twice at {:#x} ({} instructions)",
        base,
        masm.len()
    );
    machine.run(masm.instructions()).context("Capture failed")?;

    first.load(&machine.bus)?;
    second.load(&machine.bus)?;

    let mut ok = equal_registers(&first, &second);
    for (i, &value) in state.x.iter().enumerate() {
        ok &= equal_64_reg(value, &first, Register::x(i as u8));
    }
    for (i, &bits) in state.d.iter().enumerate() {
        ok &= equal_64_vreg(bits, &first, VRegister::d(i as u8));
    }
    ok &= equal_nzcv(state.nzcv.bits(), first.flags_nzcv());

    info!(
        "Executed {} instructions ({} stores)",
        metrics.get_instructions(),
        metrics.get_stores()
    );

    if let Some(path) = &args.snapshot {
        let json = MachineSnapshot::from_dump(&first).to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_pattern_is_deterministic() {
        assert_eq!(seed_pattern(1, 5), seed_pattern(1, 5));
        assert_ne!(seed_pattern(1, 5), seed_pattern(1, 6));
        assert_ne!(seed_pattern(1, 5), seed_pattern(2, 5));
    }

    #[test]
    fn test_poisoned_registers_use_target_values() {
        let target = TargetDescriptor::default();
        let state = seeded_state(7, &target);
        assert_eq!(state.x.len(), 31);
        assert_eq!(state.d.len(), 32);
        assert_eq!(state.x[16], target.poison.general);
        assert_eq!(state.d[31], target.poison.fp_bits);
    }
}
