// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::isa::Instruction;
use crate::SimulationObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct PerformanceMetrics {
    instruction_count: AtomicU64,
    store_count: AtomicU64,
    run_count: AtomicU64,
    start_time: Instant,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            instruction_count: AtomicU64::new(0),
            store_count: AtomicU64::new(0),
            run_count: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        self.instruction_count.store(0, Ordering::SeqCst);
        self.store_count.store(0, Ordering::SeqCst);
        self.run_count.store(0, Ordering::SeqCst);
    }

    pub fn get_instructions(&self) -> u64 {
        self.instruction_count.load(Ordering::SeqCst)
    }

    /// Stores and pushes.
    pub fn get_stores(&self) -> u64 {
        self.store_count.load(Ordering::SeqCst)
    }

    pub fn get_runs(&self) -> u64 {
        self.run_count.load(Ordering::SeqCst)
    }

    pub fn get_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_instructions() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_start(&self) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_step_start(&self, _pc: usize, instr: &Instruction) {
        self.instruction_count.fetch_add(1, Ordering::SeqCst);
        if matches!(instr, Instruction::Str { .. } | Instruction::Push(_)) {
            self.store_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
