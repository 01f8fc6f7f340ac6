// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::{SimResult, SimulationError};
use regcheck_config::TargetDescriptor;

pub const DEFAULT_RAM_BASE: u64 = 0x2000_0000;
pub const DEFAULT_RAM_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct SystemBus {
    pub ram: LinearMemory,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    pub fn new() -> Self {
        Self::with_ram(DEFAULT_RAM_BASE, DEFAULT_RAM_SIZE)
    }

    pub fn with_ram(base: u64, size: usize) -> Self {
        Self {
            ram: LinearMemory::new(size, base),
        }
    }

    pub fn from_config(target: &TargetDescriptor) -> anyhow::Result<Self> {
        let size = target.ram_size()?;
        target.ram_end()?;
        tracing::debug!(
            "Mapping RAM for '{}' at {:#x} ({} bytes)",
            target.name,
            target.ram.base,
            size
        );
        Ok(Self::with_ram(target.ram.base, size as usize))
    }

    /// Highest 16-byte aligned address usable as an initial stack pointer.
    pub fn stack_top(&self) -> u64 {
        self.ram.end_addr() & !15
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        self.ram
            .read_u8(addr)
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        if self.ram.write_u8(addr, value) {
            return Ok(());
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn read_bytes(&self, addr: u64, len: usize) -> SimResult<Vec<u8>> {
        self.ram
            .slice(addr, len)
            .map(|s| s.to_vec())
            .ok_or(SimulationError::MemoryViolation(addr))
    }
}
