// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod alloc;
pub mod bus;
pub mod clobber;
pub mod compare;
pub mod cpu;
pub mod dump;
pub mod flags;
pub mod isa;
pub mod masm;
pub mod memory;
pub mod metrics;
pub mod registers;
pub mod snapshot;
pub mod value;

use isa::Instruction;
use std::sync::Arc;


#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Undefined instruction `{0}`")]
    UndefinedInstruction(String),
    #[error("Stack pointer {0:#x} is not 16-byte aligned")]
    StackAlignment(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_step_start(&self, _pc: usize, _instr: &Instruction) {}
    fn on_step_end(&self) {}
}

/// Trait representing a CPU architecture
pub trait Cpu {
    fn reset(&mut self);
    fn execute(&mut self, instr: &Instruction, bus: &mut dyn Bus) -> SimResult<()>;
    fn set_sp(&mut self, val: u64);
    fn get_sp(&self) -> u64;
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u8(&self, addr: u64) -> SimResult<u8>;
    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()>;

    fn read_u16(&self, addr: u64) -> SimResult<u16> {
        let b0 = self.read_u8(addr)? as u16;
        let b1 = self.read_u8(addr + 1)? as u16;
        // Little Endian
        Ok(b0 | (b1 << 8))
    }

    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let lo = self.read_u16(addr)? as u32;
        let hi = self.read_u16(addr + 2)? as u32;
        Ok(lo | (hi << 16))
    }

    fn read_u64(&self, addr: u64) -> SimResult<u64> {
        let lo = self.read_u32(addr)? as u64;
        let hi = self.read_u32(addr + 4)? as u64;
        Ok(lo | (hi << 32))
    }

    fn read_bytes(&self, addr: u64, len: usize) -> SimResult<Vec<u8>> {
        (0..len as u64).map(|i| self.read_u8(addr + i)).collect()
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    fn write_u64(&mut self, addr: u64, value: u64) -> SimResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> SimResult<()> {
        for (i, byte) in data.iter().enumerate() {
            self.write_u8(addr + i as u64, *byte)?;
        }
        Ok(())
    }
}

pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
}

impl<C: Cpu + Default> Machine<C> {
    pub fn new() -> Self {
        Self::with_bus(bus::SystemBus::new())
    }

    /// Construct a machine around an existing bus, with the stack pointer at
    /// the top of RAM.
    pub fn with_bus(bus: bus::SystemBus) -> Self {
        let mut cpu = C::default();
        cpu.reset();
        cpu.set_sp(bus.stack_top());
        Self {
            cpu,
            bus,
            observers: Vec::new(),
        }
    }
}

impl<C: Cpu + Default> Default for Machine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cpu> Machine<C> {
    pub fn add_observer(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    /// Executes a straight-line instruction sequence to completion.
    pub fn run(&mut self, program: &[Instruction]) -> SimResult<()> {
        for observer in &self.observers {
            observer.on_simulation_start();
        }

        let mut result = Ok(());
        for (pc, instr) in program.iter().enumerate() {
            for observer in &self.observers {
                observer.on_step_start(pc, instr);
            }
            if let Err(e) = self.cpu.execute(instr, &mut self.bus) {
                tracing::error!("Execution stopped at #{} `{}`: {}", pc, instr, e);
                result = Err(e);
                break;
            }
            for observer in &self.observers {
                observer.on_step_end();
            }
        }

        for observer in &self.observers {
            observer.on_simulation_stop();
        }
        result
    }
}
