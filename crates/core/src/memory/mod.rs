// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// A simple flat memory storage
#[derive(Debug)]
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl LinearMemory {
    /// Panics if the region would run past the end of the address space.
    pub fn new(size: usize, base_addr: u64) -> Self {
        assert!(
            base_addr.checked_add(size as u64).is_some(),
            "memory at {:#x} (+{:#x}) overflows the address space",
            base_addr,
            size
        );
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base_addr && addr < self.end_addr()
    }

    /// One past the last valid address.
    pub fn end_addr(&self) -> u64 {
        self.base_addr + self.data.len() as u64
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        if self.contains(addr) {
            Some(self.data[(addr - self.base_addr) as usize])
        } else {
            None
        }
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        if self.contains(addr) {
            self.data[(addr - self.base_addr) as usize] = value;
            true
        } else {
            false
        }
    }

    pub fn slice(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let end = addr.checked_add(len as u64)?;
        if addr >= self.base_addr && end <= self.end_addr() {
            let offset = (addr - self.base_addr) as usize;
            Some(&self.data[offset..offset + len])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let mut mem = LinearMemory::new(16, 0x100);
        assert!(mem.write_u8(0x10f, 0xaa));
        assert!(!mem.write_u8(0x110, 0xaa));
        assert_eq!(mem.read_u8(0x10f), Some(0xaa));
        assert_eq!(mem.read_u8(0xff), None);
        assert_eq!(mem.slice(0x10e, 2), Some(&[0u8, 0xaa][..]));
        assert_eq!(mem.slice(0x10f, 2), None);
    }

    #[test]
    fn test_region_ending_at_address_space_top() {
        let mut mem = LinearMemory::new(15, u64::MAX - 15);
        assert_eq!(mem.end_addr(), u64::MAX);
        assert!(mem.write_u8(u64::MAX - 1, 0x5a));
        assert_eq!(mem.read_u8(u64::MAX - 1), Some(0x5a));
        assert_eq!(mem.slice(u64::MAX - 15, 15).map(|s| s.len()), Some(15));
        assert_eq!(mem.slice(u64::MAX - 1, 4), None);
    }

    #[test]
    #[should_panic(expected = "overflows the address space")]
    fn test_region_past_address_space_top() {
        LinearMemory::new(32, u64::MAX - 15);
    }
}
