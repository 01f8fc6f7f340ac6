// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw IEEE 754 binary16 encoding. Only used for bit comparison and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Float16(u16);

impl Float16 {
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }

    pub fn is_nan(self) -> bool {
        (self.0 & 0x7c00) == 0x7c00 && (self.0 & 0x03ff) != 0
    }

    /// +0 or -0.
    pub fn is_zero(self) -> bool {
        (self.0 & 0x7fff) == 0
    }

    /// Widens to f32 for printing. NaN payloads are carried over.
    pub fn to_f32(self) -> f32 {
        let sign = ((self.0 as u32) & 0x8000) << 16;
        let exp = ((self.0 >> 10) & 0x1f) as u32;
        let mant = (self.0 & 0x03ff) as u32;

        let bits = match (exp, mant) {
            (0, 0) => sign,
            (0, _) => {
                // Subnormal: normalise into the wider exponent range.
                let mut e: i32 = 127 - 15 + 1;
                let mut m = mant;
                while m & 0x0400 == 0 {
                    m <<= 1;
                    e -= 1;
                }
                sign | ((e as u32) << 23) | ((m & 0x03ff) << 13)
            }
            (0x1f, _) => sign | 0x7f80_0000 | (mant << 13),
            _ => sign | ((exp + 127 - 15) << 23) | (mant << 13),
        };
        f32::from_bits(bits)
    }
}

impl fmt::LowerHex for Float16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A 128-bit vector register value as two 64-bit lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QRegisterValue {
    lanes: [u64; 2],
}

impl QRegisterValue {
    pub fn new(hi: u64, lo: u64) -> Self {
        Self { lanes: [lo, hi] }
    }

    pub fn from_u128(value: u128) -> Self {
        Self::new((value >> 64) as u64, value as u64)
    }

    pub fn to_u128(self) -> u128 {
        ((self.lanes[1] as u128) << 64) | self.lanes[0] as u128
    }

    pub fn lane(&self, index: usize) -> u64 {
        self.lanes[index]
    }

    pub fn set_lane(&mut self, index: usize, value: u64) {
        self.lanes[index] = value;
    }

    /// Both lanes must match.
    pub fn equals(&self, other: &QRegisterValue) -> bool {
        self.lanes[0] == other.lanes[0] && self.lanes[1] == other.lanes[1]
    }
}
