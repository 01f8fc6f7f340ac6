// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;
use regcheck_config::{Feature, TargetDescriptor};
use serde::{Deserialize, Serialize};

/// Bit position of N in the architectural flags register.
pub const NZCV_PSR_SHIFT: u32 = 28;

bitflags! {
    /// Condition flags, as a 4-bit word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Nzcv: u32 {
        const N = 0b1000;
        const Z = 0b0100;
        const C = 0b0010;
        const V = 0b0001;
    }
}

impl Nzcv {
    /// Converts the value read from the flags register. Bits outside 31:28
    /// must be clear.
    pub fn from_psr(psr: u64) -> Self {
        assert_eq!(
            psr & !(0xf << NZCV_PSR_SHIFT),
            0,
            "flags register value {:#x} has bits outside NZCV",
            psr
        );
        Self::from_bits_retain((psr >> NZCV_PSR_SHIFT) as u32)
    }

    pub fn to_psr(self) -> u64 {
        (self.bits() as u64) << NZCV_PSR_SHIFT
    }

    /// Four letters, upper case when set: `NzcV`.
    pub fn letters(self) -> String {
        [
            (Nzcv::N, 'N'),
            (Nzcv::Z, 'Z'),
            (Nzcv::C, 'C'),
            (Nzcv::V, 'V'),
        ]
        .iter()
        .map(|&(flag, c)| {
            if self.contains(flag) {
                c
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
    }
}

bitflags! {
    /// Optional instruction-set features that change which registers exist.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CpuFeatures: u32 {
        const FP = 1 << 0;
        const NEON = 1 << 1;
        const SVE = 1 << 2;
    }
}

impl CpuFeatures {
    pub fn from_target(target: &TargetDescriptor) -> Self {
        let mut features = CpuFeatures::empty();
        for feature in &target.features {
            features |= match feature {
                Feature::Fp => CpuFeatures::FP,
                Feature::Neon => CpuFeatures::NEON,
                Feature::Sve => CpuFeatures::SVE,
            };
        }
        features
    }
}
