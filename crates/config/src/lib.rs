// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_SCHEMA_VERSION: &str = "1.0";
pub const MIN_VECTOR_LENGTH_BITS: u32 = 128;
pub const MAX_VECTOR_LENGTH_BITS: u32 = 2048;
/// Size of a capture record without a vector arena.
pub const MIN_RECORD_BYTES: u64 = 0x570;

/// Default general-register poison, easy to spot in a hex dump.
pub const DEFAULT_GENERAL_POISON: u64 = 0xfedc_ba98_7654_3210;
/// Signalling NaN both as a double and in its low word as a float.
pub const DEFAULT_FP_POISON_BITS: u64 = 0x7ff0_0000_7f80_0001;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("vector_length_bits must be a multiple of 128 in 128..=2048, got {0}")]
    InvalidVectorLength(u32),
    #[error("RAM region '{0}' has zero size")]
    EmptyRam(String),
    #[error("Record at {addr:#x} (+{size:#x}) does not fit in RAM {base:#x}..{end:#x}")]
    RecordOutOfRange { addr: u64, size: u64, base: u64, end: u64 },
    #[error("Record address must be non-zero and 16-byte aligned, got {0:#x}")]
    BadRecordAddress(u64),
    #[error("RAM at {base:#x} (+{size:#x}) runs past the end of the address space")]
    RamOutOfRange { base: u64, size: u64 },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "64 KiB"
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Fp,
    Neon,
    Sve,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PoisonValues {
    #[serde(default = "default_general_poison")]
    pub general: u64,
    #[serde(default = "default_fp_poison_bits")]
    pub fp_bits: u64,
}

impl Default for PoisonValues {
    fn default() -> Self {
        Self {
            general: DEFAULT_GENERAL_POISON,
            fp_bits: DEFAULT_FP_POISON_BITS,
        }
    }
}

fn default_general_poison() -> u64 {
    DEFAULT_GENERAL_POISON
}

fn default_fp_poison_bits() -> u64 {
    DEFAULT_FP_POISON_BITS
}

fn default_features() -> Vec<Feature> {
    vec![Feature::Fp, Feature::Neon]
}

fn default_vector_length_bits() -> u32 {
    MIN_VECTOR_LENGTH_BITS
}

/// Describes the simulated target a capture runs on.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TargetDescriptor {
    pub schema_version: String,
    pub name: String,
    #[serde(default = "default_features")]
    pub features: Vec<Feature>,
    #[serde(default = "default_vector_length_bits")]
    pub vector_length_bits: u32,
    pub ram: MemoryRange,
    #[serde(default)]
    pub record_address: Option<u64>,
    #[serde(default)]
    pub poison: PoisonValues,
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        Self {
            schema_version: SUPPORTED_SCHEMA_VERSION.to_string(),
            name: "default".to_string(),
            features: default_features(),
            vector_length_bits: default_vector_length_bits(),
            ram: MemoryRange {
                base: 0x2000_0000,
                size: "64 KiB".to_string(),
            },
            record_address: None,
            poison: PoisonValues::default(),
        }
    }
}

impl TargetDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open target descriptor at {:?}", path.as_ref()))?;
        let target: Self =
            serde_yaml::from_reader(f).context("Failed to parse Target Descriptor YAML")?;
        target.validate()?;
        Ok(target)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let target: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Target Descriptor YAML")?;
        target.validate()?;
        Ok(target)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema(self.schema_version.clone()).into());
        }

        let vl = self.vector_length_bits;
        if !(MIN_VECTOR_LENGTH_BITS..=MAX_VECTOR_LENGTH_BITS).contains(&vl) || vl % 128 != 0 {
            return Err(ConfigError::InvalidVectorLength(vl).into());
        }

        if self.ram_size()? == 0 {
            return Err(ConfigError::EmptyRam(self.ram.size.clone()).into());
        }
        self.ram_end()?;

        if let Some(addr) = self.record_address {
            if addr == 0 || addr % 16 != 0 {
                return Err(ConfigError::BadRecordAddress(addr).into());
            }
        }

        self.check_record_fits(MIN_RECORD_BYTES)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn ram_size(&self) -> Result<u64> {
        parse_size(&self.ram.size)
            .with_context(|| format!("Invalid RAM size '{}'", self.ram.size))
    }

    /// Where the capture record lives; defaults to the bottom of RAM.
    pub fn record_address(&self) -> u64 {
        self.record_address.unwrap_or(self.ram.base)
    }

    /// One past the last RAM address.
    pub fn ram_end(&self) -> Result<u64> {
        let size = self.ram_size()?;
        self.ram
            .base
            .checked_add(size)
            .ok_or_else(|| ConfigError::RamOutOfRange { base: self.ram.base, size }.into())
    }

    /// Checks that a record of `size` bytes fits at `record_address()`.
    pub fn check_record_fits(&self, size: u64) -> Result<()> {
        let base = self.ram.base;
        let end = self.ram_end()?;
        let addr = self.record_address();
        let fits = addr
            .checked_add(size)
            .map_or(false, |record_end| addr >= base && record_end <= end);
        if !fits {
            return Err(ConfigError::RecordOutOfRange {
                addr,
                size,
                base,
                end,
            }
            .into());
        }
        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
