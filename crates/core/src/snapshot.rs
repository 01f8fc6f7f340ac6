// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::dump::RegisterDump;
use crate::flags::{CpuFeatures, Nzcv};
use crate::registers::{
    NUMBER_OF_P_REGISTERS, NUMBER_OF_REGISTERS, NUMBER_OF_V_REGISTERS, NUMBER_OF_Z_REGISTERS,
};
use crate::value::QRegisterValue;
use serde::{Deserialize, Serialize};

/// Serializable view of a loaded register dump.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub cpu: CpuSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sve: Option<SveSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CpuSnapshot {
    pub x: Vec<u64>,
    pub sp: u64,
    pub d: Vec<u64>,
    pub q: Vec<QRegisterValue>,
    pub nzcv: Nzcv,
    pub features: CpuFeatures,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SveSnapshot {
    pub vl_bits: u64,
    pub z: Vec<Vec<u8>>,
    pub p: Vec<Vec<u8>>,
}

impl MachineSnapshot {
    pub fn from_dump(dump: &RegisterDump) -> Self {
        let features = dump.cpu_features();
        let cpu = CpuSnapshot {
            x: (0..NUMBER_OF_REGISTERS as u8).map(|i| dump.xreg(i)).collect(),
            sp: dump.sp(),
            d: (0..NUMBER_OF_V_REGISTERS as u8).map(|i| dump.dreg_bits(i)).collect(),
            q: (0..NUMBER_OF_V_REGISTERS as u8).map(|i| dump.qreg(i)).collect(),
            nzcv: dump.flags(),
            features,
        };

        let sve = features.contains(CpuFeatures::SVE).then(|| SveSnapshot {
            vl_bits: dump.vl_bits(),
            z: (0..NUMBER_OF_Z_REGISTERS as u8)
                .map(|i| dump.zreg(i).to_vec())
                .collect(),
            p: (0..NUMBER_OF_P_REGISTERS as u8)
                .map(|i| dump.preg_bits(i).to_vec())
                .collect(),
        });

        Self { cpu, sve }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
