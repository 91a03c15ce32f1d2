// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Words of `adc_sram` captured in a snapshot.
pub const SNAPSHOT_WORDS: usize = 64;

#[derive(Serialize, Deserialize, Debug)]
pub struct SocSnapshot {
    pub name: String,
    pub cycles: u64,
    pub cache_flushes: u64,
    pub irq_mask: u32,
    pub irq_enabled: bool,
    pub dropped_transfers: u64,
    pub peripherals: HashMap<String, serde_json::Value>,
    pub adc_sram_head: Vec<u32>,
}
