// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{Csr, Region, Serial, Soc};
use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

pub const ADC_SRAM_BASE: u32 = 0x3000_0000;
pub const MAIN_RAM_BASE: u32 = 0x4000_0000;

/// Serial port with a scripted receive queue and captured output.
#[derive(Debug, Default)]
pub struct MockSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl MockSerial {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            rx: input.iter().copied().collect(),
            tx: Vec::new(),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    pub fn take_output(&mut self) -> String {
        let out = self.output();
        self.tx.clear();
        out
    }
}

impl Serial for MockSerial {
    fn read_nonblock(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.tx.push(byte);
    }
}

/// Register file that records every write and reports ready after a
/// configurable number of polls.
#[derive(Debug)]
pub struct MockSoc {
    pub writes: Vec<(Csr, u32)>,
    pub adc_sram: Vec<u32>,
    pub main_ram: Vec<u32>,
    pub main_ram_reads: usize,
    /// `None` keeps ready low forever.
    pub ready_after: Option<u32>,
    pub ready_polls: u32,
    pub cache_flushes: u32,
    pub interrupts: bool,
    pub irq_mask: Option<u32>,
    pub irq_enabled: bool,
}

impl MockSoc {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            adc_sram: (0..64u32).map(|i| i * 3 + 7).collect(),
            main_ram: vec![0; 64],
            main_ram_reads: 0,
            ready_after: Some(1),
            ready_polls: 0,
            cache_flushes: 0,
            interrupts: false,
            irq_mask: None,
            irq_enabled: false,
        }
    }

    pub fn last_write(&self, csr: Csr) -> Option<u32> {
        self.writes
            .iter()
            .rev()
            .find(|(c, _)| *c == csr)
            .map(|(_, v)| *v)
    }
}

impl Soc for MockSoc {
    type Error = String;

    fn read_csr(&mut self, csr: Csr) -> Result<u32, Self::Error> {
        match csr {
            Csr::DmaReady => {
                self.ready_polls += 1;
                match self.ready_after {
                    Some(n) if self.ready_polls >= n => Ok(1),
                    _ => Ok(0),
                }
            }
            other => Ok(self.last_write(other).unwrap_or(0)),
        }
    }

    fn write_csr(&mut self, csr: Csr, value: u32) -> Result<(), Self::Error> {
        self.writes.push((csr, value));
        Ok(())
    }

    fn region_base(&self, region: Region) -> u32 {
        match region {
            Region::AdcSram => ADC_SRAM_BASE,
            Region::MainRam => MAIN_RAM_BASE,
        }
    }

    fn read_word(&mut self, region: Region, index: usize) -> Result<u32, Self::Error> {
        let words = match region {
            Region::AdcSram => &self.adc_sram,
            Region::MainRam => {
                self.main_ram_reads += 1;
                &self.main_ram
            }
        };
        words
            .get(index)
            .copied()
            .ok_or_else(|| format!("{} index {} out of range", region.name(), index))
    }

    fn flush_caches(&mut self) {
        self.cache_flushes += 1;
    }

    fn has_interrupts(&self) -> bool {
        self.interrupts
    }

    fn irq_set_mask(&mut self, mask: u32) {
        self.irq_mask = Some(mask);
    }

    fn irq_set_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }
}
