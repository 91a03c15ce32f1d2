// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{BusTransfer, Peripheral, SimResult};
use serde::Serialize;
use socdiag_config::{DmaConfig, Endianness};
use socdiag_console::hal::DmaStart;
use std::any::Any;

pub const START: u64 = 0x00;
pub const READY: u64 = 0x04;
pub const BURST_SIZE: u64 = 0x08;
pub const BASE: u64 = 0x0C;
pub const OFFSET: u64 = 0x10;

/// The pass counter is a 5-bit signal in the gateware.
const PASS_COUNT_MASK: u8 = 0x1F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DmaState {
    WaitForTrigger,
    WriteData,
}

/// Wishbone DMA burst writer.
///
/// In `WaitForTrigger` the `ready` status is high. A start pulse moves it to
/// `WriteData`, where it writes `burst_size` words to
/// `base + offset + 4 * n`. Every word of one burst carries the same value:
/// the pass counter, bumped once when the burst completes.
#[derive(Debug, Serialize)]
pub struct DmaBurst {
    state: DmaState,
    start_pulse: bool,
    burst_size: u16,
    base: u32,
    offset: u32,
    words_count: u16,
    pass_count: u8,
    cycle: u32,
    bursts_completed: u32,
    #[serde(skip)]
    config: DmaConfig,
}

impl Default for DmaBurst {
    fn default() -> Self {
        Self::new(DmaConfig::default())
    }
}

impl DmaBurst {
    pub fn new(config: DmaConfig) -> Self {
        Self {
            state: DmaState::WaitForTrigger,
            start_pulse: false,
            burst_size: 0,
            base: 0,
            offset: 0,
            words_count: 0,
            pass_count: 0,
            cycle: 0,
            bursts_completed: 0,
            config,
        }
    }

    pub fn state(&self) -> DmaState {
        self.state
    }

    pub fn pass_count(&self) -> u8 {
        self.pass_count
    }

    pub fn bursts_completed(&self) -> u32 {
        self.bursts_completed
    }

    /// Value a word of the current burst reads back as from the CPU side.
    pub fn bus_value(&self, pass_count: u8) -> u32 {
        let data = u32::from(pass_count);
        match self.config.endianness {
            Endianness::Big => data.swap_bytes(),
            Endianness::Little => data,
        }
    }

    fn word_address(&self) -> u64 {
        // The writer is word addressed.
        let word = (self.base >> 2)
            .wrapping_add(self.offset >> 2)
            .wrapping_add(u32::from(self.words_count));
        u64::from(word) << 2
    }
}

impl Peripheral for DmaBurst {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            READY => Ok(u32::from(self.state == DmaState::WaitForTrigger)),
            BURST_SIZE => Ok(u32::from(self.burst_size)),
            BASE => Ok(self.base),
            OFFSET => Ok(self.offset),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            START => {
                if DmaStart::from_bits_truncate(value).contains(DmaStart::START_BURST) {
                    self.start_pulse = true;
                }
            }
            BURST_SIZE => self.burst_size = value as u16,
            BASE => self.base = value,
            OFFSET => self.offset = value,
            _ => {}
        }
        tracing::debug!("DMA: write {:#x} <- {:#x}", offset, value);
        Ok(())
    }

    fn tick(&mut self) -> Option<BusTransfer> {
        // The start field is a one-cycle pulse; it is lost unless the FSM is
        // waiting for it.
        let start = std::mem::take(&mut self.start_pulse);
        match self.state {
            DmaState::WaitForTrigger => {
                self.words_count = 0;
                if start {
                    self.state = DmaState::WriteData;
                    self.cycle = 0;
                    tracing::debug!(
                        "DMA: burst of {} words to {:#x}",
                        self.burst_size,
                        self.word_address()
                    );
                }
                None
            }
            DmaState::WriteData => {
                self.cycle += 1;
                if self.cycle < self.config.cycles_per_word {
                    return None;
                }
                self.cycle = 0;

                let transfer = BusTransfer {
                    addr: self.word_address(),
                    value: self.bus_value(self.pass_count),
                };
                // A zero burst size never matches and the writer runs on.
                let last = i32::from(self.words_count) == i32::from(self.burst_size) - 1;
                self.words_count = self.words_count.wrapping_add(1);
                if last {
                    self.state = DmaState::WaitForTrigger;
                    self.pass_count = (self.pass_count + 1) & PASS_COUNT_MASK;
                    self.bursts_completed += 1;
                    tracing::debug!("DMA: burst complete, pass {}", self.pass_count);
                }
                Some(transfer)
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(config: DmaConfig, burst_size: u32) -> DmaBurst {
        let mut dma = DmaBurst::new(config);
        dma.write(BURST_SIZE, burst_size).unwrap();
        dma.write(BASE, 0x3000_0000).unwrap();
        dma.write(OFFSET, 0).unwrap();
        dma.write(START, 1).unwrap();
        assert!(dma.tick().is_none());
        dma
    }

    #[test]
    fn test_ready_while_idle() {
        let dma = DmaBurst::default();
        assert_eq!(dma.read(READY).unwrap(), 1);
        assert_eq!(dma.read(START).unwrap(), 0);
    }

    #[test]
    fn test_burst_writes_consecutive_words() {
        let mut dma = started(DmaConfig::default(), 4);
        assert_eq!(dma.read(READY).unwrap(), 0);

        let transfers: Vec<BusTransfer> = (0..4).filter_map(|_| dma.tick()).collect();
        let addrs: Vec<u64> = transfers.iter().map(|t| t.addr).collect();
        assert_eq!(addrs, vec![0x3000_0000, 0x3000_0004, 0x3000_0008, 0x3000_000C]);
        assert!(transfers.iter().all(|t| t.value == 0));

        assert_eq!(dma.read(READY).unwrap(), 1);
        assert_eq!(dma.pass_count(), 1);
        assert!(dma.tick().is_none());
    }

    #[test]
    fn test_second_burst_carries_next_pass_big_endian() {
        let mut dma = started(DmaConfig::default(), 2);
        while dma.tick().is_some() {}
        dma.write(START, 1).unwrap();
        assert!(dma.tick().is_none());
        let t = dma.tick().unwrap();
        assert_eq!(t.value, 0x0100_0000);
    }

    #[test]
    fn test_little_endian_and_offset() {
        let config = DmaConfig {
            endianness: Endianness::Little,
            cycles_per_word: 1,
        };
        let mut dma = started(config, 1);
        dma.pass_count = 5;
        dma.offset = 0x10;
        let t = dma.tick().unwrap();
        assert_eq!(t.addr, 0x3000_0010);
        assert_eq!(t.value, 5);
    }

    #[test]
    fn test_cycles_per_word_slows_writer() {
        let config = DmaConfig {
            endianness: Endianness::Big,
            cycles_per_word: 3,
        };
        let mut dma = started(config, 2);
        let pattern: Vec<bool> = (0..6).map(|_| dma.tick().is_some()).collect();
        assert_eq!(pattern, vec![false, false, true, false, false, true]);
        assert_eq!(dma.state(), DmaState::WaitForTrigger);
    }

    #[test]
    fn test_pass_counter_wraps_at_five_bits() {
        let mut dma = DmaBurst::default();
        dma.pass_count = 31;
        dma.write(BURST_SIZE, 1).unwrap();
        dma.write(START, 1).unwrap();
        dma.tick();
        dma.tick().unwrap();
        assert_eq!(dma.pass_count(), 0);
    }

    #[test]
    fn test_start_ignored_while_busy() {
        let mut dma = started(DmaConfig::default(), 3);
        dma.write(START, 1).unwrap();
        for _ in 0..3 {
            assert!(dma.tick().is_some());
        }
        assert!(dma.tick().is_none());
        assert_eq!(dma.state(), DmaState::WaitForTrigger);
        assert_eq!(dma.bursts_completed(), 1);
    }

    #[test]
    fn test_zero_burst_size_never_completes() {
        let mut dma = started(DmaConfig::default(), 0);
        for _ in 0..1000 {
            assert!(dma.tick().is_some());
        }
        assert_eq!(dma.read(READY).unwrap(), 0);
    }
}
