// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;
use core::fmt;

/// Control/status registers used by the console.
///
/// Addresses are not part of this crate; they come from the generated SoC
/// map (the firmware's constant table or the simulator's YAML descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Csr {
    CtrlReset,
    DmaStart,
    DmaReady,
    DmaBurstSize,
    DmaBase,
    DmaOffset,
}

impl Csr {
    /// Name as emitted by the LiteX CSR generator.
    pub fn name(self) -> &'static str {
        match self {
            Csr::CtrlReset => "ctrl_reset",
            Csr::DmaStart => "dma_burst_start",
            Csr::DmaReady => "dma_burst_ready",
            Csr::DmaBurstSize => "dma_burst_burst_size",
            Csr::DmaBase => "dma_burst_base",
            Csr::DmaOffset => "dma_burst_offset",
        }
    }
}

/// Raw memory regions read by the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// SRAM the DMA burst engine writes into.
    AdcSram,
    /// Main RAM, only touched by the workaround scan.
    MainRam,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Region::AdcSram => "adc_sram",
            Region::MainRam => "main_ram",
        }
    }
}

bitflags! {
    /// Fields of `dma_burst_start`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaStart: u32 {
        const START_BURST = 1 << 0;
    }

    /// Fields of `ctrl_reset`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlReset: u32 {
        const SOC_RST = 1 << 0;
        const CPU_RST = 1 << 1;
    }
}

/// Register and memory access to the SoC under test.
pub trait Soc {
    type Error: fmt::Debug + fmt::Display;

    fn read_csr(&mut self, csr: Csr) -> Result<u32, Self::Error>;
    fn write_csr(&mut self, csr: Csr, value: u32) -> Result<(), Self::Error>;

    /// Bus address of the first byte of `region`.
    fn region_base(&self, region: Region) -> u32;

    /// Load the 32-bit word at `region + 4 * index`.
    fn read_word(&mut self, region: Region, index: usize) -> Result<u32, Self::Error>;

    /// Flush instruction and data caches.
    fn flush_caches(&mut self) {}

    fn has_interrupts(&self) -> bool {
        false
    }

    fn irq_set_mask(&mut self, _mask: u32) {}

    fn irq_set_enabled(&mut self, _enabled: bool) {}
}

/// Byte-oriented serial transport.
pub trait Serial {
    /// Take one received byte if one is waiting. Never blocks.
    fn read_nonblock(&mut self) -> Option<u8>;

    fn write_byte(&mut self, byte: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }
}

/// `fmt::Write` adapter over a [`Serial`] transmitter.
pub struct Tx<'a, S: ?Sized>(pub &'a mut S);

impl<S: Serial + ?Sized> fmt::Write for Tx<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl<S: Soc + ?Sized> Soc for &mut S {
    type Error = S::Error;

    fn read_csr(&mut self, csr: Csr) -> Result<u32, Self::Error> {
        (**self).read_csr(csr)
    }

    fn write_csr(&mut self, csr: Csr, value: u32) -> Result<(), Self::Error> {
        (**self).write_csr(csr, value)
    }

    fn region_base(&self, region: Region) -> u32 {
        (**self).region_base(region)
    }

    fn read_word(&mut self, region: Region, index: usize) -> Result<u32, Self::Error> {
        (**self).read_word(region, index)
    }

    fn flush_caches(&mut self) {
        (**self).flush_caches()
    }

    fn has_interrupts(&self) -> bool {
        (**self).has_interrupts()
    }

    fn irq_set_mask(&mut self, mask: u32) {
        (**self).irq_set_mask(mask)
    }

    fn irq_set_enabled(&mut self, enabled: bool) {
        (**self).irq_set_enabled(enabled)
    }
}

impl<S: Serial + ?Sized> Serial for &mut S {
    fn read_nonblock(&mut self) -> Option<u8> {
        (**self).read_nonblock()
    }

    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        (**self).write_bytes(bytes)
    }
}
