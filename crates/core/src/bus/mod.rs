// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::peripherals::{ctrl::Ctrl, dma::DmaBurst, uart::Uart};
use crate::{Bus, BusTransfer, Peripheral, SimResult, SimulationError};
use socdiag_config::{SocDescriptor, CSR_BLOCK_SIZE};
use socdiag_console::hal::Region;

const DEFAULT_MAIN_RAM_SIZE: usize = 32 * 1024;
const DEFAULT_ADC_SRAM_SIZE: usize = 128 * 1024;

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: Box<dyn Peripheral>,
}

#[derive(Debug)]
pub struct SystemBus {
    pub main_ram: LinearMemory,
    pub adc_sram: LinearMemory,
    pub peripherals: Vec<PeripheralEntry>,
    /// DMA writes that hit no memory region.
    pub dropped_transfers: u64,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// Bus laid out like the default ECP5 SoC.
    pub fn new() -> Self {
        Self::with_layout(
            &SocDescriptor::default(),
            DEFAULT_MAIN_RAM_SIZE,
            DEFAULT_ADC_SRAM_SIZE,
        )
    }

    pub fn from_config(desc: &SocDescriptor) -> anyhow::Result<Self> {
        desc.validate()?;
        let main_ram_size = desc.main_ram.size_bytes()? as usize;
        let adc_sram_size = desc.adc_sram.size_bytes()? as usize;
        Ok(Self::with_layout(desc, main_ram_size, adc_sram_size))
    }

    fn with_layout(desc: &SocDescriptor, main_ram_size: usize, adc_sram_size: usize) -> Self {
        let csr = |offset: u64| desc.csr_base + offset;
        let peripherals = vec![
            PeripheralEntry {
                name: "ctrl".to_string(),
                base: csr(desc.csr_blocks.ctrl),
                size: CSR_BLOCK_SIZE,
                dev: Box::new(Ctrl::new()),
            },
            PeripheralEntry {
                name: "dma_burst".to_string(),
                base: csr(desc.csr_blocks.dma_burst),
                size: CSR_BLOCK_SIZE,
                dev: Box::new(DmaBurst::new(desc.dma.clone())),
            },
            PeripheralEntry {
                name: "uart".to_string(),
                base: csr(desc.csr_blocks.uart),
                size: CSR_BLOCK_SIZE,
                dev: Box::new(Uart::new()),
            },
        ];

        Self {
            main_ram: LinearMemory::new("main_ram", main_ram_size, desc.main_ram.base),
            adc_sram: LinearMemory::new("adc_sram", adc_sram_size, desc.adc_sram.base),
            peripherals,
            dropped_transfers: 0,
        }
    }

    pub fn region(&self, region: Region) -> &LinearMemory {
        match region {
            Region::AdcSram => &self.adc_sram,
            Region::MainRam => &self.main_ram,
        }
    }

    pub fn region_mut(&mut self, region: Region) -> &mut LinearMemory {
        match region {
            Region::AdcSram => &mut self.adc_sram,
            Region::MainRam => &mut self.main_ram,
        }
    }

    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    pub fn reset_peripherals(&mut self) {
        for p in &mut self.peripherals {
            p.dev.reset();
        }
    }

    fn find_peripheral(&self, addr: u64) -> Option<(usize, u64)> {
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr < p.base + p.size)
            .map(|idx| (idx, addr - self.peripherals[idx].base))
    }

    fn memory_mut(&mut self, addr: u64) -> Option<&mut LinearMemory> {
        if self.main_ram.contains(addr, 4) {
            Some(&mut self.main_ram)
        } else if self.adc_sram.contains(addr, 4) {
            Some(&mut self.adc_sram)
        } else {
            None
        }
    }

    fn apply_transfer(&mut self, transfer: BusTransfer) {
        match self.memory_mut(transfer.addr) {
            Some(mem) => {
                mem.write_u32(transfer.addr, transfer.value);
            }
            None => {
                self.dropped_transfers += 1;
                tracing::warn!(
                    "Bus: DMA write to unmapped address {:#x} dropped",
                    transfer.addr
                );
            }
        }
    }
}

impl Bus for SystemBus {
    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        if addr % 4 != 0 {
            return Err(SimulationError::UnalignedAccess(addr));
        }
        if let Some(word) = self.main_ram.read_u32(addr) {
            return Ok(word);
        }
        if let Some(word) = self.adc_sram.read_u32(addr) {
            return Ok(word);
        }
        if let Some((idx, offset)) = self.find_peripheral(addr) {
            return self.peripherals[idx].dev.read(offset);
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        if addr % 4 != 0 {
            return Err(SimulationError::UnalignedAccess(addr));
        }
        if let Some(mem) = self.memory_mut(addr) {
            mem.write_u32(addr, value);
            return Ok(());
        }
        if let Some((idx, offset)) = self.find_peripheral(addr) {
            return self.peripherals[idx].dev.write(offset, value);
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn tick_peripherals(&mut self) -> usize {
        let transfers: Vec<BusTransfer> = self
            .peripherals
            .iter_mut()
            .filter_map(|p| p.dev.tick())
            .collect();
        let count = transfers.len();
        for transfer in transfers {
            self.apply_transfer(transfer);
        }
        count
    }
}
