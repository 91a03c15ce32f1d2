// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod session;
pub mod snapshot;

use socdiag_config::SocDescriptor;
use socdiag_console::hal::{Csr, Region, Serial, Soc};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use peripherals::{ctrl, ctrl::Ctrl, dma, dma::DmaBurst, uart, uart::Uart};

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unaligned word access at {0:#x}")]
    UnalignedAccess(u64),
    #[error("Peripheral '{0}' is not present on the bus")]
    MissingPeripheral(&'static str),
    #[error("Serial formatting failed")]
    SerialFormat,
    #[error("DMA ready not asserted after {0} polls")]
    ReadyTimeout(u32),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// A word written by a bus master (the DMA engine) during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTransfer {
    pub addr: u64,
    pub value: u32,
}

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug {
    fn on_csr_read(&self, _csr: Csr, _value: u32) {}
    fn on_csr_write(&self, _csr: Csr, _value: u32) {}
    fn on_memory_read(&self, _region: Region, _addr: u64) {}
    fn on_tick(&self, _transfers: usize) {}
}

/// Trait representing a memory-mapped peripheral with 32-bit registers
pub trait Peripheral: std::fmt::Debug {
    fn read(&self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    /// Advance one clock. Bus masters return the word they write this cycle.
    fn tick(&mut self) -> Option<BusTransfer> {
        None
    }
    fn reset(&mut self) {}
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u32(&self, addr: u64) -> SimResult<u32>;
    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()>;
    /// Returns the number of master transfers applied.
    fn tick_peripherals(&mut self) -> usize;
}

/// Simulated SoC: the bus plus the CPU-side state the console can touch.
#[derive(Debug)]
pub struct Machine {
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    descriptor: SocDescriptor,
    pub cycles: u64,
    pub cache_flushes: u64,
    pub irq_mask: u32,
    pub irq_enabled: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_bus(bus::SystemBus::new(), SocDescriptor::default())
    }

    pub fn from_config(desc: &SocDescriptor) -> anyhow::Result<Self> {
        let bus = bus::SystemBus::from_config(desc)?;
        Ok(Self::with_bus(bus, desc.clone()))
    }

    fn with_bus(bus: bus::SystemBus, descriptor: SocDescriptor) -> Self {
        Self {
            bus,
            observers: Vec::new(),
            descriptor,
            cycles: 0,
            cache_flushes: 0,
            irq_mask: 0,
            irq_enabled: false,
        }
    }

    pub fn descriptor(&self) -> &SocDescriptor {
        &self.descriptor
    }

    pub fn csr_address(&self, csr: Csr) -> u64 {
        let blocks = &self.descriptor.csr_blocks;
        let (block, reg) = match csr {
            Csr::CtrlReset => (blocks.ctrl, ctrl::RESET),
            Csr::DmaStart => (blocks.dma_burst, dma::START),
            Csr::DmaReady => (blocks.dma_burst, dma::READY),
            Csr::DmaBurstSize => (blocks.dma_burst, dma::BURST_SIZE),
            Csr::DmaBase => (blocks.dma_burst, dma::BASE),
            Csr::DmaOffset => (blocks.dma_burst, dma::OFFSET),
        };
        self.descriptor.csr_base + block + reg
    }

    pub fn uart_base(&self) -> u64 {
        self.descriptor.csr_base + self.descriptor.csr_blocks.uart
    }

    /// Advance peripheral time by `n` clock ticks.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            let transfers = self.bus.tick_peripherals();
            self.cycles += 1;
            for observer in &self.observers {
                observer.on_tick(transfers);
            }
        }
    }

    fn access_tick(&mut self) {
        self.tick(self.descriptor.ticks_per_access);
    }

    pub fn ctrl(&self) -> SimResult<&Ctrl> {
        self.bus
            .peripheral::<Ctrl>("ctrl")
            .ok_or(SimulationError::MissingPeripheral("ctrl"))
    }

    pub fn dma(&self) -> SimResult<&DmaBurst> {
        self.bus
            .peripheral::<DmaBurst>("dma_burst")
            .ok_or(SimulationError::MissingPeripheral("dma_burst"))
    }

    pub fn uart(&self) -> SimResult<&Uart> {
        self.bus
            .peripheral::<Uart>("uart")
            .ok_or(SimulationError::MissingPeripheral("uart"))
    }

    pub fn uart_mut(&mut self) -> SimResult<&mut Uart> {
        self.bus
            .peripheral_mut::<Uart>("uart")
            .ok_or(SimulationError::MissingPeripheral("uart"))
    }

    pub fn push_input(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.uart_mut()?.push_rx(bytes);
        Ok(())
    }

    pub fn uart_output(&self) -> String {
        self.uart()
            .map(|u| String::from_utf8_lossy(u.tx_bytes()).into_owned())
            .unwrap_or_default()
    }

    /// True once software pulsed the reset controller.
    pub fn reset_requested(&self) -> bool {
        self.ctrl().map(|c| c.reset_requests() > 0).unwrap_or(false)
    }

    /// Return peripherals to their power-on state. Memory contents survive.
    pub fn reset(&mut self) {
        self.bus.reset_peripherals();
        self.irq_mask = 0;
        self.irq_enabled = false;
        tracing::info!("Machine reset after {} cycles", self.cycles);
    }

    pub fn snapshot(&self) -> snapshot::SocSnapshot {
        let peripherals: HashMap<String, serde_json::Value> = self
            .bus
            .peripherals
            .iter()
            .map(|p| (p.name.clone(), p.dev.snapshot()))
            .collect();
        let adc = &self.bus.adc_sram;
        snapshot::SocSnapshot {
            name: self.descriptor.name.clone(),
            cycles: self.cycles,
            cache_flushes: self.cache_flushes,
            irq_mask: self.irq_mask,
            irq_enabled: self.irq_enabled,
            dropped_transfers: self.bus.dropped_transfers,
            peripherals,
            adc_sram_head: adc
                .words(adc.base_addr, snapshot::SNAPSHOT_WORDS)
                .unwrap_or_default(),
        }
    }
}

/// Shared handle that gives the console its [`Soc`] and [`Serial`] views of
/// one [`Machine`].
#[derive(Debug, Clone)]
pub struct SimSoc {
    machine: Rc<RefCell<Machine>>,
}

impl SimSoc {
    pub fn new(machine: Machine) -> Self {
        Self {
            machine: Rc::new(RefCell::new(machine)),
        }
    }

    pub fn machine(&self) -> Ref<'_, Machine> {
        self.machine.borrow()
    }

    pub fn machine_mut(&self) -> RefMut<'_, Machine> {
        self.machine.borrow_mut()
    }
}

impl Soc for SimSoc {
    type Error = SimulationError;

    fn read_csr(&mut self, csr: Csr) -> SimResult<u32> {
        let mut m = self.machine.borrow_mut();
        m.access_tick();
        let value = m.bus.read_u32(m.csr_address(csr))?;
        for observer in &m.observers {
            observer.on_csr_read(csr, value);
        }
        tracing::trace!("CSR read {} = {:#x}", csr.name(), value);
        Ok(value)
    }

    fn write_csr(&mut self, csr: Csr, value: u32) -> SimResult<()> {
        let mut m = self.machine.borrow_mut();
        let addr = m.csr_address(csr);
        m.bus.write_u32(addr, value)?;
        for observer in &m.observers {
            observer.on_csr_write(csr, value);
        }
        tracing::debug!("CSR write {} <- {:#x}", csr.name(), value);
        m.access_tick();
        Ok(())
    }

    fn region_base(&self, region: Region) -> u32 {
        self.machine.borrow().bus.region(region).base_addr as u32
    }

    fn read_word(&mut self, region: Region, index: usize) -> SimResult<u32> {
        let mut m = self.machine.borrow_mut();
        m.access_tick();
        let addr = m.bus.region(region).base_addr + index as u64 * 4;
        let value = m.bus.read_u32(addr)?;
        for observer in &m.observers {
            observer.on_memory_read(region, addr);
        }
        Ok(value)
    }

    fn flush_caches(&mut self) {
        self.machine.borrow_mut().cache_flushes += 1;
    }

    fn has_interrupts(&self) -> bool {
        self.machine.borrow().descriptor.has_interrupts
    }

    fn irq_set_mask(&mut self, mask: u32) {
        self.machine.borrow_mut().irq_mask = mask;
    }

    fn irq_set_enabled(&mut self, enabled: bool) {
        self.machine.borrow_mut().irq_enabled = enabled;
    }
}

impl Serial for SimSoc {
    fn read_nonblock(&mut self) -> Option<u8> {
        let mut m = self.machine.borrow_mut();
        m.access_tick();
        let base = m.uart_base();
        let received = m.bus.read_u32(base + uart::RXEMPTY).and_then(|empty| {
            if empty != 0 {
                return Ok(None);
            }
            let byte = m.bus.read_u32(base + uart::RXTX)? as u8;
            m.bus.write_u32(base + uart::EV_PENDING, uart::EV_RX)?;
            Ok(Some(byte))
        });
        match received {
            Ok(byte) => byte,
            Err(e) => {
                tracing::warn!("UART read failed: {}", e);
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut m = self.machine.borrow_mut();
        let base = m.uart_base();
        if let Err(e) = m.bus.write_u32(base + uart::RXTX, u32::from(byte)) {
            tracing::warn!("UART write failed: {}", e);
        }
    }
}
