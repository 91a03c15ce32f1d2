// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_main]
#![no_std]

use core::arch::asm;
use core::convert::Infallible;
use core::ptr::{read_volatile, write_volatile};

use panic_halt as _;
use riscv_rt::entry;
use socdiag_console::hal::{Csr, Region, Serial, Soc};
use socdiag_console::{Console, ConsoleError, PollLimit};

const BUILD_TIME: &str = env!("SOCDIAG_BUILD_TIME");

/// Register map generated by the SoC builder for the ECP5 evaluation board.
mod csr {
    pub const CSR_BASE: usize = 0xF000_0000;

    pub const CTRL_RESET: usize = CSR_BASE;

    pub const DMA_BURST: usize = CSR_BASE + 0x0800;
    pub const DMA_START: usize = DMA_BURST;
    pub const DMA_READY: usize = DMA_BURST + 0x04;
    pub const DMA_BURST_SIZE: usize = DMA_BURST + 0x08;
    pub const DMA_BASE: usize = DMA_BURST + 0x0C;
    pub const DMA_OFFSET: usize = DMA_BURST + 0x10;

    pub const UART: usize = CSR_BASE + 0x1000;
    pub const UART_RXTX: usize = UART;
    pub const UART_TXFULL: usize = UART + 0x04;
    pub const UART_RXEMPTY: usize = UART + 0x08;
    pub const UART_EV_PENDING: usize = UART + 0x10;
    pub const UART_EV_ENABLE: usize = UART + 0x14;

    pub const UART_EV_TX: u32 = 1 << 0;
    pub const UART_EV_RX: u32 = 1 << 1;

    pub const MAIN_RAM_BASE: usize = 0x4000_0000;
    pub const ADC_SRAM_BASE: usize = 0x3000_0000;
}

#[inline(always)]
fn reg_read(addr: usize) -> u32 {
    unsafe { read_volatile(addr as *const u32) }
}

#[inline(always)]
fn reg_write(addr: usize, value: u32) {
    unsafe { write_volatile(addr as *mut u32, value) }
}

struct LitexSoc;

impl LitexSoc {
    fn csr_address(csr: Csr) -> usize {
        match csr {
            Csr::CtrlReset => csr::CTRL_RESET,
            Csr::DmaStart => csr::DMA_START,
            Csr::DmaReady => csr::DMA_READY,
            Csr::DmaBurstSize => csr::DMA_BURST_SIZE,
            Csr::DmaBase => csr::DMA_BASE,
            Csr::DmaOffset => csr::DMA_OFFSET,
        }
    }
}

impl Soc for LitexSoc {
    type Error = Infallible;

    fn read_csr(&mut self, csr: Csr) -> Result<u32, Infallible> {
        Ok(reg_read(Self::csr_address(csr)))
    }

    fn write_csr(&mut self, csr: Csr, value: u32) -> Result<(), Infallible> {
        reg_write(Self::csr_address(csr), value);
        Ok(())
    }

    fn region_base(&self, region: Region) -> u32 {
        match region {
            Region::AdcSram => csr::ADC_SRAM_BASE as u32,
            Region::MainRam => csr::MAIN_RAM_BASE as u32,
        }
    }

    fn read_word(&mut self, region: Region, index: usize) -> Result<u32, Infallible> {
        let base = self.region_base(region) as usize;
        Ok(reg_read(base + index * 4))
    }

    fn flush_caches(&mut self) {
        unsafe {
            asm!("fence.i");
            // VexRiscv data cache flush.
            asm!(".word 0x500F");
        }
    }

    fn has_interrupts(&self) -> bool {
        true
    }

    // VexRiscv keeps the external interrupt mask in CSR 0xBC0.
    fn irq_set_mask(&mut self, mask: u32) {
        unsafe { asm!("csrw 0xBC0, {0}", in(reg) mask) }
    }

    fn irq_set_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                riscv::register::mstatus::set_mie();
            } else {
                riscv::register::mstatus::clear_mie();
            }
        }
    }
}

struct LitexUart;

impl LitexUart {
    /// Polled mode: acknowledge stale events and keep UART interrupts off.
    fn init() -> Self {
        reg_write(csr::UART_EV_PENDING, reg_read(csr::UART_EV_PENDING));
        reg_write(csr::UART_EV_ENABLE, 0);
        LitexUart
    }
}

impl Serial for LitexUart {
    fn read_nonblock(&mut self) -> Option<u8> {
        if reg_read(csr::UART_RXEMPTY) != 0 {
            return None;
        }
        let byte = reg_read(csr::UART_RXTX) as u8;
        reg_write(csr::UART_EV_PENDING, csr::UART_EV_RX);
        Some(byte)
    }

    fn write_byte(&mut self, byte: u8) {
        while reg_read(csr::UART_TXFULL) != 0 {}
        reg_write(csr::UART_RXTX, u32::from(byte));
        reg_write(csr::UART_EV_PENDING, csr::UART_EV_TX);
    }
}

#[entry]
fn main() -> ! {
    let mut console =
        Console::new(LitexSoc, LitexUart::init()).with_poll_limit(PollLimit::Unbounded);
    // Boot polls nothing and `Tx` never fails, so only a formatting error
    // could land here. The banner is lost in that case; the console still runs.
    if let Err(err) = console.boot(BUILD_TIME) {
        match err {
            ConsoleError::Bus(never) => match never {},
            ConsoleError::Format | ConsoleError::ReadyTimeout { .. } => {}
        }
    }
    console.run()
}
