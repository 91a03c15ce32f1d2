// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Wishbone DMA burst test.
//!
//! The burst engine writes `BURST_WORDS` words into `adc_sram` after a start
//! pulse and raises `ready` once it is back in its trigger-wait state. The
//! test programs it, waits for `ready` and prints the region back.

use core::fmt::Write;

use crate::hal::{Csr, DmaStart, Region, Serial, Soc, Tx};
use crate::{ConsoleError, ConsoleResult};

/// Words transferred and read back per burst.
pub const BURST_WORDS: u16 = 64;

/// Words of main RAM touched by the workaround scan.
pub const SCAN_WORDS: u16 = 64;

/// How long to busy-poll the `ready` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollLimit {
    /// Spin until the hardware answers. Hangs if it never does.
    #[default]
    Unbounded,
    /// Give up after this many reads of `ready`.
    Polls(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstState {
    Idle,
    Configured,
    Polling,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstReport {
    /// Reads of `ready` until it was seen set.
    pub polls: u32,
    pub words: [u32; BURST_WORDS as usize],
}

/// Step-wise driver for one burst.
#[derive(Debug)]
pub struct BurstTest {
    state: BurstState,
    limit: PollLimit,
}

impl BurstTest {
    pub fn new(limit: PollLimit) -> Self {
        Self {
            state: BurstState::Idle,
            limit,
        }
    }

    pub fn state(&self) -> BurstState {
        self.state
    }

    fn advance(&mut self, next: BurstState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.state, to = ?next, "burst state");
        self.state = next;
    }

    /// IDLE -> CONFIGURED: flush caches and program size, base and offset.
    pub fn configure<S: Soc + ?Sized>(&mut self, soc: &mut S) -> Result<(), S::Error> {
        debug_assert_eq!(self.state, BurstState::Idle);
        soc.flush_caches();
        let base = soc.region_base(Region::AdcSram);
        soc.write_csr(Csr::DmaBurstSize, u32::from(BURST_WORDS))?;
        soc.write_csr(Csr::DmaBase, base)?;
        soc.write_csr(Csr::DmaOffset, 0)?;
        self.advance(BurstState::Configured);
        Ok(())
    }

    /// CONFIGURED -> POLLING: pulse the start bit.
    pub fn start<S: Soc + ?Sized>(&mut self, soc: &mut S) -> Result<(), S::Error> {
        debug_assert_eq!(self.state, BurstState::Configured);
        soc.write_csr(Csr::DmaStart, DmaStart::START_BURST.bits())?;
        self.advance(BurstState::Polling);
        Ok(())
    }

    /// POLLING -> DONE: spin on `ready`. Returns the number of reads taken.
    pub fn wait_ready<S: Soc + ?Sized>(&mut self, soc: &mut S) -> ConsoleResult<u32, S::Error> {
        debug_assert_eq!(self.state, BurstState::Polling);
        let mut polls: u32 = 0;
        loop {
            let ready = soc.read_csr(Csr::DmaReady).map_err(ConsoleError::Bus)?;
            polls = polls.saturating_add(1);
            if ready != 0 {
                break;
            }
            if let PollLimit::Polls(max) = self.limit {
                if polls >= max {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(polls, "dma ready never asserted");
                    return Err(ConsoleError::ReadyTimeout { polls });
                }
            }
            core::hint::spin_loop();
        }
        self.advance(BurstState::Done);
        Ok(polls)
    }
}

/// Run one burst and print the readback as `memory[<i>]: <v>` lines.
pub fn wishbone_test<S, T>(
    soc: &mut S,
    serial: &mut T,
    limit: PollLimit,
) -> ConsoleResult<BurstReport, S::Error>
where
    S: Soc + ?Sized,
    T: Serial + ?Sized,
{
    let mut test = BurstTest::new(limit);
    let mut tx = Tx(serial);

    writeln!(tx, "wishbone burst test...")?;
    test.configure(soc).map_err(ConsoleError::Bus)?;
    test.start(soc).map_err(ConsoleError::Bus)?;

    writeln!(tx, "waiting for ready!")?;
    let polls = test.wait_ready(soc)?;

    writeln!(tx, "memory readback!")?;
    let mut words = [0u32; BURST_WORDS as usize];
    for i in 0..BURST_WORDS {
        let word = soc
            .read_word(Region::AdcSram, usize::from(i))
            .map_err(ConsoleError::Bus)?;
        words[usize::from(i)] = word;
        writeln!(tx, "memory[{}]: {}", i, word)?;
    }

    Ok(BurstReport { polls, words })
}

/// Touch `SCAN_WORDS` words of main RAM, then run [`wishbone_test`].
///
/// The scan has no observable effect beyond the loads themselves; nothing
/// depends on the values read.
pub fn workaround_test<S, T>(
    soc: &mut S,
    serial: &mut T,
    limit: PollLimit,
) -> ConsoleResult<BurstReport, S::Error>
where
    S: Soc + ?Sized,
    T: Serial + ?Sized,
{
    writeln!(Tx(&mut *serial), "wishbone burst test with workaround...")?;
    for i in 0..SCAN_WORDS {
        let word = soc
            .read_word(Region::MainRam, usize::from(i))
            .map_err(ConsoleError::Bus)?;
        core::hint::black_box(word);
    }
    wishbone_test(soc, serial, limit)
}
