// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Serial diagnostic console for LiteX SoC bring-up.
//!
//! The console is written against two capabilities: [`hal::Soc`] for CSR and
//! memory access and [`hal::Serial`] for the character transport. The same
//! code runs on the bare-metal firmware and on the host simulator.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod console;
pub mod dma;
pub mod hal;
pub mod line;
pub mod token;

#[cfg(test)]
mod testing;

use core::fmt;

pub use command::{Command, PROMPT};
pub use console::{Console, Event};
pub use dma::{BurstReport, BurstState, PollLimit};
pub use hal::{Csr, Region, Serial, Soc};
pub use line::{LineReader, LINE_CAPACITY};

/// Errors surfaced by console operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError<E> {
    /// A CSR or memory access failed on the SoC side.
    Bus(E),
    /// Formatting into the serial transport failed.
    Format,
    /// The DMA engine never raised `ready` within the poll limit.
    ReadyTimeout { polls: u32 },
}

impl<E> From<fmt::Error> for ConsoleError<E> {
    fn from(_: fmt::Error) -> Self {
        ConsoleError::Format
    }
}

impl<E: fmt::Display> fmt::Display for ConsoleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Bus(err) => write!(f, "SoC access failed: {}", err),
            ConsoleError::Format => f.write_str("serial formatting failed"),
            ConsoleError::ReadyTimeout { polls } => {
                write!(f, "DMA ready not asserted after {} polls", polls)
            }
        }
    }
}

pub type ConsoleResult<T, E> = Result<T, ConsoleError<E>>;
