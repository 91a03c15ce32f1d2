// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Peripheral, SimResult};
use serde::Serialize;
use socdiag_console::hal::CtrlReset;
use std::any::Any;

pub const RESET: u64 = 0x00;
pub const SCRATCH: u64 = 0x04;

const SCRATCH_RESET_VALUE: u32 = 0x1234_5678;

/// LiteX `ctrl` block: reset controller and scratch register.
#[derive(Debug, Serialize)]
pub struct Ctrl {
    scratch: u32,
    reset_requests: u32,
    last_reset: u32,
}

impl Default for Ctrl {
    fn default() -> Self {
        Self::new()
    }
}

impl Ctrl {
    pub fn new() -> Self {
        Self {
            scratch: SCRATCH_RESET_VALUE,
            reset_requests: 0,
            last_reset: 0,
        }
    }

    /// Number of reset pulses seen since construction or the last reset.
    pub fn reset_requests(&self) -> u32 {
        self.reset_requests
    }

    pub fn last_reset(&self) -> CtrlReset {
        CtrlReset::from_bits_truncate(self.last_reset)
    }
}

impl Peripheral for Ctrl {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            SCRATCH => Ok(self.scratch),
            // Reset fields are pulses and read back as zero.
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            RESET => {
                let flags = CtrlReset::from_bits_truncate(value);
                if !flags.is_empty() {
                    self.reset_requests += 1;
                    self.last_reset = flags.bits();
                    tracing::info!("CTRL: reset requested ({:?})", flags);
                }
            }
            SCRATCH => self.scratch = value,
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::new();
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
