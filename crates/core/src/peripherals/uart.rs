// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Peripheral, SimResult};
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::io::{self, Write};

pub const RXTX: u64 = 0x00;
pub const TXFULL: u64 = 0x04;
pub const RXEMPTY: u64 = 0x08;
pub const EV_STATUS: u64 = 0x0C;
pub const EV_PENDING: u64 = 0x10;
pub const EV_ENABLE: u64 = 0x14;

pub const EV_TX: u32 = 1 << 0;
pub const EV_RX: u32 = 1 << 1;

/// LiteX UART.
///
/// Reading `rxtx` peeks at the head of the receive FIFO; acknowledging
/// `EV_RX` in `ev_pending` pops it. Transmitted bytes are captured and may
/// be mirrored to stdout.
#[derive(Debug, Default, Serialize)]
pub struct Uart {
    #[serde(skip)]
    rx: VecDeque<u8>,
    #[serde(skip)]
    tx: Vec<u8>,
    ev_enable: u32,
    #[serde(skip)]
    echo_stdout: bool,
}

impl Uart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stdout_echo(&mut self, echo: bool) {
        self.echo_stdout = echo;
    }

    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    fn transmit(&mut self, byte: u8) {
        self.tx.push(byte);
        if self.echo_stdout {
            let mut stdout = io::stdout();
            if stdout.write_all(&[byte]).and_then(|_| stdout.flush()).is_err() {
                tracing::warn!("UART: stdout mirror failed");
            }
        }
    }

    fn pending_events(&self) -> u32 {
        let mut events = 0;
        if !self.rx.is_empty() {
            events |= EV_RX;
        }
        events
    }
}

impl Peripheral for Uart {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            RXTX => Ok(self.rx.front().copied().map(u32::from).unwrap_or(0)),
            TXFULL => Ok(0),
            RXEMPTY => Ok(u32::from(self.rx.is_empty())),
            EV_STATUS | EV_PENDING => Ok(self.pending_events()),
            EV_ENABLE => Ok(self.ev_enable),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            RXTX => self.transmit(value as u8),
            EV_PENDING => {
                if value & EV_RX != 0 {
                    self.rx.pop_front();
                }
            }
            EV_ENABLE => self.ev_enable = value & (EV_TX | EV_RX),
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.ev_enable = 0;
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "rx_pending": self.rx.len(),
            "tx_bytes": self.tx.len(),
            "ev_enable": self.ev_enable,
        })
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
