// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::Serial;

/// Size of the line buffer, including the terminating NUL.
pub const LINE_CAPACITY: usize = 64;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const BELL: u8 = 0x07;
const ERASE: &[u8] = b"\x08 \x08";

/// Non-blocking line editor over a serial port.
///
/// Each [`poll`](LineReader::poll) consumes at most one byte, so a partial
/// line survives across calls and anything after a terminator stays queued in
/// the transport for the next line.
#[derive(Debug, Clone)]
pub struct LineReader {
    buf: [u8; LINE_CAPACITY],
    cursor: usize,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes typed so far on the current, unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    pub fn reset(&mut self) {
        self.buf = [0; LINE_CAPACITY];
        self.cursor = 0;
    }

    /// Consume one byte from `serial` and return the completed line, if that
    /// byte was a terminator.
    ///
    /// The returned slice borrows the internal buffer and excludes the NUL.
    pub fn poll<S: Serial + ?Sized>(&mut self, serial: &mut S) -> Option<&[u8]> {
        let byte = serial.read_nonblock()?;
        match byte {
            DELETE | BACKSPACE => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    serial.write_bytes(ERASE);
                }
                None
            }
            BELL => None,
            b'\r' | b'\n' => {
                let len = self.cursor;
                self.buf[len] = 0;
                serial.write_bytes(b"\n");
                self.cursor = 0;
                #[cfg(feature = "tracing")]
                tracing::trace!(len, "line complete");
                Some(&self.buf[..len])
            }
            _ => {
                if self.cursor >= LINE_CAPACITY - 1 {
                    return None;
                }
                serial.write_byte(byte);
                self.buf[self.cursor] = byte;
                self.cursor += 1;
                None
            }
        }
    }
}
