// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt::Write;

use crate::command::{write_help, Command, PROMPT};
use crate::dma::{self, PollLimit};
use crate::hal::{CtrlReset, Csr, Serial, Soc, Tx};
use crate::line::LineReader;
use crate::token::next_token;
use crate::{ConsoleError, ConsoleResult};

/// What one call to [`Console::service`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// No completed line yet.
    Idle,
    /// A line arrived but its first word is not a command.
    Ignored,
    Ran(Command),
    /// The DMA test gave up waiting for `ready`.
    TimedOut(Command),
}

/// Read-eval loop over a SoC and a serial port.
pub struct Console<S, T> {
    soc: S,
    serial: T,
    reader: LineReader,
    poll_limit: PollLimit,
}

impl<S: Soc, T: Serial> Console<S, T> {
    pub fn new(soc: S, serial: T) -> Self {
        Self {
            soc,
            serial,
            reader: LineReader::new(),
            poll_limit: PollLimit::Unbounded,
        }
    }

    pub fn with_poll_limit(mut self, limit: PollLimit) -> Self {
        self.poll_limit = limit;
        self
    }

    pub fn poll_limit(&self) -> PollLimit {
        self.poll_limit
    }

    pub fn soc(&self) -> &S {
        &self.soc
    }

    pub fn soc_mut(&mut self) -> &mut S {
        &mut self.soc
    }

    pub fn serial(&self) -> &T {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut T {
        &mut self.serial
    }

    pub fn reader(&self) -> &LineReader {
        &self.reader
    }

    /// One-time setup: interrupts, banner, help and the first prompt.
    pub fn boot(&mut self, build: &str) -> ConsoleResult<(), S::Error> {
        if self.soc.has_interrupts() {
            self.soc.irq_set_mask(0);
            self.soc.irq_set_enabled(true);
        }

        let mut tx = Tx(&mut self.serial);
        write!(tx, "\nCPU testing software built {}\n\n", build)?;
        write_help(&mut tx)?;
        tx.write_str(PROMPT)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(build, "console booted");
        Ok(())
    }

    /// Poll the serial port once and dispatch a completed line.
    pub fn service(&mut self) -> ConsoleResult<Event, S::Error> {
        let Some(line) = self.reader.poll(&mut self.serial) else {
            return Ok(Event::Idle);
        };
        dispatch(&mut self.soc, &mut self.serial, line, self.poll_limit)
    }

    /// Service forever. Only a reset or power cycle ends this.
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(_err) = self.service() {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "console service failed");
            }
        }
    }
}

/// Run the command named by the first word of `line`, then print the prompt.
///
/// Unknown words are ignored silently and arguments are never looked at.
pub fn dispatch<S, T>(
    soc: &mut S,
    serial: &mut T,
    line: &[u8],
    limit: PollLimit,
) -> ConsoleResult<Event, S::Error>
where
    S: Soc + ?Sized,
    T: Serial + ?Sized,
{
    let mut rest = line;
    let token = next_token(&mut rest);

    let event = match Command::lookup(token) {
        None => Event::Ignored,
        Some(command) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(%command, "dispatch");
            let result = match command {
                Command::Help => {
                    write_help(&mut Tx(&mut *serial))?;
                    Ok(())
                }
                Command::Reboot => soc
                    .write_csr(Csr::CtrlReset, CtrlReset::SOC_RST.bits())
                    .map_err(ConsoleError::Bus),
                Command::Wishbone => {
                    dma::wishbone_test(&mut *soc, &mut *serial, limit).map(|_| ())
                }
                Command::Workaround => {
                    dma::workaround_test(&mut *soc, &mut *serial, limit).map(|_| ())
                }
            };
            match result {
                Ok(()) => Event::Ran(command),
                Err(ConsoleError::ReadyTimeout { polls }) => {
                    writeln!(
                        Tx(&mut *serial),
                        "dma timeout: ready not asserted after {} polls",
                        polls
                    )?;
                    Event::TimedOut(command)
                }
                Err(err) => return Err(err),
            }
        }
    };

    Tx(&mut *serial).write_str(PROMPT)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSerial, MockSoc};

    fn console(input: &[u8]) -> Console<MockSoc, MockSerial> {
        Console::new(MockSoc::new(), MockSerial::with_input(input))
            .with_poll_limit(PollLimit::Polls(1000))
    }

    fn service_all(console: &mut Console<MockSoc, MockSerial>) -> Vec<Event> {
        let mut events = Vec::new();
        while !console.serial().rx.is_empty() {
            match console.service().unwrap() {
                Event::Idle => {}
                event => events.push(event),
            }
        }
        events
    }

    #[test]
    fn test_boot_prints_banner_help_and_prompt() {
        let mut console = console(b"");
        console.boot("2026-10-17 12:00:00").unwrap();
        let out = console.serial_mut().take_output();
        assert!(out.starts_with("\nCPU testing software built 2026-10-17 12:00:00\n\nAvailable commands:\n"));
        assert!(out.ends_with("wishbone dma test\nRUNTIME>"));
        assert_eq!(console.soc().irq_mask, None);
    }

    /// Register file with no failure mode, like the hardware bindings.
    struct BareSoc;

    impl Soc for BareSoc {
        type Error = core::convert::Infallible;

        fn read_csr(&mut self, _csr: Csr) -> Result<u32, Self::Error> {
            Ok(1)
        }

        fn write_csr(&mut self, _csr: Csr, _value: u32) -> Result<(), Self::Error> {
            Ok(())
        }

        fn region_base(&self, _region: crate::hal::Region) -> u32 {
            0
        }

        fn read_word(&mut self, _region: crate::hal::Region, _index: usize) -> Result<u32, Self::Error> {
            Ok(0)
        }
    }

    #[test]
    fn test_boot_on_infallible_soc_succeeds() {
        let mut console = Console::new(BareSoc, MockSerial::default());
        assert_eq!(console.boot("1970-01-01 00:00:00"), Ok(()));
        assert!(console.serial().output().ends_with(PROMPT));
    }

    #[test]
    fn test_boot_sets_up_interrupts_when_present() {
        let mut console = console(b"");
        console.soc_mut().interrupts = true;
        console.boot("now").unwrap();
        assert_eq!(console.soc().irq_mask, Some(0));
        assert!(console.soc().irq_enabled);
    }

    #[test]
    fn test_help_command() {
        let mut console = console(b"help\r");
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Help)]);

        let mut expected = String::from("help\n");
        write_help(&mut expected).unwrap();
        expected.push_str(PROMPT);
        assert_eq!(console.serial().output(), expected);
        assert_eq!(expected.lines().count(), 7);
    }

    #[test]
    fn test_unknown_command_prints_only_prompt() {
        let mut console = console(b"xyz\r");
        assert_eq!(service_all(&mut console), vec![Event::Ignored]);
        assert_eq!(console.serial().output(), "xyz\nRUNTIME>");
        assert!(console.soc().writes.is_empty());
    }

    #[test]
    fn test_empty_line_prints_prompt() {
        let mut console = console(b"\n");
        assert_eq!(service_all(&mut console), vec![Event::Ignored]);
        assert_eq!(console.serial().output(), "\nRUNTIME>");
    }

    #[test]
    fn test_arguments_are_ignored() {
        let mut console = console(b"help me please\r");
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Help)]);
    }

    #[test]
    fn test_reboot_writes_reset_register() {
        let mut console = console(b"reboot\r");
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Reboot)]);
        assert_eq!(console.soc().writes, vec![(Csr::CtrlReset, 1)]);
        assert_eq!(console.serial().output(), "reboot\nRUNTIME>");
    }

    #[test]
    fn test_wishbone_end_to_end() {
        let mut console = console(b"wishbone\r");
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Wishbone)]);

        let mut expected = String::from("wishbone\nwishbone burst test...\nwaiting for ready!\nmemory readback!\n");
        for i in 0..64u32 {
            expected.push_str(&format!("memory[{}]: {}\n", i, i * 3 + 7));
        }
        expected.push_str("RUNTIME>");
        assert_eq!(console.serial().output(), expected);
    }

    #[test]
    fn test_workaround_command() {
        let mut console = console(b"workaround\r");
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Workaround)]);
        assert_eq!(console.soc().main_ram_reads, 64);
        assert!(console.serial().output().ends_with("memory[63]: 196\nRUNTIME>"));
    }

    #[test]
    fn test_timeout_is_reported_and_console_continues() {
        let mut console = console(b"wishbone\rhelp\r");
        console.soc_mut().ready_after = None;

        let events = service_all(&mut console);
        assert_eq!(
            events,
            vec![Event::TimedOut(Command::Wishbone), Event::Ran(Command::Help)]
        );
        let out = console.serial().output();
        assert!(out.contains("waiting for ready!\ndma timeout: ready not asserted after 1000 polls\nRUNTIME>help\n"));
    }

    #[test]
    fn test_partial_line_then_command() {
        let mut console = console(b"wis");
        assert!(service_all(&mut console).is_empty());
        assert_eq!(console.reader().pending(), b"wis");

        console.serial_mut().rx.extend(b"x\x08hbone\n".iter());
        assert_eq!(service_all(&mut console), vec![Event::Ran(Command::Wishbone)]);
    }
}
