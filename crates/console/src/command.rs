// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt;

/// Printed after every serviced line. No trailing newline.
pub const PROMPT: &str = "RUNTIME>";

pub const HELP_HEADER: &str = "Available commands:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Reboot,
    Workaround,
    Wishbone,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub command: Command,
}

/// Command table, in help-banner order.
pub const COMMANDS: [CommandSpec; 4] = [
    CommandSpec {
        name: "help",
        summary: "this command",
        command: Command::Help,
    },
    CommandSpec {
        name: "reboot",
        summary: "reboot CPU",
        command: Command::Reboot,
    },
    CommandSpec {
        name: "workaround",
        summary: "wishbone dma test with memory write workaround",
        command: Command::Workaround,
    },
    CommandSpec {
        name: "wishbone",
        summary: "wishbone dma test",
        command: Command::Wishbone,
    },
];

impl Command {
    /// Exact, case-sensitive match of a command word.
    pub fn lookup(token: &[u8]) -> Option<Command> {
        COMMANDS
            .iter()
            .find(|entry| entry.name.as_bytes() == token)
            .map(|entry| entry.command)
    }

    pub fn name(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|entry| entry.command == self)
            .map(|entry| entry.name)
            .unwrap_or("?")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn write_help<W: fmt::Write>(out: &mut W) -> fmt::Result {
    writeln!(out, "{}", HELP_HEADER)?;
    for entry in &COMMANDS {
        writeln!(out, "{:<32}- {}", entry.name, entry.summary)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_commands() {
        assert_eq!(Command::lookup(b"help"), Some(Command::Help));
        assert_eq!(Command::lookup(b"reboot"), Some(Command::Reboot));
        assert_eq!(Command::lookup(b"workaround"), Some(Command::Workaround));
        assert_eq!(Command::lookup(b"wishbone"), Some(Command::Wishbone));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        assert_eq!(Command::lookup(b"HELP"), None);
        assert_eq!(Command::lookup(b"wish"), None);
        assert_eq!(Command::lookup(b"wishbones"), None);
        assert_eq!(Command::lookup(b""), None);
    }

    #[test]
    fn test_help_banner_text() {
        let mut out = String::new();
        write_help(&mut out).unwrap();
        assert_eq!(
            out,
            "Available commands:\n\
             help                            - this command\n\
             reboot                          - reboot CPU\n\
             workaround                      - wishbone dma test with memory write workaround\n\
             wishbone                        - wishbone dma test\n"
        );
    }
}
