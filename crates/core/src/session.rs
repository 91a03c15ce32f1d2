// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side driver that runs the console against a simulated SoC.

use crate::{Machine, SimResult, SimSoc, SimulationError};
use serde::Serialize;
use socdiag_config::StopReason;
use socdiag_console::{Console, ConsoleError, Event, PollLimit};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunLimits {
    pub max_steps: u64,
    pub wall_time: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub steps: u64,
    /// Commands executed, in order.
    pub commands: Vec<String>,
    pub dma_timeouts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ConsoleError<SimulationError>> for SimulationError {
    fn from(err: ConsoleError<SimulationError>) -> Self {
        match err {
            ConsoleError::Bus(e) => e,
            ConsoleError::Format => SimulationError::SerialFormat,
            ConsoleError::ReadyTimeout { polls } => SimulationError::ReadyTimeout(polls),
        }
    }
}

pub struct Session {
    soc: SimSoc,
    console: Console<SimSoc, SimSoc>,
    steps: u64,
    commands: Vec<String>,
    dma_timeouts: u32,
}

impl Session {
    pub fn new(machine: Machine, limit: PollLimit) -> Self {
        let soc = SimSoc::new(machine);
        let console = Console::new(soc.clone(), soc.clone()).with_poll_limit(limit);
        Self {
            soc,
            console,
            steps: 0,
            commands: Vec::new(),
            dma_timeouts: 0,
        }
    }

    pub fn soc(&self) -> &SimSoc {
        &self.soc
    }

    pub fn console(&self) -> &Console<SimSoc, SimSoc> {
        &self.console
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn boot(&mut self, build: &str) -> SimResult<()> {
        self.console.boot(build)?;
        Ok(())
    }

    pub fn push_input(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.soc.machine_mut().push_input(bytes)
    }

    pub fn input_pending(&self) -> usize {
        self.soc
            .machine()
            .uart()
            .map(|u| u.rx_pending())
            .unwrap_or(0)
    }

    pub fn output(&self) -> String {
        self.soc.machine().uart_output()
    }

    /// One console service call.
    pub fn step(&mut self) -> SimResult<Event> {
        self.steps += 1;
        let event = self.console.service()?;
        match event {
            Event::Ran(command) => self.commands.push(command.to_string()),
            Event::TimedOut(command) => {
                self.commands.push(command.to_string());
                self.dma_timeouts += 1;
            }
            Event::Idle | Event::Ignored => {}
        }
        Ok(event)
    }

    /// Service the console until the input runs dry, the SoC resets or a
    /// limit is hit.
    pub fn run(&mut self, limits: &RunLimits) -> RunSummary {
        let started = Instant::now();
        let mut error = None;

        let stop_reason = loop {
            if self.soc.machine().reset_requested() {
                break StopReason::Reset;
            }
            if self.steps >= limits.max_steps {
                break StopReason::MaxSteps;
            }
            if let Some(limit) = limits.wall_time {
                if started.elapsed() >= limit {
                    break StopReason::WallTime;
                }
            }
            match self.step() {
                Ok(Event::Idle) => {
                    if self.input_pending() == 0 {
                        break StopReason::InputExhausted;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Console stopped on bus error: {}", e);
                    error = Some(e.to_string());
                    break StopReason::BusError;
                }
            }
        };

        tracing::debug!("Session paused after {} steps: {:?}", self.steps, stop_reason);
        RunSummary {
            stop_reason,
            steps: self.steps,
            commands: self.commands.clone(),
            dma_timeouts: self.dma_timeouts,
            error,
        }
    }
}
