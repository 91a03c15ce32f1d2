// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::Serialize;
use socdiag_config::{SocDescriptor, StopReason, TestAssertion, TestScript};
use socdiag_console::PollLimit;
use socdiag_core::metrics::{AccessMetrics, MetricsReport};
use socdiag_core::session::{RunLimits, RunSummary, Session};
use socdiag_core::Machine;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

/// Host-side ready poll bound when none is given.
const DEFAULT_MAX_POLLS: u32 = 100_000;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run the SoC bring-up diagnostic console on a simulated LiteX SoC",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted session and check its assertions
    Test(TestArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Path to the SoC descriptor (YAML)
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Text typed into the UART instead of stdin. `\n` and `\r` escapes are honoured
    #[arg(short, long)]
    input: Option<String>,

    /// Bound on the DMA ready poll (0 polls forever)
    #[arg(long, default_value_t = DEFAULT_MAX_POLLS)]
    max_polls: u32,

    /// Maximum number of console service calls
    #[arg(long)]
    max_steps: Option<u64>,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,

    /// Write a JSON snapshot of the SoC when the run stops
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(long)]
    script: PathBuf,

    /// Directory for `result.json`
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not mirror UART output to stdout
    #[arg(long)]
    no_uart_stdout: bool,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let trace = match &cli.command {
        Some(Commands::Test(args)) => args.trace,
        None => cli.run.trace,
    };
    init_tracing(trace);

    let result = match cli.command {
        Some(Commands::Test(args)) => run_test(&args),
        None => run_interactive(&cli.run),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("socdiag: {:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn init_tracing(trace: bool) {
    let level = if trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn build_id() -> String {
    format!("socdiag-sim {}", env!("CARGO_PKG_VERSION"))
}

fn poll_limit(max_polls: u32) -> PollLimit {
    match max_polls {
        0 => PollLimit::Unbounded,
        n => PollLimit::Polls(n),
    }
}

fn load_machine(system: Option<&Path>) -> anyhow::Result<Machine> {
    match system {
        Some(path) => {
            info!("Loading SoC descriptor: {:?}", path);
            let desc = SocDescriptor::from_file(path)?;
            Machine::from_config(&desc)
        }
        None => {
            info!("Using default ECP5 SoC map");
            Ok(Machine::new())
        }
    }
}

/// Expand `\n`, `\r`, `\t` and `\\` in command-line input.
fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn spawn_stdin_pump() -> Receiver<Vec<u8>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 256];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn run_interactive(args: &RunArgs) -> anyhow::Result<ExitCode> {
    info!("Starting SocDiag simulator");

    let metrics = Arc::new(AccessMetrics::new());
    let mut machine = load_machine(args.system.as_deref())?;
    machine.observers.push(metrics.clone());
    machine.uart_mut()?.set_stdout_echo(true);

    let mut session = Session::new(machine, poll_limit(args.max_polls));
    session.boot(&build_id())?;

    let limits = RunLimits {
        max_steps: args.max_steps.unwrap_or(u64::MAX),
        wall_time: None,
    };

    let summary = match &args.input {
        Some(text) => {
            session.push_input(&unescape(text))?;
            session.run(&limits)
        }
        None => run_stdin(&mut session, &limits)?,
    };
    println!();

    info!(
        "Run stopped: {:?} after {} steps, {} commands",
        summary.stop_reason,
        summary.steps,
        summary.commands.len()
    );

    if let Some(path) = &args.snapshot {
        let snapshot = serde_json::json!({
            "type": "interactive_soc",
            "summary": &summary,
            "metrics": metrics.report(),
            "soc": session.soc().machine().snapshot(),
        });
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)
            .with_context(|| format!("Failed to write snapshot to {:?}", path))?;
        info!("Snapshot written to {:?}", path);
    }

    if summary.stop_reason == StopReason::BusError {
        return Ok(ExitCode::from(EXIT_ASSERT_FAIL));
    }
    Ok(ExitCode::SUCCESS)
}

/// Feed stdin into the UART until EOF leaves the console idle.
fn run_stdin(session: &mut Session, limits: &RunLimits) -> anyhow::Result<RunSummary> {
    let input = spawn_stdin_pump();
    let mut eof = false;

    loop {
        loop {
            match input.try_recv() {
                Ok(bytes) => session.push_input(&bytes)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    eof = true;
                    break;
                }
            }
        }

        let summary = session.run(limits);
        if summary.stop_reason != StopReason::InputExhausted || eof {
            return Ok(summary);
        }

        match input.recv_timeout(Duration::from_millis(50)) {
            Ok(bytes) => session.push_input(&bytes)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => eof = true,
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionResult {
    assertion: TestAssertion,
    passed: bool,
}

#[derive(Debug, Serialize)]
struct TestConfigInfo {
    script: String,
    system: Option<String>,
    max_polls: u32,
}

#[derive(Debug, Serialize)]
struct TestResult {
    status: &'static str,
    #[serde(flatten)]
    summary: RunSummary,
    assertions: Vec<AssertionResult>,
    metrics: MetricsReport,
    config: TestConfigInfo,
}

fn check_assertion(assertion: &TestAssertion, summary: &RunSummary, uart: &str) -> bool {
    match assertion {
        TestAssertion::UartContains(a) => uart.contains(&a.uart_contains),
        TestAssertion::UartNotContains(a) => !uart.contains(&a.uart_not_contains),
        TestAssertion::ExpectedStopReason(a) => summary.stop_reason == a.expected_stop_reason,
        TestAssertion::DmaTimeouts(a) => summary.dma_timeouts == a.dma_timeouts,
    }
}

fn run_test(args: &TestArgs) -> anyhow::Result<ExitCode> {
    info!("Loading test script: {:?}", args.script);
    let script = TestScript::from_file(&args.script)?;

    // Descriptor paths are relative to the script.
    let system = script.inputs.system.as_ref().map(|s| {
        let path = Path::new(s);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            args.script
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(path)
        }
    });

    let metrics = Arc::new(AccessMetrics::new());
    let mut machine = load_machine(system.as_deref())?;
    machine.observers.push(metrics.clone());
    machine.uart_mut()?.set_stdout_echo(!args.no_uart_stdout);

    let max_polls = script.limits.max_polls.unwrap_or(DEFAULT_MAX_POLLS);
    let mut session = Session::new(machine, PollLimit::Polls(max_polls));
    session.boot(&build_id())?;
    session.push_input(&unescape(&script.inputs.uart_input))?;

    let summary = session.run(&RunLimits {
        max_steps: script.limits.max_steps,
        wall_time: script.limits.wall_time_ms.map(Duration::from_millis),
    });

    let uart = session.output();
    let assertions: Vec<AssertionResult> = script
        .assertions
        .iter()
        .map(|assertion| {
            let passed = check_assertion(assertion, &summary, &uart);
            if !passed {
                warn!("Assertion failed: {:?}", assertion);
            }
            AssertionResult {
                assertion: assertion.clone(),
                passed,
            }
        })
        .collect();

    let passed = assertions.iter().all(|a| a.passed);
    let result = TestResult {
        status: if passed { "pass" } else { "fail" },
        summary,
        assertions,
        metrics: metrics.report(),
        config: TestConfigInfo {
            script: args.script.display().to_string(),
            system: system.map(|p| p.display().to_string()),
            max_polls,
        },
    };

    info!(
        "Test {}: stopped on {:?} after {} steps",
        result.status, result.summary.stop_reason, result.summary.steps
    );

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        let path = dir.join("result.json");
        std::fs::write(&path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        std::fs::write(dir.join("uart.log"), &uart)
            .with_context(|| format!("Failed to write UART log to {:?}", dir))?;
    }

    if passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_ASSERT_FAIL))
    }
}
