/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::io;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use dynsched_nm::catalog::Catalog;
use dynsched_nm::session::{run_log_loop, run_scheduler_loop, Session};
use dynsched_nm::transport::open_serial;

// ── CLI argument definition ───────────────────────────────────────────────────

/// TSCH dynamic-scheduling network manager.
///
/// Example:
///   dynsched-nm /dev/ttyUSB0 -b 115200 --read-timeout 10
#[derive(Debug, Parser)]
#[command(
    name = "dynsched-nm",
    about = "Network manager for TSCH dynamic scheduling over a serial link",
    long_about = None,
)]
struct Cli {
    /// Serial device the coordinator is attached to (e.g. /dev/ttyUSB0).
    device: String,

    /// Baud rate of the coordinator's serial console.
    #[arg(short = 'b', long = "baud", default_value_t = 115_200)]
    baud: u32,

    /// Read timeout in seconds for the device log stream.  Bounds how long
    /// the log reader blocks before re-checking for shutdown.
    #[arg(long = "read-timeout", default_value_t = 10)]
    read_timeout_secs: u64,

    /// Path to a YAML schedule catalog.  The built-in catalog is used when
    /// absent.
    #[arg(short = 'c', long = "catalog")]
    catalog: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("dynsched-nm starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        device       = %cli.device,
        baud         = cli.baud,
        read_timeout = cli.read_timeout_secs,
        catalog      = ?cli.catalog,
        "Configuration"
    );

    // ── Build the schedule catalog ────────────────────────────────────────────
    let catalog = match &cli.catalog {
        Some(path) => match Catalog::load_from_file(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Failed to load schedule catalog: {:#}", e);
                process::exit(1);
            }
        },
        None => Catalog::builtin(),
    };
    info!("Catalog holds {} schedule(s)", catalog.len());

    // ── Open the serial transport ─────────────────────────────────────────────
    // Open failure is fatal: there is no session without the device.
    let (mut writer, mut reader) = match open_serial(
        &cli.device,
        cli.baud,
        Duration::from_secs(cli.read_timeout_secs),
    ) {
        Ok(halves) => halves,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    // ── Run the two session loops ─────────────────────────────────────────────
    let session = Session::new(catalog);
    let shutdown = session.shutdown().clone();

    // Log loop on its own thread: sole reader of the serial device.
    let log_thread = thread::spawn(move || run_log_loop(&shutdown, &mut reader));

    // Scheduler loop on the main thread: sole writer, driven by stdin.
    let stdin = io::stdin();
    let stdout = io::stdout();
    let scheduler_result =
        run_scheduler_loop(&session, stdin.lock(), stdout.lock(), &mut writer);

    // Join semantics: the process ends only once both loops have stopped.
    // The quit paths inside the loop already request shutdown; this covers a
    // console I/O error bailing out early.  The log loop then terminates
    // within one read-timeout interval.
    session.shutdown().request();
    let measurements = match log_thread.join() {
        Ok(measurements) => measurements,
        Err(_) => {
            error!("log loop panicked");
            Vec::new()
        }
    };

    // ── Report ────────────────────────────────────────────────────────────────
    info!("Collected {} measurement(s)", measurements.len());
    for m in &measurements {
        info!("  Diff = {m} ticks");
    }

    if let Err(e) = scheduler_result {
        error!("session ended with an error: {e}");
        process::exit(1);
    }
}
