/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Coordinator device simulator.
//!
//! Plays the role of the TSCH coordinator on the peer end of a virtual
//! serial pair so the full duplex loop of `dynsched-nm` can be exercised
//! without hardware:
//!
//! ```text
//! socat -d -d pty,raw,echo=0 pty,raw,echo=0
//! dynsched-nm /dev/pts/2          # one end
//! coordinator-sim /dev/pts/3      # the other
//! ```
//!
//! For every schedule command received it logs the applied table and writes
//! back a firmware-style `[WARN: DYNSCHED ...]` latency line; malformed
//! commands get the firmware's error line instead.  Idle periods produce
//! unrelated log chatter that the manager's matcher must ignore.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use dynsched_nm::transport::{open_serial, ReadLine, WriteLine};
use dynsched_nm::wire;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Coordinator device simulator for manual dynsched-nm testing.
#[derive(Debug, Parser)]
#[command(
    name = "coordinator-sim",
    about = "Simulates the TSCH coordinator on a (virtual) serial device",
    long_about = None,
)]
struct Cli {
    /// Serial device to serve on (the peer end of the manager's device).
    device: String,

    /// Baud rate.
    #[arg(short = 'b', long = "baud", default_value_t = 115_200)]
    baud: u32,

    /// Read timeout in seconds between idle-chatter lines.
    #[arg(long = "read-timeout", default_value_t = 2)]
    read_timeout_secs: u64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(device = %cli.device, baud = cli.baud, "coordinator-sim starting");

    let (mut writer, mut reader) = open_serial(
        &cli.device,
        cli.baud,
        Duration::from_secs(cli.read_timeout_secs),
    )?;

    let mut applied: u64 = 0;
    let mut idle: u64 = 0;

    loop {
        match reader.read_line()? {
            Some(line) => {
                info!(line = %line, "received");
                match wire::parse_schedule(&line) {
                    Ok(sched) => {
                        applied += 1;
                        info!("Schedule from serial input");
                        for link in sched.links() {
                            info!(
                                "Timeslot {} Channel offset {} Linkopt {} Nodeid {}",
                                link.timeslot,
                                link.channel_offset,
                                link.option.to_wire_int(),
                                link.node_id,
                            );
                        }

                        // Pseudo application latency: deterministic per
                        // schedule shape, varied a little per application so
                        // repeated sends produce distinguishable samples.
                        let ticks = 100 + 7 * sched.link_count() as u64 + applied % 13;

                        writer.write_line(&format!(
                            "[INFO: DYNSCHED SER] applied schedule with {} link(s)",
                            sched.link_count()
                        ))?;
                        writer
                            .write_line(&format!("[WARN: DYNSCHED TSCH  ] Diff= {ticks} ticks"))?;
                    }
                    Err(e) => {
                        warn!("bad schedule command: {e}");
                        writer.write_line(
                            "[ERR: DYNSCHED SER] Error in serial string format",
                        )?;
                    }
                }
            }

            // Idle: emit unrelated chatter the manager must not match.
            None => {
                idle += 1;
                writer.write_line(&format!("[INFO: TSCH ] association ok, asn {idle}"))?;
            }
        }
    }
}
