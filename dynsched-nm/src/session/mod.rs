/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The interactive session: two concurrent loops over one serial device.
//!
//! ```text
//! operator ──► scheduler loop ──► wire::format_schedule ──► transport write
//!                                                              (sole writer)
//! device log ──► transport read ──► logwatch matcher ──► measurements
//!  (sole reader)
//! ```
//!
//! The loops are independent except for one shared [`ShutdownFlag`],
//! observed cooperatively at the top of each iteration.  There is no data
//! handoff between them — a transmitted schedule and the measurements that
//! follow are causally related only through the external device.
//!
//! All session state lives in [`Session`], constructed once in `main` and
//! passed by reference to both loops.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::logwatch::extract_diff_ticks;
use crate::transport::{ReadLine, TransportError, WriteLine};
use crate::wire;

// ── Shutdown flag ─────────────────────────────────────────────────────────────

/// Shared cancellation signal for the two session loops.
///
/// Transitions exactly once from unset to set (there is no reset during a
/// run).  Either loop may request shutdown; both observe it once per
/// iteration, so termination is cooperative, not preemptive.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.  Monotonic — requesting twice is harmless.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// State shared by the scheduler and log loops: the read-only catalog and
/// the shutdown flag.
#[derive(Debug)]
pub struct Session {
    catalog: Catalog,
    shutdown: ShutdownFlag,
}

impl Session {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            shutdown: ShutdownFlag::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn shutdown(&self) -> &ShutdownFlag {
        &self.shutdown
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failures that end the scheduler loop involuntarily.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading the operator's choice or printing the catalog failed.
    #[error("operator console error: {0}")]
    Console(#[from] io::Error),

    /// The serial channel failed; the session cannot continue.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ── Choice validation ─────────────────────────────────────────────────────────

/// Outcome of validating one line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// A valid 1-based catalog index.
    Selected(usize),

    /// The explicit quit gesture (`q` / `quit`).
    Quit,

    /// An integer outside `[1, catalog_len]` — rejected, loop continues.
    OutOfRange(i64),

    /// Neither an integer nor a quit command — rejected, loop continues.
    Malformed,
}

/// Validate one line of operator input against a catalog of `catalog_len`
/// schedules.
///
/// Quitting is an explicit command, not a side effect of a typo: `q` and
/// `quit` (any case, surrounding whitespace ignored) stop the session, while
/// any other malformed input is merely rejected.
pub fn parse_choice(raw: &str, catalog_len: usize) -> Choice {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
        return Choice::Quit;
    }

    match trimmed.parse::<i64>() {
        Ok(n) if n >= 1 && (n as usize) <= catalog_len => Choice::Selected(n as usize),
        Ok(n) => Choice::OutOfRange(n),
        Err(_) => Choice::Malformed,
    }
}

// ── Catalog presentation ──────────────────────────────────────────────────────

/// Print the fully-enumerated catalog with its 1-based choice indices.
pub fn print_catalog<W: Write>(out: &mut W, catalog: &Catalog) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "*************** Choice of schedules ***************")?;
    for (i, sched) in catalog.schedules().iter().enumerate() {
        writeln!(out, "Choice {}: {} link(s)", i + 1, sched.link_count())?;
        for (j, link) in sched.links().iter().enumerate() {
            writeln!(
                out,
                "  Link {}:  timeslot:{}  choff:{}  option:{}  node:{}",
                j, link.timeslot, link.channel_offset, link.option, link.node_id
            )?;
        }
    }
    writeln!(out, "***************************************************")?;
    Ok(())
}

// ── Scheduler loop ────────────────────────────────────────────────────────────

/// Interactive control task: present the catalog, accept a choice, serialize
/// and transmit.
///
/// States: AwaitingChoice → Validating → Transmitting → AwaitingChoice, with
/// `Stopped` reached through the quit gesture, end of operator input, or a
/// fatal transport error.  Rejected input (out-of-range or malformed)
/// returns to AwaitingChoice without transmitting and without stopping.
///
/// Command delivery is fire-and-forget: no acknowledgment is awaited before
/// the next prompt.
///
/// # Errors
/// A transport write failure is fatal — it requests shutdown (terminating
/// the log loop as well) and is propagated to the caller.
pub fn run_scheduler_loop<R, W, T>(
    session: &Session,
    mut input: R,
    mut output: W,
    transport: &mut T,
) -> Result<(), SessionError>
where
    R: BufRead,
    W: Write,
    T: WriteLine + ?Sized,
{
    let catalog = session.catalog();
    let shutdown = session.shutdown();

    loop {
        // The log loop may have requested shutdown (fatal read error).
        if shutdown.is_requested() {
            break;
        }

        print_catalog(&mut output, catalog)?;
        write!(
            output,
            "Enter a schedule choice (1-{}), or 'q' to quit: ",
            catalog.len()
        )?;
        output.flush()?;

        let mut raw = String::new();
        if input.read_line(&mut raw)? == 0 {
            // End of operator input counts as the quit gesture.
            info!("operator input closed, stopping scheduler loop");
            shutdown.request();
            break;
        }

        match parse_choice(&raw, catalog.len()) {
            Choice::Selected(choice) => {
                let Some(sched) = catalog.get(choice) else {
                    // Unreachable for a validated choice; bounds enforced twice.
                    continue;
                };
                let command = wire::format_schedule(sched);
                info!(choice, command = %command, "transmitting schedule");
                writeln!(output, "Transmitting choice {choice}: {command}")?;

                if let Err(e) = transport.write_line(&command) {
                    // A dead channel ends the whole session, reader included.
                    error!("schedule transmission failed: {e}");
                    shutdown.request();
                    return Err(e.into());
                }
            }

            Choice::Quit => {
                info!("quit requested, stopping scheduler loop");
                shutdown.request();
                break;
            }

            Choice::OutOfRange(value) => {
                warn!(value, catalog_len = catalog.len(), "choice out of range");
                writeln!(
                    output,
                    "!! enter a choice between 1 and {} !!",
                    catalog.len()
                )?;
            }

            Choice::Malformed => {
                warn!(input = raw.trim(), "input is not a choice");
                writeln!(
                    output,
                    "!! enter a choice between 1 and {}, or 'q' to quit !!",
                    catalog.len()
                )?;
            }
        }
    }

    Ok(())
}

// ── Log loop ──────────────────────────────────────────────────────────────────

/// Observer task: consume the device log stream and accumulate latency
/// measurements.
///
/// Runs until the shutdown flag is observed, checked once per read
/// iteration.  A read timeout is "no line this iteration", not an error.
/// Measurements are appended in arrival order; repeated identical values are
/// all kept.  Returns the accumulated sequence — the task's result.
pub fn run_log_loop<T>(shutdown: &ShutdownFlag, transport: &mut T) -> Vec<String>
where
    T: ReadLine + ?Sized,
{
    let mut measurements = Vec::new();

    while !shutdown.is_requested() {
        match transport.read_line() {
            Ok(Some(line)) => {
                debug!(line = %line, "device log line");
                if let Some(token) = extract_diff_ticks(&line) {
                    info!(diff_ticks = token, "schedule application latency");
                    measurements.push(token.to_string());
                }
            }

            // Timeout: nothing arrived, re-check the flag and retry.
            Ok(None) => {}

            Err(e) => {
                error!("log channel failed: {e}");
                shutdown.request();
                break;
            }
        }
    }

    info!(count = measurements.len(), "log loop finished");
    measurements
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // ── test doubles ──────────────────────────────────────────────────────────

    /// Records every line written; optionally fails on the nth write.
    struct RecordingWriter {
        lines: Vec<String>,
        fail_on: Option<usize>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                lines: Vec::new(),
                fail_on: None,
            }
        }

        fn failing_on(n: usize) -> Self {
            Self {
                lines: Vec::new(),
                fail_on: Some(n),
            }
        }
    }

    impl WriteLine for RecordingWriter {
        fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
            if self.fail_on == Some(self.lines.len()) {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "port gone",
                )));
            }
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    /// One step of a scripted log stream.
    enum Step {
        Line(&'static str),
        Timeout,
        Fail,
        /// Set the shutdown flag, then report a timeout — models the other
        /// loop quitting while this one is blocked in a timed read.
        RequestShutdown,
    }

    struct ScriptedLog {
        script: Vec<Step>,
        shutdown: ShutdownFlag,
        reads_after_shutdown: usize,
    }

    impl ScriptedLog {
        fn new(mut script: Vec<Step>, shutdown: ShutdownFlag) -> Self {
            script.reverse(); // pop() from the front
            Self {
                script,
                shutdown,
                reads_after_shutdown: 0,
            }
        }
    }

    impl ReadLine for ScriptedLog {
        fn read_line(&mut self) -> Result<Option<String>, TransportError> {
            if self.shutdown.is_requested() {
                self.reads_after_shutdown += 1;
            }
            match self.script.pop() {
                Some(Step::Line(s)) => Ok(Some(s.to_string())),
                Some(Step::Timeout) => Ok(None),
                Some(Step::Fail) => Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "port gone",
                ))),
                Some(Step::RequestShutdown) => {
                    self.shutdown.request();
                    Ok(None)
                }
                None => Ok(None), // endless timeouts
            }
        }
    }

    fn session() -> Session {
        Session::new(Catalog::builtin())
    }

    const CHOICE_1_COMMAND: &str = "N4 L0 0,0,1,1 L1 1,0,1,2 L2 2,0,1,3 L3 3,0,1,4 ";

    // ── parse_choice ──────────────────────────────────────────────────────────

    #[test]
    fn every_catalog_index_is_accepted() {
        for n in 1..=6 {
            assert_eq!(parse_choice(&n.to_string(), 6), Choice::Selected(n));
        }
    }

    #[test]
    fn zero_and_past_end_are_out_of_range() {
        assert_eq!(parse_choice("0", 6), Choice::OutOfRange(0));
        assert_eq!(parse_choice("7", 6), Choice::OutOfRange(7));
        assert_eq!(parse_choice("-3", 6), Choice::OutOfRange(-3));
    }

    #[test]
    fn quit_forms_are_recognised() {
        assert_eq!(parse_choice("q", 6), Choice::Quit);
        assert_eq!(parse_choice("Q", 6), Choice::Quit);
        assert_eq!(parse_choice("quit", 6), Choice::Quit);
        assert_eq!(parse_choice(" QUIT \n", 6), Choice::Quit);
    }

    #[test]
    fn non_integer_input_is_malformed_not_quit() {
        assert_eq!(parse_choice("abc", 6), Choice::Malformed);
        assert_eq!(parse_choice("1.5", 6), Choice::Malformed);
        assert_eq!(parse_choice("", 6), Choice::Malformed);
        assert_eq!(parse_choice("qq", 6), Choice::Malformed);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_choice("  3 \r\n", 6), Choice::Selected(3));
    }

    // ── scheduler loop ────────────────────────────────────────────────────────

    #[test]
    fn valid_choice_transmits_the_exact_command() {
        let session = session();
        let mut transport = RecordingWriter::new();
        let input = Cursor::new("1\nq\n");

        run_scheduler_loop(&session, input, Vec::new(), &mut transport).unwrap();

        assert_eq!(transport.lines, vec![CHOICE_1_COMMAND.to_string()]);
        assert!(session.shutdown().is_requested());
    }

    #[test]
    fn repeated_choice_is_byte_identical() {
        let session = session();
        let mut transport = RecordingWriter::new();
        let input = Cursor::new("1\n1\n1\nq\n");

        run_scheduler_loop(&session, input, Vec::new(), &mut transport).unwrap();

        assert_eq!(transport.lines.len(), 3);
        assert!(transport.lines.iter().all(|l| l == CHOICE_1_COMMAND));
    }

    #[test]
    fn rejected_input_transmits_nothing_and_does_not_stop() {
        let session = session();
        let mut transport = RecordingWriter::new();
        // Out-of-range, malformed, then a real choice: the loop must survive
        // the rejections and still transmit.
        let input = Cursor::new("0\n99\nnonsense\n2\nq\n");

        run_scheduler_loop(&session, input, Vec::new(), &mut transport).unwrap();

        assert_eq!(transport.lines.len(), 1);
        assert!(transport.lines[0].starts_with("N4 "));
    }

    #[test]
    fn end_of_input_quits_and_requests_shutdown() {
        let session = session();
        let mut transport = RecordingWriter::new();
        let input = Cursor::new(""); // immediate EOF

        run_scheduler_loop(&session, input, Vec::new(), &mut transport).unwrap();

        assert!(transport.lines.is_empty());
        assert!(session.shutdown().is_requested());
    }

    #[test]
    fn write_failure_is_fatal_and_requests_shutdown() {
        let session = session();
        let mut transport = RecordingWriter::failing_on(0);
        let input = Cursor::new("1\n");

        let result = run_scheduler_loop(&session, input, Vec::new(), &mut transport);

        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert!(session.shutdown().is_requested());
    }

    #[test]
    fn pre_set_shutdown_stops_the_loop_before_any_prompt() {
        let session = session();
        session.shutdown().request();
        let mut transport = RecordingWriter::new();
        let mut output = Vec::new();
        let input = Cursor::new("1\n");

        run_scheduler_loop(&session, input, &mut output, &mut transport).unwrap();

        assert!(transport.lines.is_empty());
        assert!(output.is_empty(), "no catalog should have been printed");
    }

    #[test]
    fn prompt_enumerates_the_whole_catalog() {
        let session = session();
        let mut transport = RecordingWriter::new();
        let mut output = Vec::new();
        let input = Cursor::new("q\n");

        run_scheduler_loop(&session, input, &mut output, &mut transport).unwrap();

        let text = String::from_utf8(output).unwrap();
        for i in 1..=6 {
            assert!(text.contains(&format!("Choice {i}:")), "missing choice {i}");
        }
    }

    // ── log loop ──────────────────────────────────────────────────────────────

    #[test]
    fn matching_lines_accumulate_in_order() {
        let shutdown = ShutdownFlag::new();
        let mut log = ScriptedLog::new(
            vec![
                Step::Line("[INFO: DYNSCHED SER] Data is N4 ..."),
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 37 ticks"),
                Step::Timeout,
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 12 ticks"),
                Step::RequestShutdown,
            ],
            shutdown.clone(),
        );

        let measurements = run_log_loop(&shutdown, &mut log);

        assert_eq!(measurements, vec!["37".to_string(), "12".to_string()]);
    }

    #[test]
    fn duplicate_measurements_are_all_kept() {
        let shutdown = ShutdownFlag::new();
        let mut log = ScriptedLog::new(
            vec![
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 5 ticks"),
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 5 ticks"),
                Step::RequestShutdown,
            ],
            shutdown.clone(),
        );

        let measurements = run_log_loop(&shutdown, &mut log);

        assert_eq!(measurements, vec!["5".to_string(), "5".to_string()]);
    }

    #[test]
    fn loop_terminates_within_one_iteration_of_shutdown() {
        let shutdown = ShutdownFlag::new();
        let mut log = ScriptedLog::new(vec![Step::RequestShutdown], shutdown.clone());

        run_log_loop(&shutdown, &mut log);

        // After the flag was set during a read, at most zero further reads
        // may happen: the loop re-checks the flag before every read.
        assert_eq!(log.reads_after_shutdown, 0);
    }

    #[test]
    fn timeouts_are_not_errors() {
        let shutdown = ShutdownFlag::new();
        let mut log = ScriptedLog::new(
            vec![
                Step::Timeout,
                Step::Timeout,
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 1 ticks"),
                Step::RequestShutdown,
            ],
            shutdown.clone(),
        );

        let measurements = run_log_loop(&shutdown, &mut log);

        assert_eq!(measurements, vec!["1".to_string()]);
    }

    #[test]
    fn fatal_read_error_ends_the_loop_and_requests_shutdown() {
        let shutdown = ShutdownFlag::new();
        let mut log = ScriptedLog::new(
            vec![
                Step::Line("[WARN: DYNSCHED TSCH  ] Diff= 9 ticks"),
                Step::Fail,
            ],
            shutdown.clone(),
        );

        let measurements = run_log_loop(&shutdown, &mut log);

        assert!(shutdown.is_requested());
        assert_eq!(measurements, vec!["9".to_string()]);
    }
}
