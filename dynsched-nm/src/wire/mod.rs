//! Wire protocol for schedule commands.
//!
//! The coordinator accepts one schedule per line in this fixed text format
//! (shown for a four-link schedule):
//!
//! ```text
//! N4 L0 0,0,1,1 L1 1,0,1,2 L2 2,0,1,3 L3 3,0,1,4
//! ```
//!
//! * `N<count>` — literal `N` followed by the decimal link count.
//! * Per link, in schedule order: a token `L<index>` (0-based position)
//!   followed by the comma-joined 4-tuple
//!   `timeslot,channel_offset,link_option,node_id` with no spaces inside the
//!   tuple.
//! * Tokens are space-separated; a trailing space after the final tuple is
//!   part of the canonical output and must be tolerated by consumers.
//! * The CRLF line terminator is appended by the transport write, not here.
//!
//! [`format_schedule`] is the producer side; [`parse_schedule`] is the
//! consumer side, used by round-trip tests and by the coordinator simulator
//! in `test-tools`.

use thiserror::Error;

use crate::schedule::{has_duplicate_timeslot, Link, LinkOption, Schedule};

use std::fmt::Write as _;

// ── Serializer ────────────────────────────────────────────────────────────────

/// Serialize a schedule into the coordinator's command string.
///
/// Deterministic, pure and total: a well-formed [`Schedule`] always
/// serializes, and equal schedules always produce byte-identical output.
pub fn format_schedule(schedule: &Schedule) -> String {
    let mut out = String::new();
    // Infallible: writing to a String cannot fail.
    let _ = write!(out, "N{} ", schedule.link_count());
    for (index, link) in schedule.links().iter().enumerate() {
        let _ = write!(
            out,
            "L{} {},{},{},{} ",
            index,
            link.timeslot,
            link.channel_offset,
            link.option.to_wire_int(),
            link.node_id,
        );
    }
    out
}

// ── Parse errors ──────────────────────────────────────────────────────────────

/// Why a schedule command line could not be parsed.
///
/// Every variant carries the offending token or values so the caller can log
/// a useful diagnostic without re-scanning the input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The line does not start with an `N<count>` token.
    #[error("command does not start with an N<count> token: '{0}'")]
    MissingCountPrefix(String),

    /// A numeric field could not be parsed.
    #[error("invalid number '{token}' in field {field}")]
    InvalidNumber { field: &'static str, token: String },

    /// A link token was expected (`L<index>`) but something else was found.
    #[error("expected link token L{expected_index}, found '{found}'")]
    BadLinkToken {
        expected_index: usize,
        found: String,
    },

    /// A 4-tuple had the wrong number of comma-separated fields.
    #[error("link {index} tuple has {found} fields, expected 4")]
    BadTupleArity { index: usize, found: usize },

    /// The link option integer is neither 1 (TX) nor 2 (RX).
    #[error("link {index} has undefined link option {value}")]
    UndefinedLinkOption { index: usize, value: u8 },

    /// Fewer link tokens were present than the `N<count>` prefix declared.
    #[error("command declares {declared} links but only {found} were present")]
    LinkCountMismatch { declared: usize, found: usize },

    /// Two links in the command share a timeslot.
    #[error("command contains a duplicate timeslot")]
    DuplicateTimeslot,
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Parse a schedule command line back into a [`Schedule`].
///
/// Accepts exactly the output of [`format_schedule`], with or without the
/// trailing space, and with any CR/LF already stripped by the transport.
/// Surplus tokens after the declared link count are ignored, matching the
/// lenient fixed-offset scan the coordinator firmware performs.
pub fn parse_schedule(line: &str) -> Result<Schedule, WireError> {
    let mut tokens = line.split_whitespace();

    let prefix = tokens
        .next()
        .ok_or_else(|| WireError::MissingCountPrefix(line.to_string()))?;
    let count_str = prefix
        .strip_prefix('N')
        .ok_or_else(|| WireError::MissingCountPrefix(prefix.to_string()))?;
    let declared: usize = count_str.parse().map_err(|_| WireError::InvalidNumber {
        field: "link count",
        token: count_str.to_string(),
    })?;

    let mut links = Vec::with_capacity(declared.min(16));
    for index in 0..declared {
        let label = tokens.next().ok_or(WireError::LinkCountMismatch {
            declared,
            found: index,
        })?;
        if label != format!("L{index}") {
            return Err(WireError::BadLinkToken {
                expected_index: index,
                found: label.to_string(),
            });
        }

        let tuple = tokens.next().ok_or(WireError::LinkCountMismatch {
            declared,
            found: index,
        })?;
        links.push(parse_link_tuple(index, tuple)?);
    }

    if has_duplicate_timeslot(&links) {
        return Err(WireError::DuplicateTimeslot);
    }

    Ok(Schedule::from_links(links))
}

/// Parse one `ts,choff,opt,nid` tuple.
fn parse_link_tuple(index: usize, tuple: &str) -> Result<Link, WireError> {
    let fields: Vec<&str> = tuple.split(',').collect();
    if fields.len() != 4 {
        return Err(WireError::BadTupleArity {
            index,
            found: fields.len(),
        });
    }

    let timeslot = parse_field(fields[0], "timeslot")?;
    let channel_offset = parse_field(fields[1], "channel offset")?;
    let option_int: u8 = parse_field(fields[2], "link option")?;
    let node_id = parse_field(fields[3], "node id")?;

    let option = LinkOption::from_wire_int(option_int).ok_or(WireError::UndefinedLinkOption {
        index,
        value: option_int,
    })?;

    Ok(Link::new(timeslot, channel_offset, option, node_id))
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &'static str) -> Result<T, WireError> {
    token.parse().map_err(|_| WireError::InvalidNumber {
        field,
        token: token.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
