/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Extraction of scheduling-latency measurements from the device log stream.
//!
//! The coordinator's log output is a free-text diagnostic stream; the only
//! lines that carry a measurable value are the dynamic-scheduling warnings
//! the firmware prints after applying a schedule:
//!
//! ```text
//! [WARN: DYNSCHED TSCH  ] Diff= 37 ticks
//! ```
//!
//! The grammar is fixed: the line must *begin* with `[WARN: DYNSCHED`, then
//! anything, then `Diff= `, then the captured token, then ` ticks`.  The
//! capture is kept as raw text rather than coerced to a number — the device
//! representation is not guaranteed to be a clean integer, and coercing here
//! would silently swallow malformed output instead of surfacing it.

use std::sync::LazyLock;

use regex::Regex;

// The pattern is compile-time constant, so the expect can never fire.
#[allow(clippy::expect_used)]
static DIFF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[WARN: DYNSCHED .* Diff= (.+?) ticks")
        .expect("constant regex pattern is valid")
});

/// Extract the latency token from one line of device output.
///
/// Returns the raw captured substring for a matching line, `None` otherwise.
/// Non-matching lines are the common case and are not an error.
pub fn extract_diff_ticks(line: &str) -> Option<&str> {
    DIFF_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
