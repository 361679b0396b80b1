/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core schedule data structures for the TSCH network manager.
//!
//! Two types model one TSCH scheduling table:
//!
//! ```text
//! catalog definition ──►  Link (one slot assignment)  ──►  Schedule (ordered table)
//!                                                            │
//!                                                            ▼
//!                                                    wire::format_schedule()
//! ```
//!
//! # Ownership model
//! `Link`s and `Schedule`s are built once at catalog construction and are
//! immutable for the process lifetime.  The [`Catalog`](crate::catalog::Catalog)
//! owns them; the scheduler loop only ever borrows a `&Schedule` per lookup,
//! so serializing the same choice twice is guaranteed to read identical data.

use serde::Deserialize;

// ── Link option ───────────────────────────────────────────────────────────────

/// Direction of a TSCH link.
///
/// Encoded on the wire as `1` (TX) / `2` (RX).  Carrying the typed enum
/// through the pipeline (instead of a raw integer) makes it impossible to
/// build a link with an undefined direction; the conversion to an integer
/// only happens at the coordinator wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOption {
    /// The node owning the slot transmits.
    Tx,
    /// The node owning the slot listens.
    Rx,
}

impl LinkOption {
    /// Convert to the integer value the coordinator's command parser expects.
    pub fn to_wire_int(self) -> u8 {
        match self {
            LinkOption::Tx => 1,
            LinkOption::Rx => 2,
        }
    }

    /// Parse from the wire integer.  Returns `None` for undefined values —
    /// the caller decides whether that is a hard error (it is, in
    /// [`wire::parse_schedule`](crate::wire::parse_schedule)).
    pub fn from_wire_int(v: u8) -> Option<Self> {
        match v {
            1 => Some(LinkOption::Tx),
            2 => Some(LinkOption::Rx),
            _ => None,
        }
    }
}

impl std::fmt::Display for LinkOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkOption::Tx => write!(f, "TX"),
            LinkOption::Rx => write!(f, "RX"),
        }
    }
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// One timeslot/channel-offset assignment within a schedule.
///
/// A plain immutable value: no cross-field invariant exists on a single link.
/// Timeslot uniqueness is a property of the owning [`Schedule`], not of the
/// link itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Slot index within the slotframe.
    pub timeslot: u16,

    /// Channel offset used for hopping in this slot.
    pub channel_offset: u16,

    /// TX / RX direction of the slot.
    pub option: LinkOption,

    /// Identifier of the participating node (positive; node 1 is
    /// conventionally the coordinator).
    pub node_id: u16,
}

impl Link {
    /// Build a link value.
    ///
    /// No validation beyond the field types — link values originate from
    /// fixed catalog literals or from an already-validated catalog file.
    pub fn new(timeslot: u16, channel_offset: u16, option: LinkOption, node_id: u16) -> Self {
        Self {
            timeslot,
            channel_offset,
            option,
            node_id,
        }
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// One complete TSCH scheduling table: an ordered sequence of [`Link`]s.
///
/// Link order is significant — it determines serialization order and is
/// preserved exactly as defined in the catalog.  The link count is derived
/// from the sequence length, so the two can never disagree.
///
/// Zero-link schedules are legal but degenerate (they serialize to `N0 `).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    links: Vec<Link>,
}

impl Schedule {
    /// Build a schedule from links, preserving their order.
    ///
    /// Timeslot uniqueness within the schedule is an invariant of the data
    /// model; it is asserted in debug builds here and validated with a real
    /// error when the links come from an operator-supplied catalog file.
    pub fn from_links(links: Vec<Link>) -> Self {
        debug_assert!(
            !has_duplicate_timeslot(&links),
            "schedule contains a duplicate timeslot"
        );
        Self { links }
    }

    /// Number of links in the schedule.  Always equals `self.links().len()`.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The links in catalog-definition order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

/// Returns `true` if two links share a timeslot.
///
/// O(n²), fine for slotframe-sized inputs (a handful of links).
pub(crate) fn has_duplicate_timeslot(links: &[Link]) -> bool {
    links
        .iter()
        .enumerate()
        .any(|(i, a)| links[i + 1..].iter().any(|b| a.timeslot == b.timeslot))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
