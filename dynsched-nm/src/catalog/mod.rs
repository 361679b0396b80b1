//! The schedule catalog: the fixed set of selectable schedules.
//!
//! The catalog is built once at startup and never mutated.  By default it
//! holds the six built-in network schedules; an operator can substitute
//! their own set with a YAML file:
//!
//! ```yaml
//! schedules:
//!   - name: "round-robin"
//!     links:
//!       - { timeslot: 0, channel_offset: 0, option: tx, node_id: 1 }
//!       - { timeslot: 1, channel_offset: 0, option: tx, node_id: 2 }
//! ```
//!
//! Selection indices exposed to the operator are 1-based and follow file /
//! definition order.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::schedule::{has_duplicate_timeslot, Link, LinkOption, Schedule};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private – callers work with [`Catalog`] instead.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    schedules: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
struct ScheduleEntry {
    /// Optional label, used only in load-time logging.
    name: Option<String>,
    links: Vec<LinkEntry>,
}

#[derive(Debug, Deserialize)]
struct LinkEntry {
    timeslot: u16,
    channel_offset: u16,
    option: LinkOption,
    node_id: u16,
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Process-wide, read-only, ordered collection of candidate schedules.
#[derive(Debug, Clone)]
pub struct Catalog {
    schedules: Vec<Schedule>,
}

impl Catalog {
    /// The built-in catalog: six TX slot assignments over channel offset 0
    /// for a four-node network (node 1 is the coordinator).
    ///
    /// Entries 1–3 are four-link permutations, entries 4–6 are three-link
    /// reductions.  This order defines the operator's selection indices.
    pub fn builtin() -> Self {
        let defs: &[&[(u16, u16, LinkOption, u16)]] = &[
            &[
                (0, 0, LinkOption::Tx, 1),
                (1, 0, LinkOption::Tx, 2),
                (2, 0, LinkOption::Tx, 3),
                (3, 0, LinkOption::Tx, 4),
            ],
            &[
                (0, 0, LinkOption::Tx, 1),
                (1, 0, LinkOption::Tx, 3),
                (2, 0, LinkOption::Tx, 2),
                (3, 0, LinkOption::Tx, 4),
            ],
            &[
                (0, 0, LinkOption::Tx, 1),
                (1, 0, LinkOption::Tx, 4),
                (2, 0, LinkOption::Tx, 2),
                (3, 0, LinkOption::Tx, 3),
            ],
            &[
                (0, 0, LinkOption::Tx, 1),
                (1, 0, LinkOption::Tx, 2),
                (2, 0, LinkOption::Tx, 4),
            ],
            &[
                (0, 0, LinkOption::Tx, 1),
                (1, 0, LinkOption::Tx, 3),
                (2, 0, LinkOption::Tx, 4),
            ],
            &[
                (0, 0, LinkOption::Tx, 2),
                (1, 0, LinkOption::Tx, 3),
                (2, 0, LinkOption::Tx, 1),
            ],
        ];

        let schedules = defs
            .iter()
            .map(|links| {
                Schedule::from_links(
                    links
                        .iter()
                        .map(|&(ts, choff, opt, nid)| Link::new(ts, choff, opt, nid))
                        .collect(),
                )
            })
            .collect();

        Self { schedules }
    }

    /// Load an operator-supplied catalog from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, the catalog is empty, or any schedule violates
    /// the model invariants (duplicate timeslot, zero node id).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading schedule catalog from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open catalog file: {}", path.display()))?;

        let file: CatalogFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if file.schedules.is_empty() {
            bail!("catalog file contains no schedules: {}", path.display());
        }

        let mut schedules = Vec::with_capacity(file.schedules.len());
        for (i, entry) in file.schedules.into_iter().enumerate() {
            let label = entry.name.unwrap_or_else(|| format!("schedule {}", i + 1));

            let links: Vec<Link> = entry
                .links
                .iter()
                .map(|l| Link::new(l.timeslot, l.channel_offset, l.option, l.node_id))
                .collect();

            if links.iter().any(|l| l.node_id == 0) {
                bail!("'{label}': node_id must be positive");
            }
            if has_duplicate_timeslot(&links) {
                bail!("'{label}': duplicate timeslot within one schedule");
            }

            debug!("  {} | {} link(s)", label, links.len());
            schedules.push(Schedule::from_links(links));
        }

        info!("Loaded {} schedule(s)", schedules.len());
        Ok(Self { schedules })
    }

    /// Number of schedules available for selection.
    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Look up a schedule by its 1-based operator choice.
    ///
    /// Returns `None` for `0` and for anything past the end — choice
    /// validation happens in the scheduler loop, this is just the bounds
    /// contract.
    pub fn get(&self, choice: usize) -> Option<&Schedule> {
        if choice == 0 {
            return None;
        }
        self.schedules.get(choice - 1)
    }

    /// All schedules in selection order.
    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
