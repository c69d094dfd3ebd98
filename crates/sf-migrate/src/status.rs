//! Read-only view of applied and pending migrations.

use crate::catalog::MigrationCatalog;
use crate::ledger::LedgerEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sf_core::Version;
use std::fmt;

/// How an applied ledger row relates to the script on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Drift {
    /// Recorded checksum matches the file
    Ok,
    /// Row pre-dates checksumming and cannot be verified
    Legacy,
    /// File changed after it was applied
    Modified { recorded: String, current: String },
    /// File no longer exists in the migrations directory
    Orphaned,
}

impl Drift {
    fn marker(&self) -> Option<&'static str> {
        match self {
            Drift::Ok => None,
            Drift::Legacy => Some("legacy, no checksum"),
            Drift::Modified { .. } => Some("MODIFIED since applied"),
            Drift::Orphaned => Some("ORPHANED, file missing"),
        }
    }
}

/// An applied version as seen by `status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedStatus {
    pub version: String,
    pub executed_at: DateTime<Utc>,
    pub checksum: String,
    pub drift: Drift,
}

/// A script not yet recorded in the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingStatus {
    pub version: Version,
    pub filename: String,
    pub has_down: bool,
}

/// Applied rows with drift state plus pending scripts, both ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub applied: Vec<AppliedStatus>,
    pub pending: Vec<PendingStatus>,
}

impl StatusReport {
    /// Join ledger rows against the catalog
    pub fn build(catalog: &MigrationCatalog, entries: &[LedgerEntry]) -> Self {
        let applied = entries
            .iter()
            .map(|entry| {
                let drift = match catalog.get(&entry.version) {
                    None => Drift::Orphaned,
                    Some(_) if entry.is_legacy() => Drift::Legacy,
                    Some(script) if script.checksum != entry.checksum => Drift::Modified {
                        recorded: entry.checksum.clone(),
                        current: script.checksum.clone(),
                    },
                    Some(_) => Drift::Ok,
                };
                AppliedStatus {
                    version: entry.version.clone(),
                    executed_at: entry.executed_at,
                    checksum: entry.checksum.clone(),
                    drift,
                }
            })
            .collect::<Vec<_>>();

        let pending = catalog
            .scripts()
            .iter()
            .filter(|script| !entries.iter().any(|e| e.version == script.version.as_str()))
            .map(|script| PendingStatus {
                version: script.version.clone(),
                filename: script.filename.clone(),
                has_down: script.has_down(),
            })
            .collect();

        Self { applied, pending }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether any applied row is modified or orphaned
    pub fn has_drift(&self) -> bool {
        self.applied
            .iter()
            .any(|a| matches!(a.drift, Drift::Modified { .. } | Drift::Orphaned))
    }

    /// Human-readable status listing
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str("Migration Status:\n");
        out.push_str("================\n");

        if self.applied.is_empty() {
            out.push_str("No migrations have been executed yet.\n");
        } else {
            out.push_str(&format!("Executed migrations ({}):\n", self.applied.len()));
            for a in &self.applied {
                let at = a.executed_at.format("%Y-%m-%d %H:%M:%S");
                match a.drift.marker() {
                    Some(marker) => {
                        out.push_str(&format!("  ✓ {}  {}  [{}]\n", a.version, at, marker))
                    }
                    None => out.push_str(&format!("  ✓ {}  {}\n", a.version, at)),
                }
            }
        }

        if self.pending.is_empty() {
            out.push_str("\nAll migrations are up to date!\n");
        } else {
            out.push_str(&format!("\nPending migrations ({}):\n", self.pending.len()));
            for p in &self.pending {
                let down = if p.has_down { "" } else { "  [no down script]" };
                out.push_str(&format!("  ○ {} ({}){}\n", p.version, p.filename, down));
            }
        }

        out.push_str("================\n");
        out
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_table())
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
