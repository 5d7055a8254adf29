// src/sources/bulk.rs - Precomputed per-cycle contribution snapshots
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::core::ContributionRecord;

/// One versioned snapshot file: all contributions routed through one
/// collector during one two-year cycle, plus the snapshot's own
/// last-updated stamp. Files are append-only upstream; this store only
/// reads them.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub collector_id: String,
    /// Even year closing the two-year window.
    pub cycle: i32,
    pub last_updated: DateTime<Utc>,
    pub records: Vec<ContributionRecord>,
}

/// The election cycle a date falls in (cycles close on even years).
pub fn cycle_for_year(year: i32) -> i32 {
    if year % 2 == 0 {
        year
    } else {
        year + 1
    }
}

pub struct BulkSnapshotStore {
    dir: PathBuf,
}

pub struct BulkLoad {
    pub records: Vec<ContributionRecord>,
    pub coverage_years: Vec<i32>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BulkSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self, collector_id: &str, cycle: i32) -> PathBuf {
        self.dir.join(format!("{collector_id}_{cycle}.json"))
    }

    /// Load every completed-cycle snapshot for a collector. The cycle
    /// still in progress at `as_of` is excluded even when a file for
    /// it exists; its data is served by the live path with an explicit
    /// coverage disclosure instead. Returns `None` when no snapshot at
    /// all exists for the collector.
    pub fn load_collector(
        &self,
        collector_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<BulkLoad>> {
        let in_progress = cycle_for_year(as_of.year());
        let mut records = Vec::new();
        let mut coverage_years = Vec::new();
        let mut last_updated: Option<DateTime<Utc>> = None;

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Bulk: snapshot directory {} unreadable: {}", self.dir.display(), e);
                return Ok(None);
            }
        };

        let prefix = format!("{collector_id}_");
        let mut cycles: Vec<i32> = Vec::new();
        for entry in entries {
            let entry = entry.context("Bulk: failed reading snapshot directory entry")?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else { continue };
            let Some(cycle_str) = rest.strip_suffix(".json") else { continue };
            let Ok(cycle) = cycle_str.parse::<i32>() else { continue };
            cycles.push(cycle);
        }
        cycles.sort_unstable();

        for cycle in cycles {
            if cycle >= in_progress {
                debug!(
                    "Bulk: skipping in-progress cycle {} snapshot for {}",
                    cycle, collector_id
                );
                continue;
            }
            let path = self.snapshot_path(collector_id, cycle);
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Bulk: failed to read {}", path.display()))?;
            let snapshot: SnapshotFile = serde_json::from_str(&raw)
                .with_context(|| format!("Bulk: malformed snapshot {}", path.display()))?;

            let wellformed = snapshot
                .records
                .into_iter()
                .filter(ContributionRecord::is_wellformed);
            records.extend(wellformed);
            coverage_years.push(snapshot.cycle);
            last_updated = match (last_updated, Some(snapshot.last_updated)) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }

        if coverage_years.is_empty() {
            return Ok(None);
        }
        Ok(Some(BulkLoad {
            records,
            coverage_years,
            last_updated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{Location, Provenance};
    use chrono::TimeZone;

    fn record(record_id: &str) -> ContributionRecord {
        ContributionRecord {
            contributor_name: "MOSHE STERN".to_string(),
            amount: 100.0,
            date: None,
            collector_id: "C00401224".to_string(),
            collector_name: "ACTBLUE".to_string(),
            location: Location::default(),
            recipient_candidate: None,
            earmark_markers: None,
            provenance: Provenance {
                record_id: record_id.to_string(),
                source_document_ref: None,
            },
        }
    }

    fn write_snapshot(dir: &std::path::Path, collector: &str, cycle: i32, records: Vec<ContributionRecord>) {
        let snapshot = SnapshotFile {
            collector_id: collector.to_string(),
            cycle,
            last_updated: Utc.with_ymd_and_hms(cycle, 1, 15, 0, 0, 0).unwrap(),
            records,
        };
        std::fs::write(
            dir.join(format!("{collector}_{cycle}.json")),
            serde_json::to_string(&snapshot).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn loads_completed_cycles_and_reports_coverage() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "C00401224", 2020, vec![record("A")]);
        write_snapshot(dir.path(), "C00401224", 2022, vec![record("B"), record("C")]);

        let store = BulkSnapshotStore::new(dir.path());
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let load = store.load_collector("C00401224", as_of).unwrap().unwrap();
        assert_eq!(load.coverage_years, vec![2020, 2022]);
        assert_eq!(load.records.len(), 3);
        assert!(load.last_updated.is_some());
    }

    #[test]
    fn in_progress_cycle_is_excluded_even_when_present() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "C00401224", 2022, vec![record("A")]);
        write_snapshot(dir.path(), "C00401224", 2024, vec![record("B")]);

        let store = BulkSnapshotStore::new(dir.path());
        // mid-2024: the 2024 cycle is still in progress
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let load = store.load_collector("C00401224", as_of).unwrap().unwrap();
        assert_eq!(load.coverage_years, vec![2022]);
        assert_eq!(load.records.len(), 1);
    }

    #[test]
    fn missing_collector_returns_none_not_empty_success() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "C00401224", 2022, vec![record("A")]);

        let store = BulkSnapshotStore::new(dir.path());
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(store.load_collector("C00694323", as_of).unwrap().is_none());
    }

    #[test]
    fn odd_year_maps_to_following_cycle() {
        assert_eq!(cycle_for_year(2023), 2024);
        assert_eq!(cycle_for_year(2024), 2024);
    }

    #[test]
    fn malformed_records_are_dropped_at_the_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = record("D");
        bad.contributor_name = String::new();
        write_snapshot(dir.path(), "C00401224", 2022, vec![record("A"), bad]);

        let store = BulkSnapshotStore::new(dir.path());
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let load = store.load_collector("C00401224", as_of).unwrap().unwrap();
        assert_eq!(load.records.len(), 1);
    }
}
