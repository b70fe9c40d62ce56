//! # Deduplication and validation
//!
//! Turns the raw rows gathered by the orchestrator into clean, typed
//! [`StateVector`]s:
//!
//! 1. **Schema check**: a required column absent from *every* row is fatal.
//! 2. **Row typing**: rows whose required fields are individually missing, null or
//!    unparseable are dropped and counted.
//! 3. **Deduplication**: exact `(satellite id, UTC epoch)` key, the first occurrence in
//!    fetch order wins.
//! 4. **Advisory checks**: implausible distance or speed, or a satellite without an
//!    element set, produce warnings but never drop a record.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{CatalogRow, StateVector, REQUIRED_FIELDS};
use crate::constants::{Kilometer, SatelliteId, EARTH_RADIUS_KM};
use crate::time::epoch_key;
use crate::trackfill_errors::PipelineError;

/// Plausible geocentric distance band, km.
pub const DISTANCE_RANGE_KM: (Kilometer, Kilometer) = (EARTH_RADIUS_KM, 100_000.0);
/// Plausible speed band, km/s.
pub const SPEED_RANGE_KM_S: (f64, f64) = (0.5, 12.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DistanceOutOfRange,
    SpeedOutOfRange,
    MissingElementSet,
}

/// Non-blocking anomaly, aggregated per satellite and kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub satellite_id: SatelliteId,
    pub kind: WarningKind,
    /// Number of records concerned
    pub records: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub duplicates_removed: usize,
    pub output_records: usize,
    pub warnings: Vec<ValidationWarning>,
}

/// Fail when a required column appears in no row at all.
///
/// An empty row set passes: there is nothing to check.
pub fn validate_schema(rows: &[CatalogRow]) -> Result<(), PipelineError> {
    if rows.is_empty() {
        return Ok(());
    }
    match REQUIRED_FIELDS
        .iter()
        .find(|field| rows.iter().all(|row| !row.contains_key(**field)))
    {
        Some(field) => Err(PipelineError::MissingSchemaField(field.to_string())),
        None => Ok(()),
    }
}

/// Type every row, dropping the unusable ones.
///
/// Return
/// ------
/// * the typed records in row order, and the number of dropped rows
pub fn parse_rows(rows: &[CatalogRow]) -> (Vec<StateVector>, usize) {
    let mut dropped = 0;
    let vectors = rows
        .iter()
        .filter_map(|row| match StateVector::try_from_row(row) {
            Ok(sv) => Some(sv),
            Err(err) => {
                debug!(error = %err, "catalog row dropped");
                dropped += 1;
                None
            }
        })
        .collect();
    (vectors, dropped)
}

/// Remove exact `(satellite id, UTC epoch)` duplicates, keeping the first occurrence.
///
/// Applying it to its own output is a no-op.
///
/// Return
/// ------
/// * the unique records in input order, and the number of removed duplicates
pub fn deduplicate(vectors: Vec<StateVector>) -> (Vec<StateVector>, usize) {
    let before = vectors.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<StateVector> = vectors
        .into_iter()
        .filter(|sv| seen.insert((sv.satellite_id, epoch_key(&sv.epoch))))
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

/// Advisory plausibility checks.
///
/// Arguments
/// ---------
/// * `vectors`: deduplicated records
/// * `satellites`: every satellite of the run
/// * `has_elements`: whether an element set is known for a satellite
pub fn advisory_checks(
    vectors: &[StateVector],
    satellites: &[SatelliteId],
    has_elements: impl Fn(SatelliteId) -> bool,
) -> Vec<ValidationWarning> {
    let mut counts: BTreeMap<(SatelliteId, WarningKind), usize> = BTreeMap::new();

    for sv in vectors {
        let distance = sv.distance();
        if distance < DISTANCE_RANGE_KM.0 || distance > DISTANCE_RANGE_KM.1 {
            *counts
                .entry((sv.satellite_id, WarningKind::DistanceOutOfRange))
                .or_default() += 1;
        }
        let speed = sv.speed();
        if speed < SPEED_RANGE_KM_S.0 || speed > SPEED_RANGE_KM_S.1 {
            *counts
                .entry((sv.satellite_id, WarningKind::SpeedOutOfRange))
                .or_default() += 1;
        }
    }

    let records_by_sat = vectors.iter().counts_by(|sv| sv.satellite_id);
    for id in satellites.iter().unique() {
        if !has_elements(*id) {
            counts.insert(
                (*id, WarningKind::MissingElementSet),
                records_by_sat.get(id).copied().unwrap_or(0),
            );
        }
    }

    counts
        .into_iter()
        .map(|((satellite_id, kind), records)| {
            let message = match kind {
                WarningKind::DistanceOutOfRange => format!(
                    "{records} record(s) with geocentric distance outside [{}, {}] km",
                    DISTANCE_RANGE_KM.0, DISTANCE_RANGE_KM.1
                ),
                WarningKind::SpeedOutOfRange => format!(
                    "{records} record(s) with speed outside [{}, {}] km/s",
                    SPEED_RANGE_KM_S.0, SPEED_RANGE_KM_S.1
                ),
                WarningKind::MissingElementSet => "no element set available".to_string(),
            };
            warn!(satellite_id, ?kind, records, "{message}");
            ValidationWarning {
                satellite_id,
                kind,
                records,
                message,
            }
        })
        .collect()
}

/// Full validation stage: schema, typing, deduplication and advisory checks.
///
/// Rows that fail typing are dropped before deduplication, so the first *valid*
/// occurrence of a `(satellite, epoch)` key is the one kept.
pub fn validate(
    rows: &[CatalogRow],
    satellites: &[SatelliteId],
    has_elements: impl Fn(SatelliteId) -> bool,
) -> Result<(Vec<StateVector>, ValidationReport), PipelineError> {
    validate_schema(rows)?;

    let (vectors, dropped_rows) = parse_rows(rows);
    let (vectors, duplicates_removed) = deduplicate(vectors);
    let warnings = advisory_checks(&vectors, satellites, has_elements);

    let report = ValidationReport {
        input_rows: rows.len(),
        dropped_rows,
        duplicates_removed,
        output_records: vectors.len(),
        warnings,
    };
    Ok((vectors, report))
}

#[cfg(test)]
mod validation_test {
    use super::*;
    use serde_json::{json, Value};

    fn row(sat: u32, minute: u32, x: f64) -> CatalogRow {
        let value = json!({
            "satNo": sat,
            "epoch": format!("2024-01-01T{:02}:{:02}:00.000000Z", minute / 60, minute % 60),
            "xpos": x, "ypos": 0.0, "zpos": 0.0,
            "xvel": 0.0, "yvel": 3.07, "zvel": 0.0,
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_schema_field_absent_everywhere() {
        let mut rows = vec![row(1, 0, 42164.0), row(1, 1, 42164.0)];
        for r in &mut rows {
            r.remove("zvel");
        }
        assert_eq!(
            validate_schema(&rows),
            Err(PipelineError::MissingSchemaField("zvel".into()))
        );
    }

    #[test]
    fn test_schema_field_absent_in_some_rows_only() {
        let mut rows = vec![row(1, 0, 42164.0), row(1, 1, 42164.0)];
        rows[1].remove("zvel");
        assert!(validate_schema(&rows).is_ok());

        let (vectors, dropped) = parse_rows(&rows);
        assert_eq!(vectors.len(), 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_dedup_95_to_93() {
        let mut rows: Vec<CatalogRow> = (0..93).map(|m| row(1 + m % 2, m, 42164.0)).collect();
        rows.push(row(1, 10, 40000.0));
        rows.push(row(2, 11, 40000.0));
        assert_eq!(rows.len(), 95);

        let (vectors, report) = validate(&rows, &[1, 2], |_| true).unwrap();
        assert_eq!(vectors.len(), 93);
        assert_eq!(report.duplicates_removed, 2);
        assert_eq!(report.output_records, 93);
        // first occurrence kept
        assert!(vectors.iter().all(|sv| sv.position.x == 42164.0));
    }

    #[test]
    fn test_invalid_first_copy_yields_to_valid_duplicate() {
        let mut broken = row(1, 5, 40000.0);
        broken.insert("xpos".into(), Value::Null);
        let rows = vec![broken, row(1, 5, 42164.0), row(1, 6, 42164.0)];

        let (vectors, report) = validate(&rows, &[1], |_| true).unwrap();
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].position.x, 42164.0);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let rows: Vec<CatalogRow> = (0..20).map(|m| row(1, m / 2, 42164.0)).collect();
        let (vectors, _) = parse_rows(&rows);
        let (once, removed) = deduplicate(vectors);
        assert_eq!(removed, 10);
        let (twice, removed_again) = deduplicate(once.clone());
        assert_eq!(removed_again, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_same_epoch_different_satellites_kept() {
        let rows = vec![row(1, 0, 42164.0), row(2, 0, 42164.0)];
        let (vectors, _) = parse_rows(&rows);
        assert_eq!(deduplicate(vectors).0.len(), 2);
    }

    #[test]
    fn test_advisory_warnings_never_drop() {
        let rows = vec![row(1, 0, 1000.0), row(1, 1, 200_000.0), row(2, 0, 42164.0)];
        let (vectors, report) = validate(&rows, &[1, 2, 3], |id| id != 3).unwrap();
        assert_eq!(vectors.len(), 3);

        let kinds: Vec<(SatelliteId, WarningKind, usize)> = report
            .warnings
            .iter()
            .map(|w| (w.satellite_id, w.kind, w.records))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (1, WarningKind::DistanceOutOfRange, 2),
                (3, WarningKind::MissingElementSet, 0),
            ]
        );
    }
}
