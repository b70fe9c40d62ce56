//! # Satellite element sets
//!
//! A [`SatelliteElementSet`] carries the mean orbital parameters of one satellite at a
//! reference epoch, as delivered by an external catalog. The pipeline only reads the
//! **mean motion** and **eccentricity** directly (regime classification, orbital period);
//! the full element set is handed untouched to the external
//! [`OrbitPropagator`](crate::synthetic::OrbitPropagator).
//!
//! Element sets are immutable for the duration of a run. A new element set for the same
//! satellite is a new value: nothing derived from an older one is cached.
//!
//! ## Two-line element sets
//!
//! [`SatelliteElementSet::from_tle`] extracts the fields the pipeline needs from the
//! fixed-column NORAD two-line format:
//!
//! ```text
//! line 1: cols 3-7 catalog number, cols 19-32 epoch (YYDDD.DDDDDDDD)
//! line 2: cols 27-33 eccentricity (implied leading decimal point), cols 53-63 mean motion
//! ```

use std::collections::HashMap;

use hifitime::{Epoch, Unit};

use crate::constants::SatelliteId;
use crate::trackfill_errors::PipelineError;

/// Mean orbital elements of one satellite at one reference epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteElementSet {
    pub catalog_id: SatelliteId,
    /// Mean motion in revolutions per day
    pub mean_motion: f64,
    pub eccentricity: f64,
    pub reference_epoch: Epoch,
    /// Raw element lines, forwarded verbatim to the propagator
    pub raw_lines: Vec<String>,
}

impl SatelliteElementSet {
    pub fn new(
        catalog_id: SatelliteId,
        mean_motion: f64,
        eccentricity: f64,
        reference_epoch: Epoch,
        raw_lines: Vec<String>,
    ) -> Self {
        SatelliteElementSet {
            catalog_id,
            mean_motion,
            eccentricity,
            reference_epoch,
            raw_lines,
        }
    }

    /// Parse a NORAD two-line element set.
    ///
    /// Arguments
    /// ---------
    /// * `line1`: first TLE line (starts with `1 `)
    /// * `line2`: second TLE line (starts with `2 `)
    ///
    /// Return
    /// ------
    /// * the element set, or [`PipelineError::ElementSetParsing`] when a field is
    ///   missing or malformed
    pub fn from_tle(line1: &str, line2: &str) -> Result<Self, PipelineError> {
        if line1.len() < 32 || !line1.starts_with('1') {
            return Err(PipelineError::ElementSetParsing(format!(
                "invalid first line: {line1}"
            )));
        }
        if line2.len() < 63 || !line2.starts_with('2') {
            return Err(PipelineError::ElementSetParsing(format!(
                "invalid second line: {line2}"
            )));
        }

        let catalog_id = field(line1, 2..7)?
            .parse::<SatelliteId>()
            .map_err(|_| parse_err("catalog number", line1))?;

        let epoch_field = field(line1, 18..32)?;
        let year2 = epoch_field
            .get(0..2)
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(|| parse_err("epoch year", line1))?;
        let day_of_year = epoch_field
            .get(2..)
            .and_then(|d| d.trim().parse::<f64>().ok())
            .ok_or_else(|| parse_err("epoch day", line1))?;
        // NORAD convention: 57-99 → 1957-1999, 00-56 → 2000-2056
        let year = if year2 < 57 { 2000 + year2 } else { 1900 + year2 };
        let reference_epoch =
            Epoch::from_gregorian_utc_at_midnight(year, 1, 1) + Unit::Day * (day_of_year - 1.0);

        let eccentricity = format!("0.{}", field(line2, 26..33)?)
            .parse::<f64>()
            .map_err(|_| parse_err("eccentricity", line2))?;

        let mean_motion = field(line2, 52..63)?
            .parse::<f64>()
            .map_err(|_| parse_err("mean motion", line2))?;

        Ok(SatelliteElementSet {
            catalog_id,
            mean_motion,
            eccentricity,
            reference_epoch,
            raw_lines: vec![line1.to_string(), line2.to_string()],
        })
    }

    /// Orbital period in hours derived from the mean motion.
    pub fn period_hours(&self) -> f64 {
        24.0 / self.mean_motion
    }
}

fn field(line: &str, range: std::ops::Range<usize>) -> Result<&str, PipelineError> {
    line.get(range)
        .map(str::trim)
        .ok_or_else(|| PipelineError::ElementSetParsing(format!("line too short: {line}")))
}

fn parse_err(what: &str, line: &str) -> PipelineError {
    PipelineError::ElementSetParsing(format!("invalid {what} in: {line}"))
}

/// Source of the current element set of each satellite.
pub trait ElementCatalog: Send + Sync {
    fn element_set(&self, satellite_id: SatelliteId) -> Option<SatelliteElementSet>;
}

impl ElementCatalog for HashMap<SatelliteId, SatelliteElementSet> {
    fn element_set(&self, satellite_id: SatelliteId) -> Option<SatelliteElementSet> {
        self.get(&satellite_id).cloned()
    }
}
