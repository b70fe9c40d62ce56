use hifitime::Epoch;
use nalgebra::Vector3;
use serde_json::Value;

use super::CatalogRow;
use crate::constants::{Kilometer, SatelliteId};
use crate::time::parse_epoch;
use crate::trackfill_errors::PipelineError;

/// Columns every usable catalog row must carry.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "satNo", "epoch", "xpos", "ypos", "zpos", "xvel", "yvel", "zvel",
];

/// Position and velocity of a satellite at one instant, in an Earth-centered
/// inertial frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub satellite_id: SatelliteId,
    pub epoch: Epoch,
    /// Position in km
    pub position: Vector3<f64>,
    /// Velocity in km/s
    pub velocity: Vector3<f64>,
    /// Every non-required column of the source row, kept verbatim
    pub auxiliary: CatalogRow,
}

impl StateVector {
    /// Build a state vector from a raw catalog row.
    ///
    /// Numeric columns are accepted either as JSON numbers or as numeric strings.
    ///
    /// Return
    /// ------
    /// * the typed record, or [`PipelineError::InvalidRow`] naming the first required
    ///   field that is missing, null or unparseable
    pub fn try_from_row(row: &CatalogRow) -> Result<Self, PipelineError> {
        let satellite_id = number_field(row, "satNo").and_then(|id| {
            if id.fract() == 0.0 && id >= 0.0 && id <= SatelliteId::MAX as f64 {
                Ok(id as SatelliteId)
            } else {
                Err(PipelineError::InvalidRow(format!("satNo: {id}")))
            }
        })?;

        let epoch = match row.get("epoch") {
            Some(Value::String(raw)) => parse_epoch(raw)
                .map_err(|_| PipelineError::InvalidRow(format!("epoch: {raw}")))?,
            _ => return Err(missing("epoch")),
        };

        let position = Vector3::new(
            number_field(row, "xpos")?,
            number_field(row, "ypos")?,
            number_field(row, "zpos")?,
        );
        let velocity = Vector3::new(
            number_field(row, "xvel")?,
            number_field(row, "yvel")?,
            number_field(row, "zvel")?,
        );

        let auxiliary = row
            .iter()
            .filter(|(key, _)| !REQUIRED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(StateVector {
            satellite_id,
            epoch,
            position,
            velocity,
            auxiliary,
        })
    }

    /// Geocentric distance in km.
    pub fn distance(&self) -> Kilometer {
        self.position.norm()
    }

    /// Speed in km/s.
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}

fn number_field(row: &CatalogRow, name: &str) -> Result<f64, PipelineError> {
    let value = match row.get(name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => return Err(missing(name)),
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| PipelineError::InvalidRow(format!("{name} is not a finite number")))
}

fn missing(name: &str) -> PipelineError {
    PipelineError::InvalidRow(format!("{name} is missing or null"))
}

#[cfg(test)]
mod state_vector_test {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn row(value: Value) -> CatalogRow {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn geo_row() -> CatalogRow {
        row(json!({
            "satNo": 26608,
            "epoch": "2024-01-01T00:00:00.000000Z",
            "xpos": 42164.0, "ypos": 0.0, "zpos": 0.0,
            "xvel": 0.0, "yvel": 3.0746, "zvel": 0.0,
            "source": "SENSOR-A",
        }))
    }

    #[test]
    fn test_from_complete_row() {
        let sv = StateVector::try_from_row(&geo_row()).unwrap();
        assert_eq!(sv.satellite_id, 26608);
        assert_relative_eq!(sv.distance(), 42164.0);
        assert_relative_eq!(sv.speed(), 3.0746);
        assert_eq!(sv.auxiliary.len(), 1);
        assert_eq!(sv.auxiliary["source"], json!("SENSOR-A"));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let mut r = geo_row();
        r.insert("satNo".into(), json!("26608"));
        r.insert("xpos".into(), json!(" 42164.0 "));
        let sv = StateVector::try_from_row(&r).unwrap();
        assert_eq!(sv.satellite_id, 26608);
        assert_relative_eq!(sv.position.x, 42164.0);
    }

    #[test]
    fn test_missing_or_null_fields_are_rejected() {
        let mut r = geo_row();
        r.remove("zvel");
        assert_eq!(
            StateVector::try_from_row(&r),
            Err(PipelineError::InvalidRow("zvel is missing or null".into()))
        );

        let mut r = geo_row();
        r.insert("epoch".into(), Value::Null);
        assert!(StateVector::try_from_row(&r).is_err());

        let mut r = geo_row();
        r.insert("satNo".into(), json!(12.5));
        assert!(StateVector::try_from_row(&r).is_err());

        let mut r = geo_row();
        r.insert("ypos".into(), json!("north"));
        assert!(StateVector::try_from_row(&r).is_err());
    }
}
