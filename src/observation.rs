//! # Observations
//!
//! An [`Observation`] is the pipeline's output record: one angular measurement of a
//! satellite as seen from the sensor site, either derived from a fetched state vector
//! (`REAL`) or generated to fill a coverage gap (`SIMULATED`).
//!
//! The serialized form is stable:
//!
//! | Field          | Type                     |
//! |----------------|--------------------------|
//! | `satellite_id` | integer                  |
//! | `time`         | UTC ISO-8601 string      |
//! | `ra`           | degrees, `[0, 360)`      |
//! | `dec`          | degrees, `[-90, 90]`     |
//! | `elevation`    | degrees                  |
//! | `azimuth`      | degrees                  |
//! | `range`        | km, nullable             |
//! | `track_id`     | integer                  |
//! | `is_simulated` | bool                     |
//! | `data_mode`    | `"REAL"` \| `"SIMULATED"` |

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, SatelliteId, TrackId};
use crate::synthetic::topocentric::TopocentricCoordinates;
use crate::time::iso8601;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataMode {
    Real,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub satellite_id: SatelliteId,
    #[serde(with = "iso8601")]
    pub time: Epoch,
    pub ra: Degree,
    pub dec: Degree,
    pub elevation: Degree,
    pub azimuth: Degree,
    pub range: Option<Kilometer>,
    pub track_id: TrackId,
    pub is_simulated: bool,
    pub data_mode: DataMode,
}

impl Observation {
    /// Measured observation, not yet assigned to a track.
    pub fn real(satellite_id: SatelliteId, time: Epoch, coords: &TopocentricCoordinates) -> Self {
        Observation::tagged(satellite_id, time, coords, DataMode::Real)
    }

    /// Generated observation, not yet assigned to a track.
    pub fn simulated(
        satellite_id: SatelliteId,
        time: Epoch,
        coords: &TopocentricCoordinates,
    ) -> Self {
        Observation::tagged(satellite_id, time, coords, DataMode::Simulated)
    }

    fn tagged(
        satellite_id: SatelliteId,
        time: Epoch,
        coords: &TopocentricCoordinates,
        data_mode: DataMode,
    ) -> Self {
        Observation {
            satellite_id,
            time,
            ra: coords.ra,
            dec: coords.dec,
            elevation: coords.elevation,
            azimuth: coords.azimuth,
            range: Some(coords.range),
            track_id: 0,
            is_simulated: data_mode == DataMode::Simulated,
            data_mode,
        }
    }

    /// Copy of this observation placed on `track_id`.
    pub fn with_track(&self, track_id: TrackId) -> Self {
        Observation {
            track_id,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod observation_test {
    use super::*;
    use serde_json::json;

    fn coords() -> TopocentricCoordinates {
        TopocentricCoordinates {
            ra: 120.5,
            dec: -5.25,
            elevation: 42.0,
            azimuth: 181.0,
            range: 37_000.0,
        }
    }

    #[test]
    fn test_tags_are_consistent() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let real = Observation::real(7, epoch, &coords());
        assert!(!real.is_simulated);
        assert_eq!(real.data_mode, DataMode::Real);

        let sim = Observation::simulated(7, epoch, &coords()).with_track(4);
        assert!(sim.is_simulated);
        assert_eq!(sim.data_mode, DataMode::Simulated);
        assert_eq!(sim.track_id, 4);
    }

    #[test]
    fn test_serialized_schema() {
        let epoch = Epoch::from_gregorian_utc(2024, 1, 1, 6, 30, 0, 0);
        let obs = Observation::simulated(26608, epoch, &coords()).with_track(2);
        let value = serde_json::to_value(&obs).unwrap();

        assert_eq!(value["satellite_id"], json!(26608));
        assert_eq!(value["time"], json!("2024-01-01T06:30:00.000000Z"));
        assert_eq!(value["data_mode"], json!("SIMULATED"));
        assert_eq!(value["is_simulated"], json!(true));
        assert_eq!(value["track_id"], json!(2));

        let back: Observation = serde_json::from_value(value).unwrap();
        assert_eq!(back, obs);
    }

    #[test]
    fn test_null_range_round_trips() {
        let raw = json!({
            "satellite_id": 1,
            "time": "2024-01-01T00:00:00Z",
            "ra": 10.0, "dec": 0.0, "elevation": 30.0, "azimuth": 90.0,
            "range": null, "track_id": 1,
            "is_simulated": false, "data_mode": "REAL"
        });
        let obs: Observation = serde_json::from_value(raw).unwrap();
        assert_eq!(obs.range, None);
    }
}
