//! # Pipeline configuration
//!
//! A [`PipelineConfig`] is an explicit, immutable value handed to the
//! [`Pipeline`](crate::pipeline::Pipeline); nothing in the crate reads global state.
//! Every field has a default, and partial documents deserialize on top of them:
//!
//! ```json
//! { "synthesis": { "seed": 7, "noise_sigma_arcsec": 0.5 } }
//! ```
//!
//! Loading the document from a file or the command line is up to the caller.

use serde::{Deserialize, Serialize};

use crate::constants::{ArcSec, Degree};
use crate::downsample::DownsampleMode;
use crate::gaps::BINS_PER_PERIOD;
use crate::strategy::query_strategy::HYBRID_COUNT_THRESHOLD;
use crate::synthetic::SensorSite;
use crate::tracks::TrackPolicy;
use crate::trackfill_errors::PipelineError;

/// Parameters of the synthetic observation generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub sensor_site: SensorSite,
    /// Candidates must be strictly above this elevation
    pub min_elevation_deg: Degree,
    /// Standard deviation of the noise added to RA and Dec
    pub noise_sigma_arcsec: ArcSec,
    /// Candidate epochs per empty bin, 3 to 5
    pub candidates_per_bin: usize,
    pub candidate_spacing_s: f64,
    pub bins_per_period: usize,
    /// Base seed of the per-satellite noise generators
    pub seed: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            // GEODSS Socorro
            sensor_site: SensorSite::new("Socorro", 33.8172, -106.6599, 1510.0),
            min_elevation_deg: 6.0,
            noise_sigma_arcsec: 0.3,
            candidates_per_bin: 3,
            candidate_spacing_s: 30.0,
            bins_per_period: BINS_PER_PERIOD,
            seed: 42,
        }
    }
}

/// Minimum real coverage a satellite needs before its gaps are filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationGate {
    pub min_real_observations: usize,
    /// Real time span, in orbital periods
    pub min_coverage_periods: f64,
}

impl Default for SimulationGate {
    fn default() -> Self {
        SimulationGate {
            min_real_observations: 3,
            min_coverage_periods: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Estimated record count below which a hybrid plan resolves to fast
    pub hybrid_threshold: u64,
    pub track_policy: TrackPolicy,
    pub downsample_mode: DownsampleMode,
    pub synthesis: SynthesisConfig,
    pub simulation_gate: SimulationGate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            hybrid_threshold: HYBRID_COUNT_THRESHOLD,
            track_policy: TrackPolicy::default(),
            downsample_mode: DownsampleMode::default(),
            synthesis: SynthesisConfig::default(),
            simulation_gate: SimulationGate::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every tunable.
    ///
    /// Return
    /// ------
    /// * `Ok(())`, or [`PipelineError::InvalidConfiguration`] naming the first bad value
    pub fn validate(&self) -> Result<(), PipelineError> {
        let s = &self.synthesis;
        let site = &s.sensor_site;

        check(
            site.latitude.is_finite() && (-90.0..=90.0).contains(&site.latitude),
            || format!("sensor latitude {} out of [-90, 90]", site.latitude),
        )?;
        check(
            site.longitude.is_finite() && (-180.0..=360.0).contains(&site.longitude),
            || format!("sensor longitude {} out of [-180, 360]", site.longitude),
        )?;
        check(site.altitude.is_finite(), || {
            format!("sensor altitude {} is not finite", site.altitude)
        })?;
        check(
            s.min_elevation_deg.is_finite() && (-90.0..90.0).contains(&s.min_elevation_deg),
            || format!("min_elevation_deg {} out of [-90, 90)", s.min_elevation_deg),
        )?;
        check(
            s.noise_sigma_arcsec.is_finite() && s.noise_sigma_arcsec >= 0.0,
            || format!("noise_sigma_arcsec {} must be >= 0", s.noise_sigma_arcsec),
        )?;
        check((3..=5).contains(&s.candidates_per_bin), || {
            format!("candidates_per_bin {} out of 3..=5", s.candidates_per_bin)
        })?;
        check(
            s.candidate_spacing_s.is_finite() && s.candidate_spacing_s > 0.0,
            || format!("candidate_spacing_s {} must be > 0", s.candidate_spacing_s),
        )?;
        check(s.bins_per_period > 0, || {
            "bins_per_period must be > 0".to_string()
        })?;
        check(self.hybrid_threshold > 0, || {
            "hybrid_threshold must be > 0".to_string()
        })?;
        check(self.track_policy.min_track_size > 0, || {
            "min_track_size must be > 0".to_string()
        })?;
        check(
            self.simulation_gate.min_coverage_periods.is_finite()
                && self.simulation_gate.min_coverage_periods >= 0.0,
            || {
                format!(
                    "min_coverage_periods {} must be >= 0",
                    self.simulation_gate.min_coverage_periods
                )
            },
        )?;

        Ok(())
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), PipelineError> {
    if ok {
        Ok(())
    } else {
        Err(PipelineError::InvalidConfiguration(msg()))
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.synthesis.min_elevation_deg, 6.0);
        assert_eq!(config.synthesis.noise_sigma_arcsec, 0.3);
        assert_eq!(config.synthesis.bins_per_period, 10);
        assert_eq!(config.hybrid_threshold, 10_000);
        assert_eq!(config.track_policy.min_track_size, 1);
    }

    #[test]
    fn test_partial_document() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "synthesis": { "seed": 7, "candidates_per_bin": 5 },
                 "downsample_mode": "track_preserving" }"#,
        )
        .unwrap();
        assert_eq!(config.synthesis.seed, 7);
        assert_eq!(config.synthesis.candidates_per_bin, 5);
        assert_eq!(config.synthesis.candidate_spacing_s, 30.0);
        assert_eq!(config.downsample_mode, DownsampleMode::TrackPreserving);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = PipelineConfig::default();
        config.synthesis.candidates_per_bin = 6;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfiguration(_))
        ));

        let mut config = PipelineConfig::default();
        config.synthesis.noise_sigma_arcsec = -1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.synthesis.sensor_site.latitude = 91.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.track_policy.min_track_size = 0;
        assert!(config.validate().is_err());
    }
}
