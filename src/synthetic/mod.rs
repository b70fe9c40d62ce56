//! # Synthetic observation generation
//!
//! Fills the empty bins found by the [gap analysis](crate::gaps) with physically
//! plausible observations.
//!
//! ## Candidate generation
//!
//! For each empty bin, in time order:
//!
//! 1. `candidates_per_bin` epochs are laid out from the bin midpoint, `candidate_spacing_s`
//!    seconds apart.
//! 2. Each epoch is propagated with the satellite's element set through the external
//!    [`OrbitPropagator`]; a propagation error skips that candidate.
//! 3. The inertial position is observed from the configured
//!    [`SensorSite`](topocentric::SensorSite) (see [`topocentric`]).
//! 4. The candidate is kept only if its elevation is **strictly above**
//!    `min_elevation_deg` **and** the [`SunlitCheck`] reports it illuminated. Rejected
//!    candidates are dropped, never retried.
//! 5. Kept candidates receive independent zero-mean Gaussian noise on right ascension and
//!    declination, are tagged `SIMULATED`, and share one synthetic track id per bin,
//!    numbered after the last real track.
//!
//! Generation for a satellite stops as soon as one more observation would push
//! `synthetic / (real + synthetic)` above the tier's ratio cap.
//!
//! ## Reproducibility and isolation
//!
//! Each satellite draws its noise from its own `StdRng` seeded with
//! `seed ^ satellite_id`, so results do not depend on scheduling. Satellites are
//! processed in parallel with `rayon`; a panic inside one satellite's propagation is
//! caught and reported as that satellite's failure.

pub mod sunlit;
pub mod topocentric;

use std::panic::{catch_unwind, AssertUnwindSafe};

use hifitime::{Epoch, Unit};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SynthesisConfig;
use crate::constants::{SatelliteId, TrackId, ARCSEC_TO_DEG};
use crate::elements::SatelliteElementSet;
use crate::gaps::GapBin;
use crate::observation::Observation;
use crate::trackfill_errors::PipelineError;

pub use sunlit::CylindricalEarthShadow;
pub use topocentric::{observe, wrap_angle, SensorSite, TopocentricCoordinates};

/// External orbit propagation capability.
pub trait OrbitPropagator: Send + Sync {
    /// Position (km) and velocity (km/s) in an Earth-centered inertial frame.
    fn propagate(
        &self,
        elements: &SatelliteElementSet,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), String>;
}

impl<F> OrbitPropagator for F
where
    F: Fn(&SatelliteElementSet, Epoch) -> Result<(Vector3<f64>, Vector3<f64>), String>
        + Send
        + Sync,
{
    fn propagate(
        &self,
        elements: &SatelliteElementSet,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), String> {
        self(elements, epoch)
    }
}

/// External illumination test.
pub trait SunlitCheck: Send + Sync {
    fn is_sunlit(&self, position: &Vector3<f64>, epoch: Epoch) -> bool;
}

impl<F> SunlitCheck for F
where
    F: Fn(&Vector3<f64>, Epoch) -> bool + Send + Sync,
{
    fn is_sunlit(&self, position: &Vector3<f64>, epoch: Epoch) -> bool {
        self(position, epoch)
    }
}

/// Everything needed to fill one satellite's gaps.
#[derive(Debug, Clone)]
pub struct SynthesisJob<'a> {
    pub satellite_id: SatelliteId,
    pub elements: &'a SatelliteElementSet,
    /// Number of real observations kept for this satellite
    pub real_count: usize,
    pub empty_bins: Vec<GapBin>,
    /// First track id available for synthetic tracks
    pub next_track_id: TrackId,
    pub max_synthetic_ratio: f64,
}

/// Result of a successful synthesis for one satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisOutcome {
    pub satellite_id: SatelliteId,
    #[serde(skip)]
    pub observations: Vec<Observation>,
    pub empty_bins: usize,
    pub bins_filled: usize,
    pub candidates_evaluated: usize,
    pub rejected_elevation: usize,
    pub rejected_shadow: usize,
    pub propagation_errors: usize,
    /// Generation stopped on the ratio cap
    pub capped: bool,
}

/// A satellite whose synthesis could not complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisFailure {
    pub satellite_id: SatelliteId,
    pub reason: String,
}

/// Largest synthetic count `s` such that `s / (real + s) <= ratio`.
pub fn max_synthetic_count(real_count: usize, ratio: f64) -> usize {
    if !(ratio > 0.0) || real_count == 0 {
        return 0;
    }
    if ratio >= 1.0 {
        return usize::MAX;
    }
    // tolerance keeps exact ratios such as 1/3 from flooring one short
    ((ratio * real_count as f64) / (1.0 - ratio) + 1e-9).floor() as usize
}

pub struct SyntheticObservationGenerator<'a> {
    propagator: &'a dyn OrbitPropagator,
    sunlit: &'a dyn SunlitCheck,
    config: &'a SynthesisConfig,
}

impl<'a> SyntheticObservationGenerator<'a> {
    pub fn new(
        propagator: &'a dyn OrbitPropagator,
        sunlit: &'a dyn SunlitCheck,
        config: &'a SynthesisConfig,
    ) -> Self {
        SyntheticObservationGenerator {
            propagator,
            sunlit,
            config,
        }
    }

    /// Fill the empty bins of one satellite.
    ///
    /// Arguments
    /// ---------
    /// * `job`: the satellite, its elements, its empty bins and its ratio cap
    ///
    /// Return
    /// ------
    /// * the accepted synthetic observations with the rejection counters, or a noise
    ///   configuration error
    pub fn generate(&self, job: &SynthesisJob<'_>) -> Result<SynthesisOutcome, PipelineError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ u64::from(job.satellite_id));
        let noise = Normal::new(0.0, self.config.noise_sigma_arcsec * ARCSEC_TO_DEG)?;
        let limit = max_synthetic_count(job.real_count, job.max_synthetic_ratio);

        let mut outcome = SynthesisOutcome {
            satellite_id: job.satellite_id,
            observations: Vec::new(),
            empty_bins: job.empty_bins.len(),
            bins_filled: 0,
            candidates_evaluated: 0,
            rejected_elevation: 0,
            rejected_shadow: 0,
            propagation_errors: 0,
            capped: false,
        };

        'bins: for bin in &job.empty_bins {
            let midpoint = bin.midpoint();
            let track_id = job.next_track_id + outcome.bins_filled as TrackId;
            let mut filled = false;

            for k in 0..self.config.candidates_per_bin {
                if outcome.observations.len() >= limit {
                    outcome.capped = true;
                    break 'bins;
                }

                let epoch = midpoint + Unit::Second * (k as f64 * self.config.candidate_spacing_s);
                outcome.candidates_evaluated += 1;

                let position = match self.propagator.propagate(job.elements, epoch) {
                    Ok((position, _)) => position,
                    Err(reason) => {
                        debug!(
                            satellite_id = job.satellite_id,
                            bin = bin.index,
                            %reason,
                            "propagation failed, candidate skipped"
                        );
                        outcome.propagation_errors += 1;
                        continue;
                    }
                };

                let coords = observe(&self.config.sensor_site, &position, &epoch);
                if coords.elevation <= self.config.min_elevation_deg {
                    outcome.rejected_elevation += 1;
                    continue;
                }
                if !self.sunlit.is_sunlit(&position, epoch) {
                    outcome.rejected_shadow += 1;
                    continue;
                }

                let noisy = TopocentricCoordinates {
                    ra: wrap_angle(coords.ra + rng.sample(noise), 360.0),
                    dec: (coords.dec + rng.sample(noise)).clamp(-90.0, 90.0),
                    ..coords
                };
                outcome.observations.push(
                    Observation::simulated(job.satellite_id, epoch, &noisy).with_track(track_id),
                );
                if !filled {
                    filled = true;
                    outcome.bins_filled += 1;
                }
            }
        }

        if !outcome.capped && limit > 0 && outcome.observations.len() >= limit {
            outcome.capped = true;
        }

        debug!(
            satellite_id = job.satellite_id,
            accepted = outcome.observations.len(),
            limit,
            evaluated = outcome.candidates_evaluated,
            rejected_elevation = outcome.rejected_elevation,
            rejected_shadow = outcome.rejected_shadow,
            propagation_errors = outcome.propagation_errors,
            "synthesis done"
        );

        Ok(outcome)
    }

    /// Fill the gaps of many satellites in parallel.
    ///
    /// The results follow the order of `jobs`. A panic raised while processing one
    /// satellite is turned into a [`SynthesisFailure`] for that satellite only.
    pub fn generate_all(
        &self,
        jobs: &[SynthesisJob<'_>],
    ) -> Vec<Result<SynthesisOutcome, SynthesisFailure>> {
        jobs.par_iter()
            .map(|job| {
                let result = catch_unwind(AssertUnwindSafe(|| self.generate(job)));
                match result {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(err)) => Err(SynthesisFailure {
                        satellite_id: job.satellite_id,
                        reason: err.to_string(),
                    }),
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        warn!(
                            satellite_id = job.satellite_id,
                            %reason,
                            "synthesis panicked"
                        );
                        Err(SynthesisFailure {
                            satellite_id: job.satellite_id,
                            reason: format!("synthesis panicked: {reason}"),
                        })
                    }
                }
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
