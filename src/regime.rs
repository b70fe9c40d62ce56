//! # Orbital regime classification
//!
//! Classifies a satellite into a coarse orbital regime from its mean motion, through the
//! semi-major axis given by Kepler's third law:
//!
//! ```text
//! n = mean_motion · 2π / 86400        [rad/s]
//! a = (μ / n²)^(1/3)                  [km],  μ = 398600.4418 km³/s²
//! ```
//!
//! | Regime | Semi-major axis | Gap threshold / window |
//! |--------|-----------------|------------------------|
//! | LEO    | a < 8378 km     | 6 h                    |
//! | MEO    | 8378 ≤ a < 20000| 12 h                   |
//! | GEO    | a ≥ 42164 km    | 24 h                   |
//! | HEO    | otherwise       | 8 h                    |
//!
//! Since `a` decreases monotonically with `n`, every boundary maps to a fixed mean motion
//! (e.g. a = 42164 km ⇔ n ≈ 7.2921e-5 rad/s).
//!
//! Classification is a pure function of the elements at one epoch; results are never cached.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    Hours, Kilometer, SatelliteId, DPI, GEO_MIN_SMA_KM, LEO_MAX_SMA_KM, MEO_MAX_SMA_KM,
    MU_EARTH, SECONDS_PER_DAY,
};
use crate::elements::SatelliteElementSet;
use crate::trackfill_errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrbitRegime {
    Leo,
    Meo,
    Geo,
    Heo,
}

impl OrbitRegime {
    /// Maximum gap between two observations of the same track, also used as the
    /// fetch window length.
    pub fn gap_threshold_hours(&self) -> Hours {
        match self {
            OrbitRegime::Leo => 6.0,
            OrbitRegime::Meo => 12.0,
            OrbitRegime::Geo => 24.0,
            OrbitRegime::Heo => 8.0,
        }
    }
}

impl fmt::Display for OrbitRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrbitRegime::Leo => "LEO",
            OrbitRegime::Meo => "MEO",
            OrbitRegime::Geo => "GEO",
            OrbitRegime::Heo => "HEO",
        };
        write!(f, "{name}")
    }
}

/// Outcome of a successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegimeClassification {
    pub regime: OrbitRegime,
    pub semi_major_axis: Kilometer,
    pub period_hours: Hours,
}

impl RegimeClassification {
    pub fn gap_threshold_hours(&self) -> Hours {
        self.regime.gap_threshold_hours()
    }
}

/// Classify an orbit from its mean motion and eccentricity.
///
/// Arguments
/// ---------
/// * `mean_motion`: revolutions per day
/// * `eccentricity`: must be present (finite); not used by the thresholds
///
/// Return
/// ------
/// * the regime with the semi-major axis and period, or a classification error when the
///   mean motion is non-positive or non-finite
pub fn classify(
    mean_motion: f64,
    eccentricity: f64,
) -> Result<RegimeClassification, PipelineError> {
    classify_satellite(0, mean_motion, eccentricity)
}

/// Classify the orbit described by an element set.
pub fn classify_elements(
    elements: &SatelliteElementSet,
) -> Result<RegimeClassification, PipelineError> {
    classify_satellite(
        elements.catalog_id,
        elements.mean_motion,
        elements.eccentricity,
    )
}

fn classify_satellite(
    satellite_id: SatelliteId,
    mean_motion: f64,
    eccentricity: f64,
) -> Result<RegimeClassification, PipelineError> {
    if !mean_motion.is_finite() || mean_motion <= 0.0 {
        return Err(PipelineError::NonPhysicalMeanMotion {
            satellite_id,
            mean_motion,
        });
    }
    if !eccentricity.is_finite() {
        return Err(PipelineError::MissingEccentricity(satellite_id));
    }

    let semi_major_axis = semi_major_axis_from_mean_motion(mean_motion);

    let regime = if semi_major_axis < LEO_MAX_SMA_KM {
        OrbitRegime::Leo
    } else if semi_major_axis < MEO_MAX_SMA_KM {
        OrbitRegime::Meo
    } else if semi_major_axis >= GEO_MIN_SMA_KM {
        OrbitRegime::Geo
    } else {
        OrbitRegime::Heo
    };

    Ok(RegimeClassification {
        regime,
        semi_major_axis,
        period_hours: 24.0 / mean_motion,
    })
}

/// Semi-major axis (km) from a mean motion in revolutions per day.
pub fn semi_major_axis_from_mean_motion(mean_motion: f64) -> Kilometer {
    let n = mean_motion * DPI / SECONDS_PER_DAY;
    (MU_EARTH / (n * n)).cbrt()
}

/// Most common regime among the classified satellites.
///
/// Ties are broken by the declaration order of [`OrbitRegime`]; `GEO` is returned when
/// nothing was classified.
pub fn primary_regime<'a, I>(regimes: I) -> OrbitRegime
where
    I: IntoIterator<Item = &'a OrbitRegime>,
{
    let mut counts: HashMap<OrbitRegime, usize> = HashMap::new();
    for regime in regimes {
        *counts.entry(*regime).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then_with(|| rb.cmp(ra)))
        .map(|(regime, _)| regime)
        .unwrap_or(OrbitRegime::Geo)
}

#[cfg(test)]
mod regime_test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// Mean motion (rev/day) giving the requested semi-major axis.
    fn mean_motion_for(sma: f64) -> f64 {
        (MU_EARTH / sma.powi(3)).sqrt() * SECONDS_PER_DAY / DPI
    }

    #[test]
    fn test_classify_typical_orbits() {
        assert_eq!(classify(15.5, 0.0005).unwrap().regime, OrbitRegime::Leo);
        assert_eq!(classify(2.0, 0.001).unwrap().regime, OrbitRegime::Heo);
        assert_eq!(classify(4.0, 0.01).unwrap().regime, OrbitRegime::Meo);
        assert_eq!(classify(1.0027, 0.0002).unwrap().regime, OrbitRegime::Geo);
    }

    #[test]
    fn test_geo_boundary_mean_motion() {
        let n_rad_s = (MU_EARTH / GEO_MIN_SMA_KM.powi(3)).sqrt();
        assert_relative_eq!(n_rad_s, 7.2921e-5, epsilon = 1e-8);

        let at_boundary = mean_motion_for(GEO_MIN_SMA_KM) * (1.0 - 1e-12);
        assert_eq!(classify(at_boundary, 0.0).unwrap().regime, OrbitRegime::Geo);

        let just_inside = mean_motion_for(GEO_MIN_SMA_KM) * (1.0 + 1e-9);
        assert_eq!(classify(just_inside, 0.0).unwrap().regime, OrbitRegime::Heo);
    }

    #[test]
    fn test_leo_meo_boundaries() {
        let leo_edge = mean_motion_for(LEO_MAX_SMA_KM);
        assert_eq!(
            classify(leo_edge * (1.0 + 1e-9), 0.0).unwrap().regime,
            OrbitRegime::Leo
        );
        assert_eq!(
            classify(leo_edge * (1.0 - 1e-9), 0.0).unwrap().regime,
            OrbitRegime::Meo
        );

        let meo_edge = mean_motion_for(MEO_MAX_SMA_KM);
        assert_eq!(
            classify(meo_edge * (1.0 - 1e-9), 0.0).unwrap().regime,
            OrbitRegime::Heo
        );
    }

    #[test]
    fn test_period_and_sma() {
        let result = classify(1.0, 0.0).unwrap();
        assert_relative_eq!(result.period_hours, 24.0);
        assert_relative_eq!(result.semi_major_axis, 42241.1, epsilon = 1.0);
        assert_eq!(result.gap_threshold_hours(), 24.0);
    }

    #[test]
    fn test_non_physical_mean_motion() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                classify(bad, 0.0),
                Err(PipelineError::NonPhysicalMeanMotion { .. })
            ));
        }
        assert_eq!(
            classify(15.0, f64::NAN),
            Err(PipelineError::MissingEccentricity(0))
        );
    }

    #[test]
    fn test_primary_regime() {
        let regimes = [OrbitRegime::Leo, OrbitRegime::Geo, OrbitRegime::Geo];
        assert_eq!(primary_regime(regimes.iter()), OrbitRegime::Geo);

        let tie = [OrbitRegime::Heo, OrbitRegime::Meo];
        assert_eq!(primary_regime(tie.iter()), OrbitRegime::Meo);

        assert_eq!(
            primary_regime(std::iter::empty::<&OrbitRegime>()),
            OrbitRegime::Geo
        );
    }

    proptest! {
        #[test]
        fn sma_decreases_with_mean_motion(n in 0.05f64..20.0, dn in 1e-6f64..5.0) {
            let a1 = semi_major_axis_from_mean_motion(n);
            let a2 = semi_major_axis_from_mean_motion(n + dn);
            prop_assert!(a2 < a1);
        }

        #[test]
        fn classification_is_deterministic(n in 0.05f64..20.0, e in 0.0f64..0.99) {
            prop_assert_eq!(classify(n, e).unwrap(), classify(n, e).unwrap());
        }
    }
}
