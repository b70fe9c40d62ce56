//! # Quality tiers
//!
//! A quality tier is a named, static policy bundle deciding how far a satellite's
//! observations are thinned and whether coverage gaps are filled synthetically.
//!
//! | Tier | Name           | Max obs/sat | Downsample | Simulate | Max synthetic ratio |
//! |------|----------------|-------------|------------|----------|---------------------|
//! | T1   | High Fidelity  | 200         | no         | no       | 0.00                |
//! | T2   | Standard       | 50          | yes        | no       | 0.00                |
//! | T3   | Degraded       | 30          | yes        | yes      | 0.35                |
//! | T4   | Lowest Quality | 20          | yes        | yes      | 0.50                |
//!
//! Each policy also carries the nominal coverage band and gap target, expressed in
//! orbital periods, for reporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::trackfill_errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    T1,
    T2,
    T3,
    T4,
}

impl FromStr for QualityTier {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T1" => Ok(QualityTier::T1),
            "T2" => Ok(QualityTier::T2),
            "T3" => Ok(QualityTier::T3),
            "T4" => Ok(QualityTier::T4),
            _ => Err(PipelineError::UnknownQualityTier(s.to_string())),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Static policy of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityTierPolicy {
    pub tier: QualityTier,
    pub name: &'static str,
    pub max_obs_per_satellite: usize,
    pub downsample: bool,
    pub simulate: bool,
    /// Upper bound of synthetic / (real + synthetic) per satellite
    pub max_synthetic_ratio: f64,
    /// Nominal fraction of the orbit covered by observations, `(low, high)` in `[0, 1]`
    pub coverage_range: (f64, f64),
    /// Largest tolerated coverage gap, in periods
    pub gap_target_periods: f64,
}

const T1_POLICY: QualityTierPolicy = QualityTierPolicy {
    tier: QualityTier::T1,
    name: "High Fidelity",
    max_obs_per_satellite: 200,
    downsample: false,
    simulate: false,
    max_synthetic_ratio: 0.0,
    coverage_range: (0.20, 0.40),
    gap_target_periods: 1.5,
};

const T2_POLICY: QualityTierPolicy = QualityTierPolicy {
    tier: QualityTier::T2,
    name: "Standard",
    max_obs_per_satellite: 50,
    downsample: true,
    simulate: false,
    max_synthetic_ratio: 0.0,
    coverage_range: (0.05, 0.15),
    gap_target_periods: 2.0,
};

const T3_POLICY: QualityTierPolicy = QualityTierPolicy {
    tier: QualityTier::T3,
    name: "Degraded",
    max_obs_per_satellite: 30,
    downsample: true,
    simulate: true,
    max_synthetic_ratio: 0.35,
    coverage_range: (0.02, 0.10),
    gap_target_periods: 3.0,
};

const T4_POLICY: QualityTierPolicy = QualityTierPolicy {
    tier: QualityTier::T4,
    name: "Lowest Quality",
    max_obs_per_satellite: 20,
    downsample: true,
    simulate: true,
    max_synthetic_ratio: 0.50,
    coverage_range: (0.01, 0.05),
    gap_target_periods: 4.0,
};

impl QualityTier {
    pub fn policy(&self) -> &'static QualityTierPolicy {
        match self {
            QualityTier::T1 => &T1_POLICY,
            QualityTier::T2 => &T2_POLICY,
            QualityTier::T3 => &T3_POLICY,
            QualityTier::T4 => &T4_POLICY,
        }
    }
}

/// Resolve a tier name into its policy.
///
/// Fails with [`PipelineError::UnknownQualityTier`] for any name outside `T1`..`T4`.
pub fn route(tier_name: &str) -> Result<&'static QualityTierPolicy, PipelineError> {
    Ok(tier_name.parse::<QualityTier>()?.policy())
}
