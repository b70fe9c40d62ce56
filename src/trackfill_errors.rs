use thiserror::Error;

use crate::constants::SatelliteId;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown quality tier: {0}")]
    UnknownQualityTier(String),

    #[error("Unknown search strategy: {0}")]
    UnknownSearchStrategy(String),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid time range: start must be strictly before end")]
    InvalidTimeRange,

    #[error("Invalid window length: {0} hours")]
    InvalidWindowLength(f64),

    #[error("Non-physical mean motion for satellite {satellite_id}: {mean_motion} rev/day")]
    NonPhysicalMeanMotion {
        satellite_id: SatelliteId,
        mean_motion: f64,
    },

    #[error("Missing eccentricity for satellite {0}")]
    MissingEccentricity(SatelliteId),

    #[error("Unable to parse element set: {0}")]
    ElementSetParsing(String),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Required field absent from every catalog row: {0}")]
    MissingSchemaField(String),

    #[error("Invalid catalog row: {0}")]
    InvalidRow(String),

    #[error("Invalid epoch string: {0}")]
    InvalidEpoch(String),

    #[error("Gaussian noise generation failed: {0:?}")]
    NoiseInjectionError(rand_distr::NormalError),
}

impl PipelineError {
    /// True for errors that must abort the run before any fetch is issued.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownQualityTier(_)
                | PipelineError::UnknownSearchStrategy(_)
                | PipelineError::InvalidConfiguration(_)
                | PipelineError::InvalidRequest(_)
                | PipelineError::InvalidTimeRange
                | PipelineError::InvalidWindowLength(_)
        )
    }
}

impl From<rand_distr::NormalError> for PipelineError {
    fn from(err: rand_distr::NormalError) -> Self {
        PipelineError::NoiseInjectionError(err)
    }
}

impl PartialEq for PipelineError {
    fn eq(&self, other: &Self) -> bool {
        use PipelineError::*;
        match (self, other) {
            (UnknownQualityTier(a), UnknownQualityTier(b)) => a == b,
            (UnknownSearchStrategy(a), UnknownSearchStrategy(b)) => a == b,
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (InvalidRequest(a), InvalidRequest(b)) => a == b,
            (InvalidWindowLength(a), InvalidWindowLength(b)) => a == b,
            (
                NonPhysicalMeanMotion {
                    satellite_id: s1,
                    mean_motion: m1,
                },
                NonPhysicalMeanMotion {
                    satellite_id: s2,
                    mean_motion: m2,
                },
            ) => s1 == s2 && (m1 == m2 || (m1.is_nan() && m2.is_nan())),
            (MissingEccentricity(a), MissingEccentricity(b)) => a == b,
            (ElementSetParsing(a), ElementSetParsing(b)) => a == b,
            (CredentialUnavailable(a), CredentialUnavailable(b)) => a == b,
            (MissingSchemaField(a), MissingSchemaField(b)) => a == b,
            (InvalidRow(a), InvalidRow(b)) => a == b,
            (InvalidEpoch(a), InvalidEpoch(b)) => a == b,
            (NoiseInjectionError(a), NoiseInjectionError(b)) => a == b,

            (InvalidTimeRange, InvalidTimeRange) => true,

            _ => false,
        }
    }
}
