pub mod catalog;
pub mod config;
pub mod constants;
pub mod downsample;
pub mod elements;
pub mod gaps;
pub mod merge;
pub mod observation;
pub mod orchestrator;
pub mod pipeline;
pub mod regime;
pub mod strategy;
pub mod synthetic;
pub mod tier;
pub mod time;
pub mod trackfill_errors;
pub mod tracks;
pub mod validation;

pub use config::PipelineConfig;
pub use observation::{DataMode, Observation};
pub use pipeline::{Pipeline, PipelineOutput, PipelineRequest};
pub use tier::QualityTier;
pub use trackfill_errors::PipelineError;
