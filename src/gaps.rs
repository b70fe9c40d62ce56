//! # Gap analysis
//!
//! Splits a satellite's observed time span into equal-width bins and reports the empty
//! ones, which become candidates for synthetic observations.
//!
//! ```text
//! width = period / bins_per_period
//! count = floor(span / width)
//! bin i = [t_first + i·width, t_first + (i+1)·width)
//! ```
//!
//! Observations beyond the last full bin are ignored. A span shorter than one bin is
//! reported as [`GapAnalysis::Degenerate`]; it is an expected outcome for short arcs,
//! not an error.

use hifitime::Epoch;
use serde::Serialize;

use crate::constants::Hours;
use crate::observation::Observation;
use crate::time::{by_time, hours, hours_between, iso8601};

/// Number of bins per orbital period.
pub const BINS_PER_PERIOD: usize = 10;

/// One time bin of the analyzed span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapBin {
    pub index: usize,
    #[serde(with = "iso8601")]
    pub start: Epoch,
    #[serde(with = "iso8601")]
    pub end: Epoch,
    pub count: usize,
}

impl GapBin {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn midpoint(&self) -> Epoch {
        self.start + (self.end - self.start) * 0.5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GapAnalysis {
    /// The span does not hold a single full bin
    Degenerate {
        span_hours: Hours,
        bin_width_hours: Hours,
    },
    Binned {
        bin_width_hours: Hours,
        bins: Vec<GapBin>,
    },
}

impl GapAnalysis {
    /// Empty bins, in time order. Nothing for a degenerate analysis.
    pub fn empty_bins(&self) -> Vec<GapBin> {
        match self {
            GapAnalysis::Degenerate { .. } => Vec::new(),
            GapAnalysis::Binned { bins, .. } => {
                bins.iter().filter(|b| b.is_empty()).copied().collect()
            }
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, GapAnalysis::Degenerate { .. })
    }
}

/// Bin the time span of one satellite's observations.
///
/// Arguments
/// ---------
/// * `observations`: one satellite's observations, in any order
/// * `period_hours`: orbital period of the satellite
/// * `bins_per_period`: number of bins spanning one period
///
/// Return
/// ------
/// * [`GapAnalysis::Binned`] with per-bin counts, or [`GapAnalysis::Degenerate`] when the
///   span (or the observation set) is too small to hold one bin
pub fn analyze_gaps(
    observations: &[Observation],
    period_hours: Hours,
    bins_per_period: usize,
) -> GapAnalysis {
    let bin_width_hours = if bins_per_period > 0 {
        period_hours / bins_per_period as f64
    } else {
        f64::NAN
    };

    let first = observations.iter().map(|o| o.time).min_by(by_time);
    let last = observations.iter().map(|o| o.time).max_by(by_time);
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return GapAnalysis::Degenerate {
                span_hours: 0.0,
                bin_width_hours,
            }
        }
    };

    let span_hours = hours_between(&first, &last);
    let count = (span_hours / bin_width_hours).floor();
    if !count.is_finite() || count < 1.0 {
        return GapAnalysis::Degenerate {
            span_hours,
            bin_width_hours,
        };
    }
    let count = count as usize;

    let mut bins: Vec<GapBin> = (0..count)
        .map(|i| GapBin {
            index: i,
            start: first + hours(bin_width_hours * i as f64),
            end: first + hours(bin_width_hours * (i + 1) as f64),
            count: 0,
        })
        .collect();

    for obs in observations {
        let offset = hours_between(&first, &obs.time) / bin_width_hours;
        let index = offset.floor() as usize;
        if let Some(bin) = bins.get_mut(index) {
            bin.count += 1;
        }
    }

    GapAnalysis::Binned {
        bin_width_hours,
        bins,
    }
}
