//! # Merging
//!
//! Combines the kept real observations of a satellite with its accepted synthetic ones,
//! orders them by time and computes the summary statistics reported in the run
//! metadata.

use itertools::Itertools;
use serde::Serialize;

use crate::constants::{Hours, SatelliteId};
use crate::observation::Observation;
use crate::time::{by_time, hours_between};

/// Inter-observation gap statistics before and after synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GapStats {
    pub mean_gap_before_hours: Option<Hours>,
    pub max_gap_before_hours: Option<Hours>,
    pub mean_gap_after_hours: Option<Hours>,
    pub max_gap_after_hours: Option<Hours>,
    /// `(before - after) / before` of the mean gap
    pub mean_gap_reduction: Option<f64>,
    /// `(before - after) / before` of the max gap
    pub max_gap_reduction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSatellite {
    pub satellite_id: SatelliteId,
    #[serde(skip)]
    pub observations: Vec<Observation>,
    pub real_count: usize,
    pub synthetic_count: usize,
    pub synthetic_ratio: f64,
    pub gap_stats: GapStats,
}

/// Mean and max gap (hours) between consecutive observations, `None` below two.
pub fn gap_summary(observations: &[Observation]) -> Option<(Hours, Hours)> {
    let gaps: Vec<Hours> = observations
        .iter()
        .map(|o| o.time)
        .sorted_by(by_time)
        .tuple_windows()
        .map(|(a, b)| hours_between(&a, &b))
        .collect();
    if gaps.is_empty() {
        return None;
    }
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let max = gaps.iter().copied().fold(f64::MIN, f64::max);
    Some((mean, max))
}

fn reduction(before: Option<Hours>, after: Option<Hours>) -> Option<f64> {
    match (before, after) {
        (Some(b), Some(a)) if b > 0.0 => Some((b - a) / b),
        _ => None,
    }
}

/// Merge one satellite's real and synthetic observations.
///
/// The output is stable-sorted by time: on equal instants, real observations come
/// first, each group keeping its input order.
pub fn merge(
    satellite_id: SatelliteId,
    real: Vec<Observation>,
    synthetic: Vec<Observation>,
) -> MergedSatellite {
    let before = gap_summary(&real);

    let real_count = real.len();
    let synthetic_count = synthetic.len();
    let observations: Vec<Observation> = real
        .into_iter()
        .chain(synthetic)
        .sorted_by(|a, b| by_time(&a.time, &b.time))
        .collect();

    let after = gap_summary(&observations);
    let total = real_count + synthetic_count;
    let synthetic_ratio = if total == 0 {
        0.0
    } else {
        synthetic_count as f64 / total as f64
    };

    let gap_stats = GapStats {
        mean_gap_before_hours: before.map(|(mean, _)| mean),
        max_gap_before_hours: before.map(|(_, max)| max),
        mean_gap_after_hours: after.map(|(mean, _)| mean),
        max_gap_after_hours: after.map(|(_, max)| max),
        mean_gap_reduction: reduction(before.map(|g| g.0), after.map(|g| g.0)),
        max_gap_reduction: reduction(before.map(|g| g.1), after.map(|g| g.1)),
    };

    MergedSatellite {
        satellite_id,
        observations,
        real_count,
        synthetic_count,
        synthetic_ratio,
        gap_stats,
    }
}
