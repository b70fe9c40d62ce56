use hifitime::Epoch;
use serde::Serialize;

use crate::constants::Hours;
use crate::time::{hours, hours_between, iso8601};
use crate::trackfill_errors::PipelineError;

/// Half-open fetch interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    #[serde(with = "iso8601")]
    pub start: Epoch,
    #[serde(with = "iso8601")]
    pub end: Epoch,
}

impl TimeWindow {
    pub fn new(start: Epoch, end: Epoch) -> Self {
        TimeWindow { start, end }
    }

    pub fn duration_hours(&self) -> Hours {
        hours_between(&self.start, &self.end)
    }

    pub fn contains(&self, epoch: &Epoch) -> bool {
        *epoch >= self.start && *epoch < self.end
    }
}

/// Partition `[start, end)` into contiguous windows of `window_hours`.
///
/// Windows are returned in ascending order, share only their boundary instants, and
/// the last one is truncated to `end`. The count is `ceil((end - start) / window_hours)`.
///
/// Arguments
/// ---------
/// * `start`, `end`: requested span, `start < end`
/// * `window_hours`: strictly positive window length
///
/// Return
/// ------
/// * the windows, or a configuration error for an empty span or a non-positive length
pub fn plan_windows(
    start: Epoch,
    end: Epoch,
    window_hours: Hours,
) -> Result<Vec<TimeWindow>, PipelineError> {
    if !window_hours.is_finite() || window_hours <= 0.0 {
        return Err(PipelineError::InvalidWindowLength(window_hours));
    }
    if start >= end {
        return Err(PipelineError::InvalidTimeRange);
    }

    let count = (hours_between(&start, &end) / window_hours).ceil() as usize;
    let windows = (0..count)
        .map(|i| {
            // offsets from `start` avoid drift from repeated additions
            let window_start = start + hours(window_hours * i as f64);
            let window_end = start + hours(window_hours * (i + 1) as f64);
            TimeWindow::new(window_start, if window_end < end { window_end } else { end })
        })
        .filter(|w| w.start < w.end)
        .collect();

    Ok(windows)
}
