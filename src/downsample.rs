//! # Downsampling
//!
//! Reduces a satellite's observations to at most `max` while keeping the shape of its
//! temporal coverage.
//!
//! ## Timeline mode
//!
//! For `n > max` observations sorted by time, the target positions are
//!
//! ```text
//! p_i = i · (n - 1) / (max - 1),   i = 0 .. max-1
//! ```
//!
//! each rounded half away from zero. The distinct indices are kept, so the first and
//! last observations are always present. Rounding collisions may collapse two targets
//! onto one index: the realized size is then strictly below `max`.
//!
//! ## Track-preserving mode
//!
//! Every track first receives one slot; the remaining `max - tracks` slots are split
//! proportionally to each track's extra observations using the largest-remainder
//! method (ties go to the earlier track). The timeline selection is then applied inside
//! each track. With more tracks than `max`, the timeline mode is used instead.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::observation::Observation;
use crate::time::by_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownsampleMode {
    #[default]
    Timeline,
    TrackPreserving,
}

/// Indices kept when reducing `n` time-ordered items to at most `max`.
///
/// Return
/// ------
/// * strictly increasing indices in `0..n`; `0..n` itself when `n <= max`
pub fn select_indices(n: usize, max: usize) -> Vec<usize> {
    if n <= max {
        return (0..n).collect();
    }
    match max {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let step = (n - 1) as f64 / (max - 1) as f64;
            (0..max)
                .map(|i| ((i as f64 * step).round() as usize).min(n - 1))
                .dedup()
                .collect()
        }
    }
}

/// Reduce one satellite's observations to at most `max` along its full timeline.
///
/// The output is sorted by time. When `observations.len() <= max` the input is
/// returned unchanged apart from that ordering.
pub fn downsample(observations: &[Observation], max: usize) -> Vec<Observation> {
    let sorted = sorted_by_time(observations);
    select_indices(sorted.len(), max)
        .into_iter()
        .map(|i| sorted[i].clone())
        .collect()
}

/// Reduce one satellite's observations to at most `max`, sampling inside each track.
///
/// Observations must carry their track ids. Tracks are ordered by their first
/// observation.
pub fn downsample_by_track(observations: &[Observation], max: usize) -> Vec<Observation> {
    if observations.len() <= max {
        return sorted_by_time(observations);
    }

    let sorted = sorted_by_time(observations);
    let tracks: Vec<Vec<Observation>> = sorted
        .into_iter()
        .into_group_map_by(|obs| obs.track_id)
        .into_values()
        .sorted_by(|a, b| by_time(&a[0].time, &b[0].time))
        .collect();

    if tracks.len() > max {
        return downsample(observations, max);
    }

    let sizes: Vec<usize> = tracks.iter().map(Vec::len).collect();
    let quotas = track_quotas(&sizes, max);

    tracks
        .iter()
        .zip(quotas)
        .flat_map(|(track, quota)| {
            select_indices(track.len(), quota)
                .into_iter()
                .map(|i| track[i].clone())
                .collect::<Vec<_>>()
        })
        .sorted_by(|a, b| by_time(&a.time, &b.time))
        .collect()
}

/// Dispatch on the configured mode.
pub fn downsample_with(
    observations: &[Observation],
    max: usize,
    mode: DownsampleMode,
) -> Vec<Observation> {
    match mode {
        DownsampleMode::Timeline => downsample(observations, max),
        DownsampleMode::TrackPreserving => downsample_by_track(observations, max),
    }
}

/// Per-track slot counts summing to `max`.
///
/// Requires `sizes.len() <= max < sizes.iter().sum()`.
fn track_quotas(sizes: &[usize], max: usize) -> Vec<usize> {
    let k = sizes.len();
    let total: usize = sizes.iter().sum();
    let spare = max - k;
    let denom = total - k;

    let mut quotas: Vec<usize> = sizes.iter().map(|n| 1 + spare * (n - 1) / denom).collect();
    let assigned: usize = quotas.iter().sum();
    let leftover = max - assigned;

    let by_remainder = (0..k)
        .map(|i| (i, spare * (sizes[i] - 1) % denom))
        .filter(|(_, rem)| *rem > 0)
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .map(|(i, _)| i);

    for i in by_remainder.take(leftover) {
        quotas[i] = (quotas[i] + 1).min(sizes[i]);
    }
    quotas
}

fn sorted_by_time(observations: &[Observation]) -> Vec<Observation> {
    observations
        .iter()
        .cloned()
        .sorted_by(|a, b| by_time(&a.time, &b.time))
        .collect()
}

#[cfg(test)]
mod downsample_test {
    use super::*;
    use crate::synthetic::topocentric::TopocentricCoordinates;
    use hifitime::{Epoch, Unit};
    use proptest::prelude::*;

    fn series(n: usize, track_len: usize) -> Vec<Observation> {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let coords = TopocentricCoordinates {
            ra: 0.0,
            dec: 0.0,
            elevation: 20.0,
            azimuth: 0.0,
            range: 36_000.0,
        };
        (0..n)
            .map(|i| {
                Observation::real(1, t0 + Unit::Minute * (10 * i as i64), &coords)
                    .with_track((i / track_len.max(1)) as u32 + 1)
            })
            .collect()
    }

    #[test]
    fn test_66_to_30_keeps_endpoints() {
        let obs = series(66, 66);
        let out = downsample(&obs, 30);
        assert_eq!(out.len(), 30);
        assert_eq!(out.first().unwrap().time, obs[0].time);
        assert_eq!(out.last().unwrap().time, obs[65].time);
    }

    #[test]
    fn test_no_op_when_within_limit() {
        let obs = series(20, 20);
        assert_eq!(downsample(&obs, 30), obs);
        assert_eq!(downsample(&obs, 20), obs);
    }

    #[test]
    fn test_max_one_keeps_first() {
        let obs = series(5, 5);
        let out = downsample(&obs, 1);
        assert_eq!(out, vec![obs[0].clone()]);
    }

    #[test]
    fn test_select_indices_rounding() {
        // step 9/4 = 2.25 -> 0, 2.25, 4.5, 6.75, 9
        assert_eq!(select_indices(10, 5), vec![0, 2, 5, 7, 9]);
        assert_eq!(select_indices(3, 0), Vec::<usize>::new());
    }

    #[test]
    fn test_track_quotas_largest_remainder() {
        // spare 6 split over extras 9, 4, 0 (denom 13): 4.15, 1.85, 0
        assert_eq!(track_quotas(&[10, 5, 1], 9), vec![5, 3, 1]);
        assert_eq!(track_quotas(&[100, 1, 1], 3), vec![1, 1, 1]);
    }

    #[test]
    fn test_by_track_keeps_every_track() {
        let obs = series(60, 20);
        let out = downsample_by_track(&obs, 12);
        assert_eq!(out.len(), 12);
        for track in 1..=3 {
            assert_eq!(out.iter().filter(|o| o.track_id == track).count(), 4);
        }
        assert!(out.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_by_track_falls_back_with_many_tracks() {
        let obs = series(40, 2);
        assert_eq!(downsample_by_track(&obs, 5), downsample(&obs, 5));
    }

    proptest! {
        #[test]
        fn output_bounded_and_keeps_endpoints(n in 1usize..400, max in 1usize..250) {
            let idx = select_indices(n, max);
            prop_assert!(idx.len() <= max.min(n));
            prop_assert!(idx.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(idx[0], 0);
            if max > 1 || n == 1 {
                prop_assert_eq!(*idx.last().unwrap(), n - 1);
            }
        }

        #[test]
        fn by_track_bounded(n in 2usize..300, track_len in 1usize..40, max in 1usize..60) {
            let obs = series(n, track_len);
            let out = downsample_by_track(&obs, max);
            prop_assert!(out.len() <= max.min(n));
        }
    }
}
