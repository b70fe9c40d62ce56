//! # Track binning
//!
//! Splits one satellite's time-sorted observations into tracks: a new track starts
//! whenever the gap since the previous observation exceeds the regime's gap threshold.
//! Track ids are `1, 2, …` per satellite, in time order.
//!
//! Sparse inputs keep every track, even single-observation ones. Dense pipelines may
//! raise [`TrackPolicy::min_track_size`] to drop short tracks; surviving tracks are then
//! renumbered so ids stay contiguous.

use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::{Hours, TrackId};
use crate::observation::Observation;
use crate::time::{by_time, hours_between};

/// Track filtering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPolicy {
    /// Tracks with fewer observations are dropped; `1` keeps everything
    pub min_track_size: usize,
}

impl Default for TrackPolicy {
    fn default() -> Self {
        TrackPolicy { min_track_size: 1 }
    }
}

/// Assign track ids to the observations of one satellite.
///
/// Arguments
/// ---------
/// * `observations`: one satellite's observations, in any order
/// * `gap_threshold`: largest gap (hours) allowed inside a track
/// * `policy`: minimum track size
///
/// Return
/// ------
/// * the observations sorted by time with their `track_id` set
pub fn assign_tracks(
    observations: &[Observation],
    gap_threshold: Hours,
    policy: &TrackPolicy,
) -> Vec<Observation> {
    let sorted: Vec<&Observation> = observations
        .iter()
        .sorted_by(|a, b| by_time(&a.time, &b.time))
        .collect();

    let mut tracks: Vec<Vec<&Observation>> = Vec::new();
    let mut previous: Option<Epoch> = None;
    for obs in sorted {
        let split =
            previous.map_or(true, |prev| hours_between(&prev, &obs.time) > gap_threshold);
        if split {
            tracks.push(Vec::new());
        }
        if let Some(track) = tracks.last_mut() {
            track.push(obs);
        }
        previous = Some(obs.time);
    }

    tracks
        .into_iter()
        .filter(|track| track.len() >= policy.min_track_size)
        .enumerate()
        .flat_map(|(i, track)| {
            let track_id = (i + 1) as TrackId;
            track.into_iter().map(move |obs| obs.with_track(track_id))
        })
        .collect()
}

/// Number of distinct tracks in a set of observations.
pub fn track_count(observations: &[Observation]) -> usize {
    observations.iter().map(|o| o.track_id).unique().count()
}
