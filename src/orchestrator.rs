//! # Fetch orchestration
//!
//! Fans the planned queries out to the [`CatalogQuery`] collaborator and fans the
//! results back in.
//!
//! * One task per `(satellite, window)` for a windowed plan, one per satellite over the
//!   full span for a fast plan.
//! * All tasks are spawned at once on a [`JoinSet`] and awaited as a set. Each runs at
//!   most once: no retry, no backoff.
//! * A failing task (query error or panic) becomes a [`FetchFailure`] attributed to its
//!   satellite and window. Siblings are unaffected.
//! * Fragments are concatenated in **task order** (window-major, then satellite),
//!   whatever the completion order, so downstream deduplication is deterministic.
//! * Cancellation through a [`CancellationToken`] aborts everything still in flight;
//!   every satellite with an unfinished task is dropped entirely.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use hifitime::Epoch;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogQuery, CatalogRow, Credential, WindowSpec};
use crate::constants::{Hours, SatelliteId};
use crate::strategy::{plan_windows, QueryPlan, TimeWindow};
use crate::trackfill_errors::PipelineError;

/// A query that did not produce rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub satellite_id: SatelliteId,
    pub window: TimeWindow,
    pub reason: String,
}

/// Fan-in result of one orchestration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    /// Raw rows in task order
    #[serde(skip)]
    pub rows: Vec<CatalogRow>,
    pub tasks_issued: usize,
    pub tasks_succeeded: usize,
    pub failures: Vec<FetchFailure>,
    /// Satellites dropped because a task was interrupted
    pub cancelled_satellites: Vec<SatelliteId>,
}

impl FetchReport {
    pub fn was_cancelled(&self) -> bool {
        !self.cancelled_satellites.is_empty()
    }
}

/// Build the ordered task list of a run.
///
/// Arguments
/// ---------
/// * `plan`: a resolved plan (`Fast` or `Windowed`)
/// * `satellites`: each satellite with its window length (regime gap threshold), in
///   request order
/// * `start`, `end`: requested span
///
/// Return
/// ------
/// * the query specs, window-major then satellite order
pub fn build_tasks(
    plan: QueryPlan,
    satellites: &[(SatelliteId, Hours)],
    start: Epoch,
    end: Epoch,
) -> Result<Vec<WindowSpec>, PipelineError> {
    match plan {
        QueryPlan::Fast => {
            if start >= end {
                return Err(PipelineError::InvalidTimeRange);
            }
            Ok(satellites
                .iter()
                .map(|(id, _)| WindowSpec::new(*id, start, end))
                .collect())
        }
        QueryPlan::Windowed => {
            let per_satellite = satellites
                .iter()
                .map(|(id, window_hours)| Ok((*id, plan_windows(start, end, *window_hours)?)))
                .collect::<Result<Vec<_>, PipelineError>>()?;

            let max_windows = per_satellite
                .iter()
                .map(|(_, windows)| windows.len())
                .max()
                .unwrap_or(0);

            Ok((0..max_windows)
                .flat_map(|i| {
                    per_satellite.iter().filter_map(move |(id, windows)| {
                        windows.get(i).map(|w| WindowSpec {
                            satellite_id: *id,
                            window: *w,
                        })
                    })
                })
                .collect())
        }
        QueryPlan::Hybrid => Err(PipelineError::InvalidConfiguration(
            "hybrid plan must be resolved before building tasks".into(),
        )),
    }
}

enum TaskOutcome {
    Rows(Vec<CatalogRow>),
    Failed(String),
    Cancelled,
}

/// Issue every task concurrently and gather the results.
///
/// The returned report always accounts for every task: as rows, as a failure, or
/// through a cancelled satellite.
pub async fn fetch_all(
    query: Arc<dyn CatalogQuery>,
    credential: &Credential,
    tasks: Vec<WindowSpec>,
    cancel: &CancellationToken,
) -> FetchReport {
    let tasks_issued = tasks.len();
    let mut set = JoinSet::new();
    let mut index_of = HashMap::with_capacity(tasks_issued);

    for (index, spec) in tasks.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let query = Arc::clone(&query);
        let credential = credential.clone();
        let spec = *spec;
        let cancel = cancel.child_token();

        let handle = set.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => TaskOutcome::Cancelled,
                result = query.fetch(&credential, &spec) => match result {
                    Ok(rows) => TaskOutcome::Rows(rows),
                    Err(reason) => TaskOutcome::Failed(reason),
                },
            };
            (index, outcome)
        });
        index_of.insert(handle.id(), index);
    }

    info!(tasks = set.len(), planned = tasks_issued, "fetch tasks issued");

    let mut fragments: Vec<Option<Vec<CatalogRow>>> = vec![None; tasks_issued];
    let mut failures: Vec<(usize, String)> = Vec::new();
    let mut interrupted: BTreeSet<SatelliteId> = BTreeSet::new();

    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((_, (index, TaskOutcome::Rows(rows)))) => {
                debug!(
                    satellite_id = tasks[index].satellite_id,
                    rows = rows.len(),
                    "fetch task done"
                );
                fragments[index] = Some(rows);
            }
            Ok((_, (index, TaskOutcome::Failed(reason)))) => {
                failures.push((index, reason));
            }
            Ok((_, (index, TaskOutcome::Cancelled))) => {
                interrupted.insert(tasks[index].satellite_id);
            }
            Err(err) => {
                let Some(&index) = index_of.get(&err.id()) else {
                    continue;
                };
                if err.is_cancelled() {
                    interrupted.insert(tasks[index].satellite_id);
                } else {
                    failures.push((index, format!("fetch task panicked: {err}")));
                }
            }
        }
        if cancel.is_cancelled() && !set.is_empty() {
            set.abort_all();
        }
    }

    // a satellite is either kept whole or dropped whole
    if cancel.is_cancelled() {
        for (index, spec) in tasks.iter().enumerate() {
            if fragments[index].is_none() && !failures.iter().any(|(i, _)| *i == index) {
                interrupted.insert(spec.satellite_id);
            }
        }
    }

    failures.sort_by_key(|(index, _)| *index);
    let failures: Vec<FetchFailure> = failures
        .into_iter()
        .filter(|(index, _)| !interrupted.contains(&tasks[*index].satellite_id))
        .map(|(index, reason)| {
            let spec = &tasks[index];
            warn!(
                satellite_id = spec.satellite_id,
                %reason,
                "fetch task failed"
            );
            FetchFailure {
                satellite_id: spec.satellite_id,
                window: spec.window,
                reason,
            }
        })
        .collect();

    let tasks_succeeded = fragments.iter().filter(|f| f.is_some()).count();
    let rows: Vec<CatalogRow> = fragments
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !interrupted.contains(&tasks[*index].satellite_id))
        .filter_map(|(_, fragment)| fragment)
        .flatten()
        .collect();

    if !interrupted.is_empty() {
        warn!(
            satellites = ?interrupted,
            "fetch cancelled, interrupted satellites dropped"
        );
    }
    info!(
        tasks = tasks_issued,
        succeeded = tasks_succeeded,
        failed = failures.len(),
        rows = rows.len(),
        "fetch fan-in complete"
    );

    FetchReport {
        rows,
        tasks_issued,
        tasks_succeeded,
        failures,
        cancelled_satellites: interrupted.into_iter().collect(),
    }
}
