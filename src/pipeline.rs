//! # Pipeline entry point
//!
//! [`Pipeline::run`] drives one request through every stage:
//!
//! ```text
//! request ─► tier / strategy parsing ─► credential ─► regime classification
//!         ─► query plan (+ hybrid count) ─► concurrent fetch ─► validation
//!         ─► topocentric observations ─► track binning ─► downsampling
//!         ─► simulation gate ─► gap analysis ─► synthesis ─► merge ─► output
//! ```
//!
//! ## Failure semantics
//!
//! | Failure                               | Effect                                    |
//! |---------------------------------------|-------------------------------------------|
//! | unknown tier / strategy, bad request  | `Err`, before any fetch                   |
//! | credential unavailable                | `Err`, before any fetch                   |
//! | required column absent from every row | `Err`                                     |
//! | non-physical elements                 | satellite not fetched, reported           |
//! | failed fetch task                     | fragment excluded, reported               |
//! | cancellation                          | interrupted satellites dropped, reported  |
//! | propagation error                     | candidate skipped, counted                |
//! | degenerate gaps / simulation gate     | no synthesis for the satellite, reported  |
//!
//! Anything else yields a best-effort [`PipelineOutput`] whose metadata explains every
//! exclusion. An empty output always carries a warning saying why.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hifitime::Epoch;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogQuery, Credential, TokenProvider, WindowSpec};
use crate::config::PipelineConfig;
use crate::constants::{SatelliteId, TrackId};
use crate::downsample::downsample_with;
use crate::elements::{ElementCatalog, SatelliteElementSet};
use crate::gaps::{analyze_gaps, GapAnalysis};
use crate::merge::{merge, GapStats, MergedSatellite};
use crate::observation::Observation;
use crate::orchestrator::{build_tasks, fetch_all, FetchReport};
use crate::regime::{classify_elements, primary_regime, OrbitRegime, RegimeClassification};
use crate::strategy::{resolve_hybrid, select_strategy, QueryPlan, SearchStrategy};
use crate::synthetic::{
    observe, OrbitPropagator, SunlitCheck, SynthesisJob, SynthesisOutcome,
    SyntheticObservationGenerator,
};
use crate::tier::{route, QualityTier, QualityTierPolicy};
use crate::time::{hours_between, iso8601};
use crate::tracks::{assign_tracks, TrackPolicy};
use crate::trackfill_errors::PipelineError;
use crate::validation::{validate, ValidationReport};

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub satellite_ids: Vec<SatelliteId>,
    #[serde(with = "iso8601")]
    pub start_time: Epoch,
    #[serde(with = "iso8601")]
    pub end_time: Epoch,
    /// `T1` .. `T4`
    pub quality_tier: String,
    /// `auto`, `fast`, `windowed` or `hybrid`
    pub search_strategy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classification,
    Fetch,
    Cancellation,
    Synthesis,
}

/// A satellite (or one of its queries) excluded from the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub satellite_id: SatelliteId,
    pub reason: String,
}

/// Non-blocking anomaly surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineWarning {
    pub satellite_id: Option<SatelliteId>,
    pub message: String,
}

/// Record counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub requested_satellites: usize,
    pub classified_satellites: usize,
    pub fetch_tasks: usize,
    pub fetch_failures: usize,
    pub fetched_rows: usize,
    pub validated_records: usize,
    pub real_observations: usize,
    pub downsampled_observations: usize,
    pub synthetic_observations: usize,
    pub output_observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetadata {
    pub quality_tier: QualityTier,
    pub tier_policy: QualityTierPolicy,
    pub query_plan: Option<QueryPlan>,
    pub regimes: BTreeMap<SatelliteId, OrbitRegime>,
    pub stage_counts: StageCounts,
    /// Synthetic share of the whole output
    pub synthetic_ratio: f64,
    pub gap_reduction_stats: BTreeMap<SatelliteId, GapStats>,
    pub validation: ValidationReport,
    pub synthesis: Vec<SynthesisOutcome>,
    pub failures: Vec<PipelineFailure>,
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub observations: Vec<Observation>,
    pub metadata: PipelineMetadata,
}

/// A requested satellite after classification.
struct SatellitePlan {
    id: SatelliteId,
    elements: Option<SatelliteElementSet>,
    classification: Option<RegimeClassification>,
    regime: OrbitRegime,
}

/// A satellite after binning and downsampling.
struct PreparedSatellite<'a> {
    plan: &'a SatellitePlan,
    observations: Vec<Observation>,
}

pub struct Pipeline {
    config: PipelineConfig,
    tokens: Arc<dyn TokenProvider>,
    catalog: Arc<dyn CatalogQuery>,
    elements: Arc<dyn ElementCatalog>,
    propagator: Arc<dyn OrbitPropagator>,
    sunlit: Arc<dyn SunlitCheck>,
}

impl Pipeline {
    /// Assemble a pipeline from its configuration and collaborators.
    ///
    /// Fails with [`PipelineError::InvalidConfiguration`] if the configuration does not
    /// validate.
    pub fn new(
        config: PipelineConfig,
        tokens: Arc<dyn TokenProvider>,
        catalog: Arc<dyn CatalogQuery>,
        elements: Arc<dyn ElementCatalog>,
        propagator: Arc<dyn OrbitPropagator>,
        sunlit: Arc<dyn SunlitCheck>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Pipeline {
            config,
            tokens,
            catalog,
            elements,
            propagator,
            sunlit,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request.
    ///
    /// Arguments
    /// ---------
    /// * `request`: satellites, span, tier and strategy
    /// * `cancel`: cooperative cancellation of the fetch stage
    ///
    /// Return
    /// ------
    /// * the merged observations with the run metadata, or a fatal error
    pub async fn run(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let policy = route(&request.quality_tier)?;
        let tier = policy.tier;
        let strategy: SearchStrategy = request.search_strategy.parse()?;
        if request.satellite_ids.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "no satellite requested".into(),
            ));
        }
        if request.start_time >= request.end_time {
            return Err(PipelineError::InvalidTimeRange);
        }

        let credential = self.tokens.token()?;

        let mut metadata = PipelineMetadata {
            quality_tier: tier,
            tier_policy: *policy,
            query_plan: None,
            regimes: BTreeMap::new(),
            stage_counts: StageCounts::default(),
            synthetic_ratio: 0.0,
            gap_reduction_stats: BTreeMap::new(),
            validation: ValidationReport::default(),
            synthesis: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        };

        let satellite_ids: Vec<SatelliteId> =
            request.satellite_ids.iter().copied().unique().collect();
        if satellite_ids.len() < request.satellite_ids.len() {
            metadata.warnings.push(PipelineWarning {
                satellite_id: None,
                message: "duplicate satellite ids in request were merged".into(),
            });
        }
        metadata.stage_counts.requested_satellites = satellite_ids.len();

        info!(
            satellites = satellite_ids.len(),
            tier = %tier,
            strategy = ?strategy,
            start = %request.start_time,
            end = %request.end_time,
            "pipeline run started"
        );

        // --- classification
        let plans = self.classify(&satellite_ids, &mut metadata);
        metadata.stage_counts.classified_satellites =
            plans.iter().filter(|p| p.classification.is_some()).count();
        for plan in &plans {
            metadata.regimes.insert(plan.id, plan.regime);
        }

        if plans.is_empty() {
            return Ok(finish(metadata, Vec::new()));
        }

        // --- query plan and fetch
        // whole days, rounded down
        let span_days = (hours_between(&request.start_time, &request.end_time) / 24.0).floor();
        let mut query_plan = select_strategy(plans.len(), span_days, strategy);
        if query_plan == QueryPlan::Hybrid {
            query_plan = self
                .resolve_hybrid_plan(&credential, &plans, request, cancel, &mut metadata)
                .await;
        }
        metadata.query_plan = Some(query_plan);
        info!(plan = %query_plan, span_days, "query plan selected");

        let windows: Vec<(SatelliteId, f64)> = plans
            .iter()
            .map(|p| (p.id, p.regime.gap_threshold_hours()))
            .collect();
        let tasks = build_tasks(query_plan, &windows, request.start_time, request.end_time)?;
        metadata.stage_counts.fetch_tasks = tasks.len();

        let report = fetch_all(Arc::clone(&self.catalog), &credential, tasks, cancel).await;
        record_fetch(&report, &mut metadata);

        // --- validation
        let fetched: Vec<SatelliteId> = plans
            .iter()
            .map(|p| p.id)
            .filter(|id| !report.cancelled_satellites.contains(id))
            .collect();
        let (vectors, validation) =
            validate(&report.rows, &fetched, |id| self.elements.element_set(id).is_some())?;
        metadata.stage_counts.validated_records = validation.output_records;
        for w in &validation.warnings {
            metadata.warnings.push(PipelineWarning {
                satellite_id: Some(w.satellite_id),
                message: w.message.clone(),
            });
        }
        metadata.validation = validation;
        info!(
            records = metadata.validation.output_records,
            duplicates = metadata.validation.duplicates_removed,
            dropped = metadata.validation.dropped_rows,
            "validation done"
        );

        // --- real observations, per satellite
        let site = &self.config.synthesis.sensor_site;
        let mut real_by_sat: HashMap<SatelliteId, Vec<Observation>> = HashMap::new();
        for sv in &vectors {
            let coords = observe(site, &sv.position, &sv.epoch);
            real_by_sat
                .entry(sv.satellite_id)
                .or_default()
                .push(Observation::real(sv.satellite_id, sv.epoch, &coords));
        }
        metadata.stage_counts.real_observations = vectors.len();

        // --- tracks and downsampling
        let active: Vec<&SatellitePlan> = plans
            .iter()
            .filter(|p| real_by_sat.contains_key(&p.id))
            .collect();
        let prepared: Vec<PreparedSatellite<'_>> = active
            .par_iter()
            .map(|&plan| {
                let real = real_by_sat.get(&plan.id).map(Vec::as_slice).unwrap_or(&[]);
                let tracked = assign_tracks(
                    real,
                    plan.regime.gap_threshold_hours(),
                    &self.config.track_policy,
                );
                let observations = if policy.downsample {
                    let kept = downsample_with(
                        &tracked,
                        policy.max_obs_per_satellite,
                        self.config.downsample_mode,
                    );
                    // thinning can open gaps wider than the threshold inside a track
                    assign_tracks(
                        &kept,
                        plan.regime.gap_threshold_hours(),
                        &TrackPolicy::default(),
                    )
                } else {
                    tracked
                };
                PreparedSatellite {
                    plan,
                    observations,
                }
            })
            .collect();

        for p in &prepared {
            let before = real_by_sat.get(&p.plan.id).map_or(0, Vec::len);
            if before != p.observations.len() {
                debug!(
                    satellite_id = p.plan.id,
                    before,
                    after = p.observations.len(),
                    "downsampled"
                );
            }
        }
        metadata.stage_counts.downsampled_observations =
            prepared.iter().map(|p| p.observations.len()).sum();

        // --- synthesis
        let mut synthetic = if policy.simulate {
            self.synthesize(&prepared, policy, &mut metadata)
        } else {
            debug!(tier = %tier, "tier does not simulate");
            HashMap::new()
        };

        // --- merge
        let merged: Vec<MergedSatellite> = prepared
            .into_iter()
            .map(|p| {
                let fill = synthetic.remove(&p.plan.id).unwrap_or_default();
                merge(p.plan.id, p.observations, fill)
            })
            .collect();

        for m in &merged {
            metadata.gap_reduction_stats.insert(m.satellite_id, m.gap_stats);
        }
        let observations: Vec<Observation> =
            merged.into_iter().flat_map(|m| m.observations).collect();

        Ok(finish(metadata, observations))
    }

    fn classify(
        &self,
        satellite_ids: &[SatelliteId],
        metadata: &mut PipelineMetadata,
    ) -> Vec<SatellitePlan> {
        let mut classified: Vec<(
            SatelliteId,
            Option<SatelliteElementSet>,
            Option<RegimeClassification>,
        )> = Vec::new();

        for id in satellite_ids {
            match self.elements.element_set(*id) {
                Some(elements) => match classify_elements(&elements) {
                    Ok(classification) => {
                        debug!(
                            satellite_id = id,
                            regime = %classification.regime,
                            sma_km = classification.semi_major_axis,
                            "classified"
                        );
                        classified.push((*id, Some(elements), Some(classification)));
                    }
                    Err(err) => {
                        warn!(satellite_id = id, error = %err, "classification failed");
                        metadata.failures.push(PipelineFailure {
                            stage: Stage::Classification,
                            satellite_id: *id,
                            reason: err.to_string(),
                        });
                    }
                },
                None => classified.push((*id, None, None)),
            }
        }

        let primary = primary_regime(
            classified
                .iter()
                .filter_map(|(_, _, c)| c.as_ref().map(|c| &c.regime)),
        );

        classified
            .into_iter()
            .map(|(id, elements, classification)| {
                let regime = classification.map_or(primary, |c| c.regime);
                if classification.is_none() {
                    debug!(satellite_id = id, regime = %regime, "no element set, using primary regime");
                }
                SatellitePlan {
                    id,
                    elements,
                    classification,
                    regime,
                }
            })
            .collect()
    }

    async fn resolve_hybrid_plan(
        &self,
        credential: &Credential,
        plans: &[SatellitePlan],
        request: &PipelineRequest,
        cancel: &CancellationToken,
        metadata: &mut PipelineMetadata,
    ) -> QueryPlan {
        let sample = WindowSpec::new(plans[0].id, request.start_time, request.end_time);
        let counted = tokio::select! {
            _ = cancel.cancelled() => Err("cancelled".to_string()),
            result = self.catalog.count(credential, &sample) => result,
        };

        match counted {
            Ok(count) => {
                let plan = resolve_hybrid(count, plans.len(), self.config.hybrid_threshold);
                info!(sampled = count, satellites = plans.len(), plan = %plan, "hybrid plan resolved");
                plan
            }
            Err(reason) => {
                warn!(%reason, "hybrid count query failed, falling back to fast plan");
                metadata.warnings.push(PipelineWarning {
                    satellite_id: Some(sample.satellite_id),
                    message: format!("count query failed ({reason}), fast plan used"),
                });
                QueryPlan::Fast
            }
        }
    }

    fn synthesize(
        &self,
        prepared: &[PreparedSatellite<'_>],
        policy: &QualityTierPolicy,
        metadata: &mut PipelineMetadata,
    ) -> HashMap<SatelliteId, Vec<Observation>> {
        let synthesis = &self.config.synthesis;
        let gate = &self.config.simulation_gate;
        let mut jobs: Vec<SynthesisJob<'_>> = Vec::new();

        for p in prepared {
            let id = p.plan.id;
            let (Some(elements), Some(classification)) =
                (p.plan.elements.as_ref(), p.plan.classification.as_ref())
            else {
                skip(metadata, id, "no element set available, simulation skipped");
                continue;
            };

            let real_count = p.observations.len();
            if real_count < gate.min_real_observations {
                skip(
                    metadata,
                    id,
                    &format!(
                        "{real_count} real observation(s), {} needed for simulation",
                        gate.min_real_observations
                    ),
                );
                continue;
            }

            let period = classification.period_hours;
            let span = match (p.observations.first(), p.observations.last()) {
                (Some(first), Some(last)) => hours_between(&first.time, &last.time),
                _ => 0.0,
            };
            if span < gate.min_coverage_periods * period {
                skip(
                    metadata,
                    id,
                    &format!(
                        "real coverage {:.2} period(s), {} needed for simulation",
                        span / period,
                        gate.min_coverage_periods
                    ),
                );
                continue;
            }

            let analysis = analyze_gaps(&p.observations, period, synthesis.bins_per_period);
            if let GapAnalysis::Degenerate { span_hours, bin_width_hours } = analysis {
                skip(
                    metadata,
                    id,
                    &format!(
                        "span {span_hours:.2} h shorter than one {bin_width_hours:.2} h bin, simulation skipped"
                    ),
                );
                continue;
            }

            let next_track_id: TrackId = p
                .observations
                .iter()
                .map(|o| o.track_id)
                .max()
                .unwrap_or(0)
                + 1;

            jobs.push(SynthesisJob {
                satellite_id: id,
                elements,
                real_count,
                empty_bins: analysis.empty_bins(),
                next_track_id,
                max_synthetic_ratio: policy.max_synthetic_ratio,
            });
        }

        let generator =
            SyntheticObservationGenerator::new(&*self.propagator, &*self.sunlit, synthesis);
        let mut synthetic = HashMap::new();
        for result in generator.generate_all(&jobs) {
            match result {
                Ok(mut outcome) => {
                    let observations = std::mem::take(&mut outcome.observations);
                    metadata.stage_counts.synthetic_observations += observations.len();
                    synthetic.insert(outcome.satellite_id, observations);
                    metadata.synthesis.push(outcome);
                }
                Err(failure) => {
                    metadata.failures.push(PipelineFailure {
                        stage: Stage::Synthesis,
                        satellite_id: failure.satellite_id,
                        reason: failure.reason,
                    });
                }
            }
        }

        info!(
            jobs = jobs.len(),
            synthetic = metadata.stage_counts.synthetic_observations,
            "synthesis done"
        );
        synthetic
    }
}

fn skip(metadata: &mut PipelineMetadata, satellite_id: SatelliteId, message: &str) {
    debug!(satellite_id, message, "simulation skipped");
    metadata.warnings.push(PipelineWarning {
        satellite_id: Some(satellite_id),
        message: message.to_string(),
    });
}

fn record_fetch(report: &FetchReport, metadata: &mut PipelineMetadata) {
    metadata.stage_counts.fetch_failures = report.failures.len();
    metadata.stage_counts.fetched_rows = report.rows.len();
    for failure in &report.failures {
        metadata.failures.push(PipelineFailure {
            stage: Stage::Fetch,
            satellite_id: failure.satellite_id,
            reason: format!(
                "{} (window {} .. {})",
                failure.reason, failure.window.start, failure.window.end
            ),
        });
    }
    for id in &report.cancelled_satellites {
        metadata.failures.push(PipelineFailure {
            stage: Stage::Cancellation,
            satellite_id: *id,
            reason: "fetch interrupted by cancellation, satellite dropped".into(),
        });
    }
}

/// Final counts, ratio and the explanation of an empty result.
fn finish(mut metadata: PipelineMetadata, observations: Vec<Observation>) -> PipelineOutput {
    let total = observations.len();
    let synthetic = observations.iter().filter(|o| o.is_simulated).count();
    metadata.stage_counts.output_observations = total;
    metadata.synthetic_ratio = if total == 0 {
        0.0
    } else {
        synthetic as f64 / total as f64
    };

    if total == 0 {
        let counts = &metadata.stage_counts;
        let why = if counts.classified_satellites == 0 && metadata.regimes.is_empty() {
            "no requested satellite could be classified"
        } else if counts.fetch_tasks > 0
            && counts.fetched_rows == 0
            && counts.fetch_failures == counts.fetch_tasks
        {
            "every catalog query failed"
        } else if metadata
            .failures
            .iter()
            .any(|f| f.stage == Stage::Cancellation)
            && counts.fetched_rows == 0
        {
            "the run was cancelled before any satellite completed"
        } else if counts.fetched_rows == 0 {
            "the catalog returned no records for the requested satellites and span"
        } else {
            "every fetched record was rejected during validation"
        };
        warn!(reason = why, "pipeline produced no observations");
        metadata.warnings.push(PipelineWarning {
            satellite_id: None,
            message: format!("empty output: {why}"),
        });
    }

    info!(
        observations = total,
        synthetic,
        failures = metadata.failures.len(),
        warnings = metadata.warnings.len(),
        "pipeline run finished"
    );

    PipelineOutput {
        observations,
        metadata,
    }
}
