#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use hifitime::{Epoch, Unit};
use nalgebra::Vector3;
use serde_json::{json, Value};

use trackfill::catalog::{CatalogQuery, CatalogRow, Credential, TokenProvider, WindowSpec};
use trackfill::constants::SatelliteId;
use trackfill::elements::{ElementCatalog, SatelliteElementSet};
use trackfill::synthetic::{OrbitPropagator, SensorSite, SunlitCheck};
use trackfill::time::to_iso8601;
use trackfill::{Pipeline, PipelineConfig, PipelineError, PipelineRequest};

pub const GEO_RADIUS_KM: f64 = 42_164.0;

pub fn t0() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2024, 1, 1)
}

/// A catalog row at `epoch` on a circular equatorial GEO orbit.
pub fn geo_row(satellite_id: SatelliteId, epoch: Epoch) -> CatalogRow {
    let value = json!({
        "satNo": satellite_id,
        "epoch": to_iso8601(&epoch),
        "xpos": GEO_RADIUS_KM, "ypos": 0.0, "zpos": 0.0,
        "xvel": 0.0, "yvel": 3.0747, "zvel": 0.0,
        "source": "mock",
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Two clusters of `per_cluster` one-minute-spaced rows, the second ending `span_hours`
/// after the first cluster starts.
pub fn clustered_rows(
    satellite_id: SatelliteId,
    per_cluster: usize,
    span_hours: f64,
) -> Vec<CatalogRow> {
    let last = (per_cluster - 1) as f64;
    let first = (0..per_cluster).map(|m| t0() + Unit::Minute * m as f64);
    let second = (0..per_cluster)
        .map(|m| t0() + Unit::Hour * span_hours - Unit::Minute * (last - m as f64));
    first
        .chain(second)
        .map(|epoch| geo_row(satellite_id, epoch))
        .collect()
}

/// In-memory catalog answering by time window.
#[derive(Default)]
pub struct MockCatalog {
    pub rows: HashMap<SatelliteId, Vec<CatalogRow>>,
    pub failing: HashSet<SatelliteId>,
    pub slow: HashSet<SatelliteId>,
    pub count: Option<u64>,
    /// Rows served by the window of a satellite that contains the given epoch,
    /// whatever their own epoch
    pub window_rows: Vec<(SatelliteId, Epoch, CatalogRow)>,
    /// Latency of the window of a satellite that contains the given epoch
    pub window_delays: Vec<(SatelliteId, Epoch, StdDuration)>,
    pub fetch_calls: AtomicUsize,
    pub count_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn with_rows(mut self, satellite_id: SatelliteId, rows: Vec<CatalogRow>) -> Self {
        self.rows.entry(satellite_id).or_default().extend(rows);
        self
    }

    pub fn failing(mut self, satellite_id: SatelliteId) -> Self {
        self.failing.insert(satellite_id);
        self
    }

    pub fn slow(mut self, satellite_id: SatelliteId) -> Self {
        self.slow.insert(satellite_id);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_row_in_window(
        mut self,
        satellite_id: SatelliteId,
        window_epoch: Epoch,
        row: CatalogRow,
    ) -> Self {
        self.window_rows.push((satellite_id, window_epoch, row));
        self
    }

    pub fn delayed_window(
        mut self,
        satellite_id: SatelliteId,
        window_epoch: Epoch,
        delay: StdDuration,
    ) -> Self {
        self.window_delays.push((satellite_id, window_epoch, delay));
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogQuery for MockCatalog {
    async fn fetch(
        &self,
        _credential: &Credential,
        spec: &WindowSpec,
    ) -> Result<Vec<CatalogRow>, String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.contains(&spec.satellite_id) {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
        }
        for (id, epoch, delay) in &self.window_delays {
            if *id == spec.satellite_id && spec.window.contains(epoch) {
                tokio::time::sleep(*delay).await;
            }
        }
        if self.failing.contains(&spec.satellite_id) {
            return Err(format!("HTTP 503 for satellite {}", spec.satellite_id));
        }
        let mut rows: Vec<CatalogRow> = self
            .rows
            .get(&spec.satellite_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        row.get("epoch")
                            .and_then(Value::as_str)
                            .and_then(|s| trackfill::time::parse_epoch(s).ok())
                            .is_some_and(|epoch| spec.window.contains(&epoch))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.extend(
            self.window_rows
                .iter()
                .filter(|(id, epoch, _)| *id == spec.satellite_id && spec.window.contains(epoch))
                .map(|(_, _, row)| row.clone()),
        );
        Ok(rows)
    }

    async fn count(&self, _credential: &Credential, _spec: &WindowSpec) -> Result<u64, String> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.count.ok_or_else(|| "count not supported".to_string())
    }
}

pub fn geo_elements(satellite_id: SatelliteId) -> SatelliteElementSet {
    SatelliteElementSet::new(satellite_id, 1.0027, 0.0002, t0(), vec![])
}

pub fn element_catalog(ids: &[SatelliteId]) -> HashMap<SatelliteId, SatelliteElementSet> {
    ids.iter().map(|id| (*id, geo_elements(*id))).collect()
}

pub fn token_ok() -> Arc<dyn TokenProvider> {
    Arc::new(|| -> Result<Credential, PipelineError> { Ok(Credential::new("test-token")) })
}

/// Places the satellite straight above the sensor site, at GEO distance.
pub fn overhead_propagator(site: SensorSite) -> Arc<dyn OrbitPropagator> {
    let propagate = move |_: &SatelliteElementSet, epoch: Epoch| {
        let up = site.inertial_position(&epoch).normalize();
        Ok::<_, String>((up * GEO_RADIUS_KM, Vector3::<f64>::zeros()))
    };
    Arc::new(propagate)
}

pub fn always_sunlit() -> Arc<dyn SunlitCheck> {
    Arc::new(|_: &Vector3<f64>, _: Epoch| true)
}

pub fn pipeline(
    catalog: Arc<MockCatalog>,
    elements: HashMap<SatelliteId, SatelliteElementSet>,
) -> Pipeline {
    pipeline_with(PipelineConfig::default(), token_ok(), catalog, elements)
}

pub fn pipeline_with(
    config: PipelineConfig,
    tokens: Arc<dyn TokenProvider>,
    catalog: Arc<MockCatalog>,
    elements: HashMap<SatelliteId, SatelliteElementSet>,
) -> Pipeline {
    let propagator = overhead_propagator(config.synthesis.sensor_site.clone());
    let elements: Arc<dyn ElementCatalog> = Arc::new(elements);
    let catalog: Arc<dyn CatalogQuery> = catalog;
    Pipeline::new(config, tokens, catalog, elements, propagator, always_sunlit())
        .expect("default configuration is valid")
}

pub fn request(ids: &[SatelliteId], hours: f64, tier: &str, strategy: &str) -> PipelineRequest {
    PipelineRequest {
        satellite_ids: ids.to_vec(),
        start_time: t0(),
        end_time: t0() + Unit::Hour * hours,
        quality_tier: tier.to_string(),
        search_strategy: strategy.to_string(),
    }
}
