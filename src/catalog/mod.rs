//! # Remote catalog boundary
//!
//! The pipeline never talks HTTP itself. It consumes two collaborators:
//!
//! * a [`TokenProvider`] issuing an opaque [`Credential`] once per run (never refreshed),
//! * a [`CatalogQuery`] answering one [`WindowSpec`] at a time with zero or more raw
//!   [`CatalogRow`]s, or a count of matching records for hybrid planning.
//!
//! Raw rows are loosely typed JSON objects; they only become typed
//! [`StateVector`]s after validation.

pub mod state_vector;

use std::fmt;

use async_trait::async_trait;
use hifitime::Epoch;
use serde::Serialize;

use crate::constants::SatelliteId;
use crate::strategy::TimeWindow;
use crate::time::to_iso8601;
use crate::trackfill_errors::PipelineError;

pub use state_vector::{StateVector, REQUIRED_FIELDS};

/// One raw record as returned by the catalog service.
pub type CatalogRow = serde_json::Map<String, serde_json::Value>;

/// Opaque access credential.
///
/// The token content is never logged: `Debug` prints a placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Issues the credential used by every query of a run.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Result<Credential, PipelineError>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Result<Credential, PipelineError> + Send + Sync,
{
    fn token(&self) -> Result<Credential, PipelineError> {
        self()
    }
}

/// Parameters of one catalog query: a satellite and the interval to search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSpec {
    pub satellite_id: SatelliteId,
    pub window: TimeWindow,
}

impl WindowSpec {
    pub fn new(satellite_id: SatelliteId, start: Epoch, end: Epoch) -> Self {
        WindowSpec {
            satellite_id,
            window: TimeWindow::new(start, end),
        }
    }

    /// Query parameters in the catalog's `field=value` convention, with the epoch
    /// constraint written as an inclusive `start..end` range.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("satNo", self.satellite_id.to_string()),
            (
                "epoch",
                format!(
                    "{}..{}",
                    to_iso8601(&self.window.start),
                    to_iso8601(&self.window.end)
                ),
            ),
        ]
    }
}

/// Remote state-vector catalog.
///
/// Failures are reported as plain messages; the orchestrator attributes them to the
/// satellite and window of the query.
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// Fetch every record matching `spec`.
    async fn fetch(
        &self,
        credential: &Credential,
        spec: &WindowSpec,
    ) -> Result<Vec<CatalogRow>, String>;

    /// Count the records matching `spec` without transferring them.
    async fn count(&self, credential: &Credential, spec: &WindowSpec) -> Result<u64, String>;
}
