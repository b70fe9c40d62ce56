//! # Query planning
//!
//! Decides **how** the remote catalog is queried for a run:
//!
//! 1. [`query_strategy`] picks a fetch plan from the satellite count, the time span and
//!    the caller's preference (`auto`, `fast`, `windowed`, `hybrid`).
//! 2. [`time_window`] partitions the requested span into contiguous fetch windows whose
//!    length depends on each satellite's orbital regime.
//!
//! The output of both feeds the [`orchestrator`](crate::orchestrator), which turns the
//! plan into concrete fetch tasks.

pub mod query_strategy;
pub mod time_window;

pub use query_strategy::{resolve_hybrid, select_strategy, QueryPlan, SearchStrategy};
pub use time_window::{plan_windows, TimeWindow};
