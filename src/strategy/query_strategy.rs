use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::trackfill_errors::PipelineError;

/// Satellite count at or below which `auto` may pick the fast plan.
pub const FAST_MAX_SATELLITES: usize = 5;
/// Time span (days) at or below which `auto` may pick the fast plan.
pub const FAST_MAX_DAYS: f64 = 7.0;
/// Satellite count from which `auto` always picks the windowed plan.
pub const WINDOWED_MIN_SATELLITES: usize = 10;
/// Time span (days) from which `auto` always picks the windowed plan.
pub const WINDOWED_MIN_DAYS: f64 = 30.0;
/// Estimated record count below which a hybrid plan resolves to fast.
pub const HYBRID_COUNT_THRESHOLD: u64 = 10_000;

/// Strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Auto,
    Fast,
    Windowed,
    Hybrid,
}

impl FromStr for SearchStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SearchStrategy::Auto),
            "fast" => Ok(SearchStrategy::Fast),
            "windowed" => Ok(SearchStrategy::Windowed),
            "hybrid" => Ok(SearchStrategy::Hybrid),
            _ => Err(PipelineError::UnknownSearchStrategy(s.to_string())),
        }
    }
}

/// Concrete fetch plan.
///
/// `Hybrid` is transient: it must be resolved with [`resolve_hybrid`] after the
/// count query, before any task is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryPlan {
    /// One query per satellite over the full span
    Fast,
    /// One query per (satellite, window)
    Windowed,
    /// Count first, then fast or windowed
    Hybrid,
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryPlan::Fast => "FAST",
            QueryPlan::Windowed => "WINDOWED",
            QueryPlan::Hybrid => "HYBRID",
        };
        write!(f, "{name}")
    }
}

/// Pick the fetch plan for a run.
///
/// Arguments
/// ---------
/// * `satellite_count`: number of satellites requested
/// * `span_days`: requested time span in whole days
/// * `requested`: caller preference; anything but `Auto` is honored as-is
///
/// Return
/// ------
/// * under `Auto`: `Fast` for ≤ 5 satellites over ≤ 7 days, `Windowed` for ≥ 10
///   satellites or ≥ 30 days, `Hybrid` otherwise
pub fn select_strategy(
    satellite_count: usize,
    span_days: f64,
    requested: SearchStrategy,
) -> QueryPlan {
    match requested {
        SearchStrategy::Fast => QueryPlan::Fast,
        SearchStrategy::Windowed => QueryPlan::Windowed,
        SearchStrategy::Hybrid => QueryPlan::Hybrid,
        SearchStrategy::Auto => {
            if satellite_count <= FAST_MAX_SATELLITES && span_days <= FAST_MAX_DAYS {
                QueryPlan::Fast
            } else if satellite_count >= WINDOWED_MIN_SATELLITES || span_days >= WINDOWED_MIN_DAYS
            {
                QueryPlan::Windowed
            } else {
                QueryPlan::Hybrid
            }
        }
    }
}

/// Resolve a hybrid plan from the count query.
///
/// The count covers the records of one satellite over the full span; the total is
/// extrapolated to every satellite of the run.
///
/// Arguments
/// ---------
/// * `sampled_count`: records reported for the sampled satellite
/// * `satellite_count`: number of satellites in the run
/// * `threshold`: estimated total below which the fast plan is used
pub fn resolve_hybrid(sampled_count: u64, satellite_count: usize, threshold: u64) -> QueryPlan {
    let estimated = sampled_count.saturating_mul(satellite_count as u64);
    if estimated < threshold {
        QueryPlan::Fast
    } else {
        QueryPlan::Windowed
    }
}

#[cfg(test)]
mod query_strategy_test {
    use super::*;

    #[test]
    fn test_auto_selection() {
        assert_eq!(select_strategy(2, 5.0, SearchStrategy::Auto), QueryPlan::Fast);
        assert_eq!(select_strategy(5, 7.0, SearchStrategy::Auto), QueryPlan::Fast);
        assert_eq!(
            select_strategy(2, 30.0, SearchStrategy::Auto),
            QueryPlan::Windowed
        );
        assert_eq!(
            select_strategy(10, 1.0, SearchStrategy::Auto),
            QueryPlan::Windowed
        );
        assert_eq!(select_strategy(6, 3.0, SearchStrategy::Auto), QueryPlan::Hybrid);
        assert_eq!(select_strategy(3, 12.0, SearchStrategy::Auto), QueryPlan::Hybrid);
    }

    #[test]
    fn test_explicit_request_is_honored() {
        assert_eq!(
            select_strategy(50, 90.0, SearchStrategy::Fast),
            QueryPlan::Fast
        );
        assert_eq!(
            select_strategy(1, 1.0, SearchStrategy::Windowed),
            QueryPlan::Windowed
        );
        assert_eq!(
            select_strategy(1, 1.0, SearchStrategy::Hybrid),
            QueryPlan::Hybrid
        );
    }

    #[test]
    fn test_resolve_hybrid() {
        assert_eq!(resolve_hybrid(1_000, 3, HYBRID_COUNT_THRESHOLD), QueryPlan::Fast);
        assert_eq!(
            resolve_hybrid(5_000, 2, HYBRID_COUNT_THRESHOLD),
            QueryPlan::Windowed
        );
        assert_eq!(
            resolve_hybrid(u64::MAX, 7, HYBRID_COUNT_THRESHOLD),
            QueryPlan::Windowed
        );
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("AUTO".parse::<SearchStrategy>(), Ok(SearchStrategy::Auto));
        assert_eq!(" hybrid ".parse::<SearchStrategy>(), Ok(SearchStrategy::Hybrid));
        assert_eq!(
            "greedy".parse::<SearchStrategy>(),
            Err(PipelineError::UnknownSearchStrategy("greedy".into()))
        );
    }
}
