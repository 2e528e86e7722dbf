//! External analytical collaborators.
//!
//! Forecasting, causal inference and search-volume lookup are provided by
//! the caller; the crate shapes the input series, enforces preconditions and
//! passes the collaborator's output through verbatim.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::table::Table;

/// Produces a forecast from a `{date, clicks}` daily series.
pub trait Forecaster {
    /// `series` is sorted by date with one row per day; `days` is the length
    /// of the horizon to predict beyond the last observed date.
    fn forecast(&self, series: &Table, days: u32) -> Result<Table>;
}

/// Estimates the causal effect of an intervention on a `{date, clicks}`
/// daily series.
pub trait CausalAnalyst {
    fn causal_impact(&self, series: &Table, intervention: NaiveDate) -> Result<Table>;
}

/// Paid keyword search-volume lookup.
#[async_trait]
pub trait SearchVolumeProvider: Send + Sync {
    /// Price of looking up the given keyword batches, without performing any
    /// billable call.
    fn estimate_cost(&self, batches: &[Vec<String>]) -> Result<f64>;

    /// Resolve volumes for the batches. The result table must carry
    /// `keyword` and `search_volume` columns.
    async fn lookup(&self, batches: &[Vec<String>], location_code: u32) -> Result<Table>;
}
