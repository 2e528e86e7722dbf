//! Backend handles and executors.
//!
//! The crate never authenticates: callers hand an already-authenticated
//! handle implementing one of the traits below, and the executors consume
//! exactly the capability they need. Both executors expose the same surface
//! (`fetch(&Query) -> Report`); the warehouse side adds a dry-run cost
//! estimate ahead of execution.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::table::Table;

/// One row of a search-analytics API response. `keys` holds the dimension
/// values in request order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiRow {
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// One page of a search-analytics API response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub rows: Vec<ApiRow>,
}

/// Authenticated handle to the paginated search-analytics API.
#[async_trait]
pub trait SearchConsoleApi: Send + Sync {
    /// Issue a single search-analytics request for `site_url` with the given
    /// JSON request body, returning one page of rows.
    async fn query(&self, site_url: &str, body: &Value) -> Result<ApiPage>;
}

/// Authenticated handle to the bulk-export warehouse.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Validate the SQL without running it and return the estimated number
    /// of bytes the query would scan.
    async fn dry_run(&self, sql: &str) -> Result<u64>;

    /// Execute the SQL and materialize the full result.
    async fn execute(&self, sql: &str) -> Result<Table>;
}

mod api;
mod warehouse;

pub use api::ApiExecutor;
pub use warehouse::{CostEstimate, FetchOutcome, SqlExecutor};
