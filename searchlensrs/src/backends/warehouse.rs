//! SQL-generating executor for the bulk-export warehouse.
//!
//! Generates a fixed-shape aggregate query (range predicate, AND-composed
//! filter predicates, dimension projection, summed metrics), dry-runs it for
//! a cost estimate, and only executes when the query opts out of the cost
//! guard.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;

use crate::config::WarehouseConfig;
use crate::error::{Result, SearchlensError};
use crate::model::Operator;
use crate::query::{FilterClause, Query};
use crate::report::Report;

use super::WarehouseClient;

const SITE_TABLE: &str = "searchdata_site_impression";
const URL_TABLE: &str = "searchdata_url_impression";

/// Dry-run result: the scan volume and its price at the configured rate.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub bytes_scanned: u64,
    pub estimated_cost_usd: f64,
}

/// What a warehouse fetch produced. The cost-estimate arm is a deliberate
/// non-execution outcome, not an error: callers inspect the price and decide
/// whether to re-run with `estimate_cost(false)`.
#[derive(Debug)]
pub enum FetchOutcome {
    CostEstimate(CostEstimate),
    Report(Report),
}

impl FetchOutcome {
    pub fn into_report(self) -> Option<Report> {
        match self {
            FetchOutcome::Report(report) => Some(report),
            FetchOutcome::CostEstimate(_) => None,
        }
    }

    pub fn cost_estimate(&self) -> Option<&CostEstimate> {
        match self {
            FetchOutcome::CostEstimate(estimate) => Some(estimate),
            FetchOutcome::Report(_) => None,
        }
    }
}

pub struct SqlExecutor {
    client: Arc<dyn WarehouseClient>,
    dataset: String,
    config: WarehouseConfig,
}

impl SqlExecutor {
    pub fn new(client: Arc<dyn WarehouseClient>, dataset: impl Into<String>) -> Self {
        Self::with_config(client, dataset, WarehouseConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn WarehouseClient>,
        dataset: impl Into<String>,
        config: WarehouseConfig,
    ) -> Self {
        Self {
            client,
            dataset: dataset.into(),
            config,
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Execute the query against the warehouse.
    ///
    /// Always dry-runs first. With `estimate_cost` on (the default) the
    /// estimate is the final outcome; otherwise the query runs and the rows
    /// are wrapped into a [`Report`].
    pub async fn fetch(&self, query: &Query) -> Result<FetchOutcome> {
        query.require_dimensions()?;
        let (start, end) = query.require_range()?;
        let sql = self.render_sql(query)?;

        let started = Instant::now();
        let bytes_scanned = self.client.dry_run(&sql).await?;
        let estimate = CostEstimate {
            bytes_scanned,
            estimated_cost_usd: estimated_cost(bytes_scanned, self.config.price_per_terabyte),
        };
        tracing::debug!(
            dataset = %self.dataset,
            bytes_scanned,
            cost_usd = estimate.estimated_cost_usd,
            "warehouse dry run"
        );

        if query.estimate_cost {
            return Ok(FetchOutcome::CostEstimate(estimate));
        }

        let table = self.client.execute(&sql).await?;
        tracing::debug!(
            dataset = %self.dataset,
            rows = table.len(),
            ms = started.elapsed().as_millis(),
            "warehouse fetch complete"
        );
        Ok(FetchOutcome::Report(Report::new(
            table,
            self.dataset.clone(),
            start,
            end,
        )))
    }

    /// Render the SQL for a query without touching the network. Exposed so
    /// callers can log or review the text before paying for it.
    pub fn render_sql(&self, query: &Query) -> Result<String> {
        let dimensions = query.require_dimensions()?;
        let (start, end) = query.require_range()?;

        let mut select: Vec<String> = Vec::with_capacity(dimensions.len() + 4);
        let mut group_by: Vec<&str> = Vec::with_capacity(dimensions.len());
        for dim in dimensions {
            let column = dim.warehouse_column();
            if column == dim.api_name() {
                select.push(column.to_string());
            } else {
                // Alias back to the canonical name so report columns match
                // the API backend exactly.
                select.push(format!("{column} AS {}", dim.api_name()));
            }
            group_by.push(column);
        }
        select.push("SUM(clicks) AS clicks".to_string());
        select.push("SUM(impressions) AS impressions".to_string());
        select.push("SAFE_DIVIDE(SUM(clicks), SUM(impressions)) AS ctr".to_string());
        select.push(
            "SAFE_DIVIDE(SUM(sum_position), SUM(impressions)) + 1 AS position".to_string(),
        );

        let mut predicates = vec![date_range_predicate(start, end)];
        for clause in query.filters.clauses() {
            predicates.push(filter_predicate(clause)?);
        }

        let table = self.table_for(query);
        let mut sql = format!(
            "SELECT {} FROM `{}.{}` WHERE {} GROUP BY {}",
            select.join(", "),
            self.dataset,
            table,
            predicates.join(" AND "),
            group_by.join(", "),
        );
        if let Some(limit) = query.row_limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(sql)
    }

    /// The site-level table is smaller and therefore cheaper to scan; it is
    /// only usable when nothing in the query touches the page axis.
    fn table_for(&self, query: &Query) -> &'static str {
        let site_only = query.dimensions.iter().all(|d| d.site_level())
            && query
                .filters
                .clauses()
                .iter()
                .all(|c| c.dimension.site_level());
        if site_only {
            SITE_TABLE
        } else {
            URL_TABLE
        }
    }
}

/// Dry-run bytes to an on-demand price, rounded to 4 decimals.
pub fn estimated_cost(bytes_scanned: u64, price_per_terabyte: f64) -> f64 {
    let terabytes = bytes_scanned as f64 / (1024f64).powi(4);
    (terabytes * price_per_terabyte * 10_000.0).round() / 10_000.0
}

fn date_range_predicate(start: NaiveDate, end: NaiveDate) -> String {
    format!("data_date BETWEEN '{start}' AND '{end}'")
}

fn filter_predicate(clause: &FilterClause) -> Result<String> {
    if !clause.dimension.warehouse_filterable() {
        return Err(SearchlensError::InvalidArgument(format!(
            "dimension '{}' cannot be filtered on the warehouse backend; use range() instead",
            clause.dimension
        )));
    }
    let column = clause.dimension.warehouse_column();
    let value = escape(&clause.expression);
    Ok(match clause.operator {
        Operator::Equals => format!("{column} = '{value}'"),
        Operator::NotEquals => format!("{column} != '{value}'"),
        Operator::Contains => format!("{column} LIKE '%{value}%'"),
        Operator::NotContains => format!("{column} NOT LIKE '%{value}%'"),
        Operator::IncludingRegex => format!("REGEXP_CONTAINS({column}, '{value}')"),
        Operator::ExcludingRegex => format!("NOT REGEXP_CONTAINS({column}, '{value}')"),
    })
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
