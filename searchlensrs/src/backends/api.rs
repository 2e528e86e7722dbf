//! Paginated executor for the search-analytics API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::error::Result;
use crate::query::Query;
use crate::report::Report;
use crate::table::{Row, Table};

use super::{ApiRow, SearchConsoleApi};

pub struct ApiExecutor {
    client: Arc<dyn SearchConsoleApi>,
    site_url: String,
    config: ApiConfig,
}

impl ApiExecutor {
    pub fn new(client: Arc<dyn SearchConsoleApi>, site_url: impl Into<String>) -> Self {
        Self::with_config(client, site_url, ApiConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn SearchConsoleApi>,
        site_url: impl Into<String>,
        config: ApiConfig,
    ) -> Self {
        Self {
            client,
            site_url: site_url.into(),
            config,
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Execute the query against the API, following the offset cursor until
    /// the backend returns a short page or the row limit is reached.
    ///
    /// All-or-nothing: a failed page discards everything accumulated so far
    /// and surfaces the backend error unchanged.
    pub async fn fetch(&self, query: &Query) -> Result<Report> {
        let dimensions = query.require_dimensions()?;
        let (start, end) = query.require_range()?;

        let limit = query.row_limit.unwrap_or(usize::MAX);

        let started = Instant::now();
        let mut rows: Vec<ApiRow> = Vec::new();
        let mut start_row = 0usize;
        let mut pages = 0u32;

        loop {
            if pages > 0 && self.config.pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pause_ms)).await;
            }
            // A full page, or less when the caller's cap leaves fewer rows
            // outstanding; the last request never over-fetches.
            let requested = self.config.page_size.min(limit - rows.len());
            let body = self.request_body(query, requested, start_row);
            let page = self.client.query(&self.site_url, &body).await?;
            pages += 1;
            let received = page.rows.len();
            rows.extend(page.rows);
            tracing::debug!(
                site = %self.site_url,
                page = pages,
                received,
                total = rows.len(),
                "fetched analytics page"
            );
            if received < requested || rows.len() >= limit {
                break;
            }
            start_row += requested;
        }

        if query.row_limit.is_some() {
            rows.truncate(limit);
        }

        tracing::debug!(
            site = %self.site_url,
            rows = rows.len(),
            pages,
            ms = started.elapsed().as_millis(),
            "analytics fetch complete"
        );

        let mut columns: Vec<String> = dimensions.iter().map(|d| d.api_name().to_string()).collect();
        columns.extend(
            ["clicks", "impressions", "ctr", "position"]
                .iter()
                .map(|s| s.to_string()),
        );

        let mut table = Table::new(columns);
        for api_row in rows {
            let mut row = Row::new();
            for (dim, key) in dimensions.iter().zip(api_row.keys.iter()) {
                row.insert(dim.api_name().to_string(), Value::from(key.clone()));
            }
            row.insert("clicks".to_string(), Value::from(api_row.clicks));
            row.insert("impressions".to_string(), Value::from(api_row.impressions));
            row.insert("ctr".to_string(), Value::from(api_row.ctr));
            row.insert("position".to_string(), Value::from(api_row.position));
            table.push(row);
        }

        Ok(Report::new(table, self.site_url.clone(), start, end))
    }

    fn request_body(&self, query: &Query, row_limit: usize, start_row: usize) -> Value {
        let mut body = json!({
            "startDate": query.start_date.map(|d| d.to_string()),
            "endDate": query.end_date.map(|d| d.to_string()),
            "dimensions": query
                .dimensions
                .iter()
                .map(|d| d.api_name())
                .collect::<Vec<_>>(),
            "type": query.search_type.api_name(),
            "dataState": query.data_state.api_name(),
            "rowLimit": row_limit,
            "startRow": start_row,
        });
        if !query.filters.is_empty() {
            // One AND group; the API has no other composition.
            let filters: Vec<Value> = query
                .filters
                .clauses()
                .iter()
                .map(|clause| {
                    json!({
                        "dimension": clause.dimension.api_name(),
                        "operator": clause.operator.api_name(),
                        "expression": clause.expression,
                    })
                })
                .collect();
            body["dimensionFilterGroups"] = json!([{
                "groupType": "and",
                "filters": filters,
            }]);
        }
        body
    }
}
