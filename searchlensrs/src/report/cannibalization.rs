//! Keyword cannibalization: queries where several pages split the clicks.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::error::Result;
use crate::model::{Dimension, Metric};
use crate::table::{get_f64, get_str, Row, Table};

use super::{round2, Report};

/// Thresholds below which a page's share of a query is considered noise.
#[derive(Debug, Clone)]
pub struct CannibalizationOptions {
    /// Minimum share of the query's clicks a page must hold to stay in the
    /// query's group.
    pub query_click_share: f64,
    /// Minimum share of the page's total clicks the query must represent.
    pub page_click_share: f64,
}

impl Default for CannibalizationOptions {
    fn default() -> Self {
        Self {
            query_click_share: 0.10,
            page_click_share: 0.10,
        }
    }
}

impl Report {
    /// Queries for which at least two pages each hold a meaningful share of
    /// the clicks.
    ///
    /// Branded queries are excluded first: any query containing one of
    /// `brand_variants` (case-insensitive substring) is dropped. Rows are
    /// ordered by query, then clicks descending within each query.
    pub fn cannibalization(
        &self,
        brand_variants: &[&str],
        options: &CannibalizationOptions,
    ) -> Result<Table> {
        self.require_dimensions(&[Dimension::Query, Dimension::Page])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        let variants: Vec<String> = brand_variants.iter().map(|v| v.to_lowercase()).collect();
        let is_branded = |query: &str| {
            let lowered = query.to_lowercase();
            variants.iter().any(|v| lowered.contains(v.as_str()))
        };

        // Clicks and impressions per (query, page), plus per-page click
        // totals, branded queries excluded.
        let mut pairs: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
        let mut page_totals: HashMap<String, f64> = HashMap::new();
        for row in self.table.rows() {
            let (Some(query), Some(page)) = (get_str(row, "query"), get_str(row, "page")) else {
                continue;
            };
            if is_branded(query) {
                continue;
            }
            let clicks = get_f64(row, "clicks");
            let entry = pairs
                .entry((query.to_string(), page.to_string()))
                .or_default();
            entry.0 += clicks;
            entry.1 += get_f64(row, "impressions");
            *page_totals.entry(page.to_string()).or_default() += clicks;
        }

        let mut query_totals: HashMap<&str, (f64, usize)> = HashMap::new();
        for ((query, _), (clicks, _)) in &pairs {
            let entry = query_totals.entry(query.as_str()).or_default();
            entry.0 += clicks;
            entry.1 += 1;
        }

        // First pass keeps pages that clear both share thresholds; a query
        // only cannibalizes if at least two pages survive.
        let mut survivors: BTreeMap<&str, Vec<(&str, f64, f64, f64, f64)>> = BTreeMap::new();
        for ((query, page), (clicks, impressions)) in &pairs {
            let (query_total, pages) = query_totals[query.as_str()];
            if pages < 2 || query_total < 1.0 {
                continue;
            }
            let query_share = clicks / query_total;
            let page_total = page_totals[page.as_str()];
            let page_share = if page_total > 0.0 {
                clicks / page_total
            } else {
                0.0
            };
            if query_share < options.query_click_share || page_share < options.page_click_share {
                continue;
            }
            survivors.entry(query.as_str()).or_default().push((
                page.as_str(),
                *clicks,
                *impressions,
                query_share,
                page_share,
            ));
        }

        let mut out = Table::new(vec![
            "query",
            "page",
            "clicks",
            "impressions",
            "query_click_pct",
            "page_click_pct",
        ]);
        for (query, mut group) in survivors {
            if group.len() < 2 {
                continue;
            }
            group.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            for (page, clicks, impressions, query_share, page_share) in group {
                let mut row = Row::new();
                row.insert("query".to_string(), Value::from(query));
                row.insert("page".to_string(), Value::from(page));
                row.insert("clicks".to_string(), Value::from(clicks));
                row.insert("impressions".to_string(), Value::from(impressions));
                row.insert(
                    "query_click_pct".to_string(),
                    Value::from(round2(100.0 * query_share)),
                );
                row.insert(
                    "page_click_pct".to_string(),
                    Value::from(round2(100.0 * page_share)),
                );
                out.push(row);
            }
        }
        Ok(out)
    }
}
