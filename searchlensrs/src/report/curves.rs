//! Position and CTR curves.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::model::{Dimension, Metric};
use crate::table::{get_f64, get_str, Row, Table};

use super::{round2, row_date, Report};

/// Per-rank aggregate used while building the yield curve.
#[derive(Default)]
struct RankBucket {
    clicks: f64,
    impressions: f64,
    queries: HashSet<String>,
}

impl Report {
    /// CTR per rounded ranking position, for positions 1 through 10.
    ///
    /// `kw_count` is the number of distinct queries observed at each
    /// position; a curve built from a handful of keywords is not a baseline.
    pub fn ctr_yield_curve(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Query])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions, Metric::Position])?;

        let mut buckets: BTreeMap<u32, RankBucket> = BTreeMap::new();
        for row in self.table.rows() {
            let Some(position) = rounded_position(get_f64(row, "position")) else {
                continue;
            };
            let bucket = buckets.entry(position).or_default();
            bucket.clicks += get_f64(row, "clicks");
            bucket.impressions += get_f64(row, "impressions");
            if let Some(query) = get_str(row, "query") {
                bucket.queries.insert(query.to_string());
            }
        }

        let mut out = Table::new(vec!["position", "ctr", "clicks", "impressions", "kw_count"]);
        for (position, bucket) in buckets {
            let ctr = if bucket.impressions > 0.0 {
                round2(100.0 * bucket.clicks / bucket.impressions)
            } else {
                0.0
            };
            let mut row = Row::new();
            row.insert("position".to_string(), Value::from(position));
            row.insert("ctr".to_string(), Value::from(ctr));
            row.insert("clicks".to_string(), Value::from(bucket.clicks));
            row.insert("impressions".to_string(), Value::from(bucket.impressions));
            row.insert("kw_count".to_string(), Value::from(bucket.queries.len() as u64));
            out.push(row);
        }
        Ok(out)
    }

    /// Queries whose measured CTR sits below the site's own yield curve.
    ///
    /// `loss` is the number of clicks the gap represents at the query's
    /// impression volume; only positive losses are reported, largest first.
    pub fn find_ctr_outliers(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Query])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions, Metric::Position])?;

        let curve = self.ctr_yield_curve()?;
        let mut expected: HashMap<u32, f64> = HashMap::new();
        for row in curve.rows() {
            if let Some(position) = row.get("position").and_then(Value::as_u64) {
                expected.insert(position as u32, get_f64(row, "ctr"));
            }
        }
        if expected.is_empty() {
            return Err(SearchlensError::InsufficientData(
                "no queries in the top ten positions; cannot build a yield curve".to_string(),
            ));
        }

        // Per query: summed clicks and impressions, impression-weighted
        // average position.
        let mut per_query: HashMap<String, (f64, f64, f64)> = HashMap::new();
        for row in self.table.rows() {
            let Some(query) = get_str(row, "query") else {
                continue;
            };
            let impressions = get_f64(row, "impressions");
            let entry = per_query.entry(query.to_string()).or_default();
            entry.0 += get_f64(row, "clicks");
            entry.1 += impressions;
            entry.2 += get_f64(row, "position") * impressions;
        }

        let mut outliers: Vec<Row> = Vec::new();
        for (query, (clicks, impressions, weighted_position)) in per_query {
            if impressions <= 0.0 {
                continue;
            }
            let Some(position) = rounded_position(weighted_position / impressions) else {
                continue;
            };
            let Some(&expected_ctr) = expected.get(&position) else {
                continue;
            };
            let real_ctr = round2(100.0 * clicks / impressions);
            let loss = (impressions * (expected_ctr - real_ctr) / 100.0).round();
            if loss <= 0.0 {
                continue;
            }
            let mut row = Row::new();
            row.insert("query".to_string(), Value::from(query));
            row.insert("clicks".to_string(), Value::from(clicks));
            row.insert("impressions".to_string(), Value::from(impressions));
            row.insert("position".to_string(), Value::from(position));
            row.insert("real_ctr".to_string(), Value::from(real_ctr));
            row.insert("expected_ctr".to_string(), Value::from(expected_ctr));
            row.insert("loss".to_string(), Value::from(loss));
            outliers.push(row);
        }
        outliers.sort_by(|a, b| {
            get_f64(b, "loss")
                .partial_cmp(&get_f64(a, "loss"))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut out = Table::new(vec![
            "query",
            "clicks",
            "impressions",
            "position",
            "real_ctr",
            "expected_ctr",
            "loss",
        ]);
        for row in outliers {
            out.push(row);
        }
        Ok(out)
    }

    /// Distinct queries per month per rounded ranking position, long form:
    /// one row per (month, position) pair, positions 1 through 10.
    pub fn position_over_time(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Query])?;
        self.require_metrics(&[Metric::Position])?;

        let mut buckets: BTreeMap<(String, u32), HashSet<String>> = BTreeMap::new();
        for row in self.table.rows() {
            let month = row_date(row)?.format("%Y-%m").to_string();
            let Some(position) = rounded_position(get_f64(row, "position")) else {
                continue;
            };
            let Some(query) = get_str(row, "query") else {
                continue;
            };
            buckets
                .entry((month, position))
                .or_default()
                .insert(query.to_string());
        }

        let mut out = Table::new(vec!["month", "position", "kw_count"]);
        for ((month, position), queries) in buckets {
            let mut row = Row::new();
            row.insert("month".to_string(), Value::from(month));
            row.insert("position".to_string(), Value::from(position));
            row.insert("kw_count".to_string(), Value::from(queries.len() as u64));
            out.push(row);
        }
        Ok(out)
    }
}

/// Round a position to its rank, clamping up to 1; `None` past position 10,
/// where the curve stops being meaningful.
fn rounded_position(position: f64) -> Option<u32> {
    let rounded = position.round().max(1.0);
    if rounded > 10.0 {
        None
    } else {
        Some(rounded as u32)
    }
}
