//! The report: a fetched table plus its metadata, and the analytical method
//! library operating on it.
//!
//! Every method declares the dimensions and metrics it needs and fails with
//! a structured error naming the missing requirement before touching a row.
//! All methods are pure (they return a fresh [`Table`]) except
//! [`Report::update_urls`] and [`Report::replace_query_from_list`], which
//! rewrite the table in place and say so in their contract.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::external::{CausalAnalyst, Forecaster};
use crate::model::{Dimension, Metric};
use crate::table::{get_date, get_f64, get_str, Row, Table};

mod cannibalization;
mod curves;
mod decay;
mod keywords;
mod pages;
mod periods;

pub use cannibalization::CannibalizationOptions;
pub use decay::{ContentDecayOptions, DecayEntity, DecayPeriod};
pub use keywords::VolumeOutcome;
pub use pages::PagesLifespan;

#[derive(Debug, Clone)]
pub struct Report {
    pub(crate) table: Table,
    pub(crate) site_url: String,
    pub(crate) date_min: NaiveDate,
    pub(crate) date_max: NaiveDate,
}

impl Report {
    pub fn new(
        table: Table,
        site_url: impl Into<String>,
        date_min: NaiveDate,
        date_max: NaiveDate,
    ) -> Self {
        Self {
            table,
            site_url: site_url.into(),
            date_min,
            date_max,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn date_min(&self) -> NaiveDate {
        self.date_min
    }

    pub fn date_max(&self) -> NaiveDate {
        self.date_max
    }

    /// Dimensions present in the table, in declaration order.
    pub fn dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.table.has_column(d.api_name()))
            .collect()
    }

    /// Metrics present in the table.
    pub fn metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.table.has_column(m.column_name()))
            .collect()
    }

    pub(crate) fn require_dimensions(&self, dimensions: &[Dimension]) -> Result<()> {
        for dim in dimensions {
            if !self.table.has_column(dim.api_name()) {
                return Err(SearchlensError::MissingDimension(
                    dim.api_name().to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn require_metrics(&self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            if !self.table.has_column(metric.column_name()) {
                return Err(SearchlensError::MissingMetric(
                    metric.column_name().to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Rewrite page URLs in place using a redirect mapping. Rows whose page
    /// is not in the mapping are left untouched. Returns `self` so calls can
    /// chain into the analytical methods.
    pub fn update_urls(&mut self, redirects: &HashMap<String, String>) -> Result<&mut Self> {
        self.require_dimensions(&[Dimension::Page])?;
        for row in self.table.rows_mut() {
            let target = get_str(row, "page").and_then(|p| redirects.get(p)).cloned();
            if let Some(to) = target {
                row.insert("page".to_string(), Value::from(to));
            }
        }
        Ok(self)
    }

    /// ABCD classification: rows ranked descending by `metric`, labelled by
    /// the cumulative share of total already consumed by better-ranked rows
    /// (inclusive bounds: ≤50% A, ≤75% B, ≤90% C, else D). An exactly even
    /// split therefore stays entirely in class A.
    pub fn abcd(&self, metric: Metric) -> Result<Table> {
        self.require_metrics(&[metric])?;
        let column = metric.column_name();
        let rows = self.table.rows();

        let total: f64 = rows.iter().map(|r| get_f64(r, column)).sum();
        if total <= 0.0 {
            return Err(SearchlensError::InsufficientData(format!(
                "total {column} is zero; nothing to classify"
            )));
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            get_f64(&rows[b], column)
                .partial_cmp(&get_f64(&rows[a], column))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut columns: Vec<String> = self.table.columns().to_vec();
        columns.push("metric_pct".to_string());
        columns.push("cumulative_pct".to_string());
        columns.push("abcd".to_string());
        let mut out = Table::new(columns);

        let mut consumed = 0.0f64;
        for idx in order {
            let value = get_f64(&rows[idx], column);
            let prior_pct = 100.0 * consumed / total;
            let class = if prior_pct <= 50.0 {
                "A"
            } else if prior_pct <= 75.0 {
                "B"
            } else if prior_pct <= 90.0 {
                "C"
            } else {
                "D"
            };
            consumed += value;
            let mut row = rows[idx].clone();
            row.insert(
                "metric_pct".to_string(),
                Value::from(round2(100.0 * value / total)),
            );
            row.insert(
                "cumulative_pct".to_string(),
                Value::from(round2(100.0 * consumed / total)),
            );
            row.insert("abcd".to_string(), Value::from(class));
            out.push(row);
        }
        Ok(out)
    }

    /// Clicks and impressions summed per day of week, Monday through Sunday.
    pub fn seasonality_per_day(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        const DAY_NAMES: [&str; 7] = [
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
            "Sunday",
        ];
        let mut sums = [(0.0f64, 0.0f64, false); 7];
        for row in self.table.rows() {
            let date = row_date(row)?;
            let idx = date.weekday().num_days_from_monday() as usize;
            sums[idx].0 += get_f64(row, "clicks");
            sums[idx].1 += get_f64(row, "impressions");
            sums[idx].2 = true;
        }

        let mut out = Table::new(vec!["day", "clicks", "impressions"]);
        for (idx, (clicks, impressions, seen)) in sums.iter().enumerate() {
            if !seen {
                continue;
            }
            let mut row = Row::new();
            row.insert("day".to_string(), Value::from(DAY_NAMES[idx]));
            row.insert("clicks".to_string(), Value::from(*clicks));
            row.insert("impressions".to_string(), Value::from(*impressions));
            out.push(row);
        }
        Ok(out)
    }

    /// Delegate the daily clicks series to an external forecaster and return
    /// its output verbatim.
    pub fn forecast(&self, days: u32, forecaster: &dyn Forecaster) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date])?;
        self.require_metrics(&[Metric::Clicks])?;
        let series = self.daily_clicks_series()?;
        forecaster.forecast(&series, days)
    }

    /// Delegate the daily clicks series to an external causal-inference
    /// analyst. The post-intervention window is measured against the last
    /// observed date; a pre-window of the same length must exist in the data
    /// or the analysis is refused with `InsufficientData`.
    pub fn causal_impact(
        &self,
        intervention: NaiveDate,
        analyst: &dyn CausalAnalyst,
    ) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date])?;
        self.require_metrics(&[Metric::Clicks])?;
        let series = self.daily_clicks_series()?;
        let (first, last) = match (series.rows().first(), series.rows().last()) {
            (Some(first), Some(last)) => (row_date(first)?, row_date(last)?),
            _ => {
                return Err(SearchlensError::InsufficientData(
                    "report has no rows".to_string(),
                ))
            }
        };
        let post_days = (last - intervention).num_days();
        if post_days < 0 {
            return Err(SearchlensError::InvalidArgument(format!(
                "intervention date {intervention} is after the last observed date {last}"
            )));
        }
        let pre_start = intervention - chrono::Duration::days(post_days + 1);
        if first > pre_start {
            return Err(SearchlensError::InsufficientData(format!(
                "causal analysis needs {} days before {intervention}, data starts {first}",
                post_days + 1
            )));
        }
        analyst.causal_impact(&series, intervention)
    }

    /// Clicks summed per day, one row per observed date, sorted ascending.
    pub(crate) fn daily_clicks_series(&self) -> Result<Table> {
        let mut per_day: std::collections::BTreeMap<NaiveDate, f64> =
            std::collections::BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            *per_day.entry(date).or_default() += get_f64(row, "clicks");
        }
        let mut out = Table::new(vec!["date", "clicks"]);
        for (date, clicks) in per_day {
            let mut row = Row::new();
            row.insert("date".to_string(), Value::from(date.to_string()));
            row.insert("clicks".to_string(), Value::from(clicks));
            out.push(row);
        }
        Ok(out)
    }
}

/// Date cell of a row; a row that cannot be parsed is a malformed backend
/// payload, not a caller mistake.
pub(crate) fn row_date(row: &Row) -> Result<NaiveDate> {
    get_date(row, "date").ok_or_else(|| {
        SearchlensError::Backend("row carries a missing or unparsable date cell".to_string())
    })
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
