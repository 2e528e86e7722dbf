//! Calendar bucketing for time series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::model::{Dimension, Metric, Period};
use crate::table::{get_f64, Row, Table};

use super::{row_date, Report};

impl Report {
    /// Sum clicks and impressions into calendar buckets, keeping whichever of
    /// the two columns the table carries. Each output row is labelled with
    /// the first day of its bucket, so regrouping an already bucketed table
    /// by the same period is a no-op.
    pub fn group_data_by_period(&self, period: Period) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date])?;
        let metrics: Vec<&'static str> = [Metric::Clicks, Metric::Impressions]
            .iter()
            .map(|m| m.column_name())
            .filter(|column| self.table.has_column(column))
            .collect();

        let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            let start = bucket_start(date, period).ok_or_else(|| {
                SearchlensError::Backend(format!("date {date} is outside the calendar range"))
            })?;
            let sums = buckets
                .entry(start)
                .or_insert_with(|| vec![0.0; metrics.len()]);
            for (sum, column) in sums.iter_mut().zip(&metrics) {
                *sum += get_f64(row, column);
            }
        }

        let mut columns = vec!["date"];
        columns.extend(&metrics);
        let mut out = Table::new(columns);
        for (start, sums) in buckets {
            let mut row = Row::new();
            row.insert("date".to_string(), Value::from(start.to_string()));
            for (sum, column) in sums.into_iter().zip(&metrics) {
                row.insert(column.to_string(), Value::from(sum));
            }
            out.push(row);
        }
        Ok(out)
    }
}

/// First calendar day of the bucket containing `date`. Weeks start on
/// Monday, quarters on January, April, July and October the 1st.
pub(crate) fn bucket_start(date: NaiveDate, period: Period) -> Option<NaiveDate> {
    Some(match period {
        Period::Day => date,
        Period::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        Period::Month => date.with_day(1)?,
        Period::Quarter => {
            NaiveDate::from_ymd_opt(date.year(), ((date.month() - 1) / 3) * 3 + 1, 1)?
        }
        Period::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?,
    })
}
