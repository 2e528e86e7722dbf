//! Trend analyses: content decay and period-over-period winners and losers.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::model::{Dimension, Metric};
use crate::table::{get_f64, get_str, Row, Table};

use super::{round3, row_date, Report};

/// Axis along which decay is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayEntity {
    Page,
    Query,
}

impl DecayEntity {
    fn dimension(self) -> Dimension {
        match self {
            DecayEntity::Page => Dimension::Page,
            DecayEntity::Query => Dimension::Query,
        }
    }
}

/// Bucket width for the decay series. Only complete buckets are compared;
/// a partial trailing week would make every entity look like it decayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayPeriod {
    Week,
    Month,
}

#[derive(Debug, Clone)]
pub struct ContentDecayOptions {
    pub entity: DecayEntity,
    pub metric: Metric,
    pub period: DecayPeriod,
    /// Entities whose peak never reaches this value are ignored.
    pub threshold_metric: f64,
    /// Minimum relative drop from the peak to count as decay.
    pub threshold_decay: f64,
}

impl Default for ContentDecayOptions {
    fn default() -> Self {
        Self {
            entity: DecayEntity::Page,
            metric: Metric::Clicks,
            period: DecayPeriod::Week,
            threshold_metric: 100.0,
            threshold_decay: 0.25,
        }
    }
}

impl Report {
    /// Entities whose metric in the most recent complete period has dropped
    /// from their historical peak by at least the configured share.
    ///
    /// Rows that fall inside incomplete leading or trailing buckets are
    /// discarded before anything is compared. Sorted by absolute drop,
    /// largest first.
    pub fn find_content_decay(&self, options: &ContentDecayOptions) -> Result<Table> {
        let entity_dim = options.entity.dimension();
        self.require_dimensions(&[Dimension::Date, entity_dim])?;
        self.require_metrics(&[options.metric])?;
        let entity_col = entity_dim.api_name();
        let metric_col = options.metric.column_name();

        let mut min_date: Option<NaiveDate> = None;
        let mut max_date: Option<NaiveDate> = None;
        for row in self.table.rows() {
            let date = row_date(row)?;
            min_date = Some(min_date.map_or(date, |d| d.min(date)));
            max_date = Some(max_date.map_or(date, |d| d.max(date)));
        }
        let (Some(min_date), Some(max_date)) = (min_date, max_date) else {
            return Err(SearchlensError::InsufficientData(
                "report has no rows".to_string(),
            ));
        };
        let Some((window_start, window_end)) =
            complete_window(min_date, max_date, options.period)
        else {
            return Err(SearchlensError::InsufficientData(format!(
                "no complete {} between {min_date} and {max_date}",
                match options.period {
                    DecayPeriod::Week => "week",
                    DecayPeriod::Month => "month",
                }
            )));
        };

        // Metric summed per (entity, period label). Labels sort
        // chronologically as strings.
        let mut series: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        let mut last_label = String::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            if date < window_start || date > window_end {
                continue;
            }
            let Some(entity) = get_str(row, entity_col) else {
                continue;
            };
            let label = period_label(date, options.period);
            if label > last_label {
                last_label = label.clone();
            }
            *series
                .entry(entity.to_string())
                .or_default()
                .entry(label)
                .or_default() += get_f64(row, metric_col);
        }

        let mut decayed: Vec<Row> = Vec::new();
        for (entity, buckets) in series {
            let (peak_label, peak) = buckets
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(label, value)| (label.clone(), *value))
                .unwrap_or_default();
            if peak < options.threshold_metric {
                continue;
            }
            let last = buckets.get(&last_label).copied().unwrap_or(0.0);
            let decay = (peak - last) / peak;
            if decay < options.threshold_decay {
                continue;
            }
            let mut row = Row::new();
            row.insert(entity_col.to_string(), Value::from(entity));
            row.insert("metric_last_period".to_string(), Value::from(last));
            row.insert("metric_max".to_string(), Value::from(peak));
            row.insert("period_max".to_string(), Value::from(peak_label));
            row.insert("decay".to_string(), Value::from(round3(decay)));
            row.insert("decay_abs".to_string(), Value::from(peak - last));
            decayed.push(row);
        }
        decayed.sort_by(|a, b| {
            get_f64(b, "decay_abs")
                .partial_cmp(&get_f64(a, "decay_abs"))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut out = Table::new(vec![
            entity_col,
            "metric_last_period",
            "metric_max",
            "period_max",
            "decay",
            "decay_abs",
        ]);
        for row in decayed {
            out.push(row);
        }
        Ok(out)
    }

    /// Per-page click totals for two non-overlapping windows inside the
    /// report's range, outer-joined so pages present in only one window
    /// still appear. Sorted by the absolute difference, largest first.
    pub fn winners_losers(
        &self,
        period_1: (NaiveDate, NaiveDate),
        period_2: (NaiveDate, NaiveDate),
    ) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Page])?;
        self.require_metrics(&[Metric::Clicks])?;

        for (start, end) in [period_1, period_2] {
            if start > end {
                return Err(SearchlensError::InvalidArgument(format!(
                    "period start {start} is after its end {end}"
                )));
            }
            if start < self.date_min || end > self.date_max {
                return Err(SearchlensError::InvalidArgument(format!(
                    "period {start}..{end} is outside the report range {}..{}",
                    self.date_min, self.date_max
                )));
            }
        }
        if period_1.1 >= period_2.0 {
            return Err(SearchlensError::InvalidArgument(
                "the first period must end before the second begins".to_string(),
            ));
        }

        let mut per_page: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            let Some(page) = get_str(row, "page") else {
                continue;
            };
            let clicks = get_f64(row, "clicks");
            let entry = per_page.entry(page.to_string()).or_default();
            if date >= period_1.0 && date <= period_1.1 {
                entry.0 += clicks;
            } else if date >= period_2.0 && date <= period_2.1 {
                entry.1 += clicks;
            }
        }
        per_page.retain(|_, (a, b)| *a > 0.0 || *b > 0.0);

        let mut rows: Vec<Row> = per_page
            .into_iter()
            .map(|(page, (before, after))| {
                let diff = after - before;
                let mut row = Row::new();
                row.insert("page".to_string(), Value::from(page));
                row.insert("clicks_period_1".to_string(), Value::from(before));
                row.insert("clicks_period_2".to_string(), Value::from(after));
                row.insert("diff".to_string(), Value::from(diff));
                row.insert("winner".to_string(), Value::from(diff > 0.0));
                row
            })
            .collect();
        rows.sort_by(|a, b| {
            get_f64(b, "diff")
                .abs()
                .partial_cmp(&get_f64(a, "diff").abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut out = Table::new(vec![
            "page",
            "clicks_period_1",
            "clicks_period_2",
            "diff",
            "winner",
        ]);
        for row in rows {
            out.push(row);
        }
        Ok(out)
    }
}

/// Smallest range of whole buckets inside `[min, max]`, or `None` when not
/// even one complete bucket fits.
fn complete_window(
    min: NaiveDate,
    max: NaiveDate,
    period: DecayPeriod,
) -> Option<(NaiveDate, NaiveDate)> {
    match period {
        DecayPeriod::Week => {
            let start = min + Duration::days(
                (7 - min.weekday().num_days_from_monday() as i64) % 7,
            );
            let end = max - Duration::days(
                (max.weekday().num_days_from_monday() as i64 + 1) % 7,
            );
            (start <= end).then_some((start, end))
        }
        DecayPeriod::Month => {
            let start = if min.day() == 1 {
                min
            } else {
                next_month_start(min)?
            };
            let end = if next_month_start(max)? - Duration::days(1) == max {
                max
            } else {
                max.with_day(1)? - Duration::days(1)
            };
            (start <= end).then_some((start, end))
        }
    }
}

fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn period_label(date: NaiveDate, period: DecayPeriod) -> String {
    match period {
        DecayPeriod::Week => {
            let iso = date.iso_week();
            format!("{}-{:02}", iso.year(), iso.week())
        }
        DecayPeriod::Month => date.format("%Y-%m").to_string(),
    }
}
