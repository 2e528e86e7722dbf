//! Page-level analyses: activity against a URL inventory, lifespan and
//! query diversity.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::model::{Dimension, Metric};
use crate::table::{get_f64, get_str, Row, Table};

use super::{round2, row_date, Report};

/// Per-page first and last appearance, plus the average span in days.
#[derive(Debug)]
pub struct PagesLifespan {
    pub per_page: Table,
    pub average_days: f64,
}

impl Report {
    /// Left-join a URL inventory (typically a sitemap) against the report's
    /// per-page totals. Every supplied URL gets one row; URLs the report
    /// never saw carry zeros and `false` flags.
    pub fn active_pages(&self, urls: &[&str]) -> Result<Table> {
        self.require_dimensions(&[Dimension::Page])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        let totals = self.page_totals();
        let mut out = Table::new(vec![
            "page",
            "clicks",
            "impressions",
            "active_clicks",
            "active_impressions",
        ]);
        let mut seen = HashSet::new();
        for url in urls {
            if !seen.insert(*url) {
                continue;
            }
            let (clicks, impressions) = totals.get(*url).copied().unwrap_or_default();
            let mut row = Row::new();
            row.insert("page".to_string(), Value::from(*url));
            row.insert("clicks".to_string(), Value::from(clicks));
            row.insert("impressions".to_string(), Value::from(impressions));
            row.insert("active_clicks".to_string(), Value::from(clicks > 0.0));
            row.insert(
                "active_impressions".to_string(),
                Value::from(impressions > 0.0),
            );
            out.push(row);
        }
        Ok(out)
    }

    /// URLs from the inventory whose clicks and impressions both sit at or
    /// below the given thresholds. URLs absent from the report count as
    /// zero, so a never-seen page is always a candidate.
    pub fn find_potential_contents_to_kill(
        &self,
        urls: &[&str],
        clicks_threshold: f64,
        impressions_threshold: f64,
    ) -> Result<Table> {
        self.require_dimensions(&[Dimension::Page])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        let totals = self.page_totals();
        let mut out = Table::new(vec!["page", "clicks", "impressions"]);
        let mut seen = HashSet::new();
        for url in urls {
            if !seen.insert(*url) {
                continue;
            }
            let (clicks, impressions) = totals.get(*url).copied().unwrap_or_default();
            if clicks > clicks_threshold || impressions > impressions_threshold {
                continue;
            }
            let mut row = Row::new();
            row.insert("page".to_string(), Value::from(*url));
            row.insert("clicks".to_string(), Value::from(clicks));
            row.insert("impressions".to_string(), Value::from(impressions));
            out.push(row);
        }
        Ok(out)
    }

    /// Rows whose page is missing from the supplied URL set: content that
    /// earns search traffic but is not declared in the sitemap.
    pub fn pages_not_in_sitemap(&self, urls: &[&str]) -> Result<Table> {
        self.require_dimensions(&[Dimension::Page])?;
        let declared: HashSet<&str> = urls.iter().copied().collect();
        let mut out = Table::new(self.table.columns().to_vec());
        for row in self.table.rows() {
            let Some(page) = get_str(row, "page") else {
                continue;
            };
            if !declared.contains(page) {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    /// Distinct pages receiving impressions per day.
    pub fn pages_per_day(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Page])?;

        let mut days: BTreeMap<NaiveDate, HashSet<String>> = BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            if let Some(page) = get_str(row, "page") {
                days.entry(date).or_default().insert(page.to_string());
            }
        }

        let mut out = Table::new(vec!["date", "pages"]);
        for (date, pages) in days {
            let mut row = Row::new();
            row.insert("date".to_string(), Value::from(date.to_string()));
            row.insert("pages".to_string(), Value::from(pages.len() as u64));
            out.push(row);
        }
        Ok(out)
    }

    /// Per-page span between first and last appearance (inclusive, in
    /// days), plus the average span across pages.
    pub fn pages_lifespan(&self) -> Result<PagesLifespan> {
        self.require_dimensions(&[Dimension::Date, Dimension::Page])?;

        let mut spans: BTreeMap<String, (NaiveDate, NaiveDate)> = BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            let Some(page) = get_str(row, "page") else {
                continue;
            };
            spans
                .entry(page.to_string())
                .and_modify(|(first, last)| {
                    *first = (*first).min(date);
                    *last = (*last).max(date);
                })
                .or_insert((date, date));
        }
        if spans.is_empty() {
            return Err(SearchlensError::InsufficientData(
                "report has no pages".to_string(),
            ));
        }

        let mut per_page = Table::new(vec!["page", "first_seen", "last_seen", "lifespan_days"]);
        let mut total_days = 0i64;
        let pages = spans.len();
        for (page, (first, last)) in spans {
            let days = (last - first).num_days() + 1;
            total_days += days;
            let mut row = Row::new();
            row.insert("page".to_string(), Value::from(page));
            row.insert("first_seen".to_string(), Value::from(first.to_string()));
            row.insert("last_seen".to_string(), Value::from(last.to_string()));
            row.insert("lifespan_days".to_string(), Value::from(days));
            per_page.push(row);
        }
        Ok(PagesLifespan {
            per_page,
            average_days: round2(total_days as f64 / pages as f64),
        })
    }

    /// Unique query count per page, most diverse first.
    pub fn uqc(&self) -> Result<Table> {
        self.require_dimensions(&[Dimension::Page, Dimension::Query])?;

        let mut per_page: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for row in self.table.rows() {
            let (Some(page), Some(query)) = (get_str(row, "page"), get_str(row, "query")) else {
                continue;
            };
            per_page
                .entry(page.to_string())
                .or_default()
                .insert(query.to_string());
        }

        let mut counts: Vec<(String, usize)> = per_page
            .into_iter()
            .map(|(page, queries)| (page, queries.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut out = Table::new(vec!["page", "unique_query_count"]);
        for (page, count) in counts {
            let mut row = Row::new();
            row.insert("page".to_string(), Value::from(page));
            row.insert("unique_query_count".to_string(), Value::from(count as u64));
            out.push(row);
        }
        Ok(out)
    }

    /// Clicks and impressions summed per page.
    fn page_totals(&self) -> HashMap<String, (f64, f64)> {
        let mut totals: HashMap<String, (f64, f64)> = HashMap::new();
        for row in self.table.rows() {
            if let Some(page) = get_str(row, "page") {
                let entry = totals.entry(page.to_string()).or_default();
                entry.0 += get_f64(row, "clicks");
                entry.1 += get_f64(row, "impressions");
            }
        }
        totals
    }
}
