//! Query-level analyses: brand splits, keyword gaps, n-grams and paid
//! search-volume lookup.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, SearchlensError};
use crate::external::SearchVolumeProvider;
use crate::model::{Dimension, Metric};
use crate::table::{get_f64, get_str, Row, Table};

use super::{row_date, Report};

/// Characters the volume provider rejects inside a keyword.
const VOLUME_SYMBOLS: [&str; 25] = [
    "–", ":", "n°", "-", "’", "&", ",", "!", "@", "%", "^", "(", ")", "=", "{", "}", ";", "~",
    "`", "<", ">", "?", "\\", "|", "―",
];

/// What a search-volume extraction produced, mirroring the warehouse fetch:
/// the estimate arm means no billable call was made.
#[derive(Debug)]
pub enum VolumeOutcome {
    CostEstimate(f64),
    Data(Table),
}

impl Report {
    /// Daily clicks and impressions split into branded and non-branded
    /// traffic. A query is branded when it contains any of `brand_variants`,
    /// case-insensitively.
    pub fn brand_vs_no_brand(&self, brand_variants: &[&str]) -> Result<Table> {
        self.require_dimensions(&[Dimension::Date, Dimension::Query])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        let variants: Vec<String> = brand_variants.iter().map(|v| v.to_lowercase()).collect();

        #[derive(Default)]
        struct DaySplit {
            clicks_brand: f64,
            impressions_brand: f64,
            clicks_no_brand: f64,
            impressions_no_brand: f64,
        }

        let mut days: BTreeMap<NaiveDate, DaySplit> = BTreeMap::new();
        for row in self.table.rows() {
            let date = row_date(row)?;
            let query = get_str(row, "query").unwrap_or_default().to_lowercase();
            let branded = variants.iter().any(|v| query.contains(v.as_str()));
            let entry = days.entry(date).or_default();
            let clicks = get_f64(row, "clicks");
            let impressions = get_f64(row, "impressions");
            if branded {
                entry.clicks_brand += clicks;
                entry.impressions_brand += impressions;
            } else {
                entry.clicks_no_brand += clicks;
                entry.impressions_no_brand += impressions;
            }
        }

        let mut out = Table::new(vec![
            "date",
            "clicks_brand",
            "impressions_brand",
            "clicks_no_brand",
            "impressions_no_brand",
        ]);
        for (date, split) in days {
            let mut row = Row::new();
            row.insert("date".to_string(), Value::from(date.to_string()));
            row.insert("clicks_brand".to_string(), Value::from(split.clicks_brand));
            row.insert(
                "impressions_brand".to_string(),
                Value::from(split.impressions_brand),
            );
            row.insert(
                "clicks_no_brand".to_string(),
                Value::from(split.clicks_no_brand),
            );
            row.insert(
                "impressions_no_brand".to_string(),
                Value::from(split.impressions_no_brand),
            );
            out.push(row);
        }
        Ok(out)
    }

    /// Anti-join: rows of `candidates` whose `column` value the report never
    /// ranks for. Used to compare two properties, or a keyword wish-list
    /// against what the site already covers.
    pub fn keyword_gap(&self, candidates: &Table, column: &str) -> Result<Table> {
        self.require_dimensions(&[Dimension::Query])?;
        if !candidates.has_column(column) {
            return Err(SearchlensError::InvalidArgument(format!(
                "comparison table has no '{column}' column"
            )));
        }
        let ranking: HashSet<&str> = self
            .table
            .rows()
            .iter()
            .filter_map(|row| get_str(row, "query"))
            .collect();

        let mut out = Table::new(candidates.columns().to_vec());
        for row in candidates.rows() {
            let Some(value) = get_str(row, column) else {
                continue;
            };
            if !ranking.contains(value) {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    /// Rows whose query has at least `min_words` words. Zero keeps
    /// everything.
    pub fn find_long_tail_keywords(&self, min_words: usize) -> Result<Table> {
        self.require_dimensions(&[Dimension::Query])?;
        let mut out = Table::new(self.table.columns().to_vec());
        for row in self.table.rows() {
            let words = get_str(row, "query")
                .map(|q| q.split_whitespace().count())
                .unwrap_or(0);
            if words >= min_words {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    /// Word n-grams across all queries, with occurrence counts and summed
    /// clicks and impressions, sorted by clicks descending.
    pub fn n_grams(&self, n: usize) -> Result<Table> {
        if n == 0 {
            return Err(SearchlensError::InvalidArgument(
                "n-gram size must be at least 1".to_string(),
            ));
        }
        self.require_dimensions(&[Dimension::Query])?;
        self.require_metrics(&[Metric::Clicks, Metric::Impressions])?;

        let mut grams: HashMap<String, (u64, f64, f64)> = HashMap::new();
        for row in self.table.rows() {
            let Some(query) = get_str(row, "query") else {
                continue;
            };
            let clicks = get_f64(row, "clicks");
            let impressions = get_f64(row, "impressions");
            let words: Vec<&str> = query.split_whitespace().collect();
            for window in words.windows(n) {
                let entry = grams.entry(window.join(" ")).or_default();
                entry.0 += 1;
                entry.1 += clicks;
                entry.2 += impressions;
            }
        }

        let mut rows: Vec<Row> = grams
            .into_iter()
            .map(|(gram, (count, clicks, impressions))| {
                let mut row = Row::new();
                row.insert("ngram".to_string(), Value::from(gram));
                row.insert("count".to_string(), Value::from(count));
                row.insert("clicks".to_string(), Value::from(clicks));
                row.insert("impressions".to_string(), Value::from(impressions));
                row
            })
            .collect();
        rows.sort_by(|a, b| {
            get_f64(b, "clicks")
                .partial_cmp(&get_f64(a, "clicks"))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut out = Table::new(vec!["ngram", "count", "clicks", "impressions"]);
        for row in rows {
            out.push(row);
        }
        Ok(out)
    }

    /// Replace every whole-word occurrence of `words` in the query column
    /// with `placeholder`, in place. Matching is case-insensitive. Used to
    /// mask names or brands before sharing a report.
    pub fn replace_query_from_list(
        &mut self,
        words: &[&str],
        placeholder: &str,
    ) -> Result<&mut Self> {
        self.require_dimensions(&[Dimension::Query])?;
        let mut patterns = Vec::with_capacity(words.len());
        for word in words {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
                .map_err(|e| SearchlensError::InvalidArgument(format!("bad word pattern: {e}")))?;
            patterns.push(pattern);
        }
        for row in self.table.rows_mut() {
            let Some(query) = get_str(row, "query") else {
                continue;
            };
            let mut replaced = query.to_string();
            for pattern in &patterns {
                replaced = pattern.replace_all(&replaced, placeholder).into_owned();
            }
            if replaced != query {
                row.insert("query".to_string(), Value::from(replaced));
            }
        }
        Ok(self)
    }

    /// Resolve search volumes for the report's distinct queries through a
    /// paid provider and join them back onto the table as a `search_volume`
    /// column (0 for queries the provider did not price). With
    /// `estimate_cost` on, only the price is returned and no billable call
    /// is made.
    pub async fn extract_search_volume(
        &self,
        provider: &dyn SearchVolumeProvider,
        location_code: u32,
        estimate_cost: bool,
    ) -> Result<VolumeOutcome> {
        self.require_dimensions(&[Dimension::Query])?;

        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for row in self.table.rows() {
            if let Some(query) = get_str(row, "query") {
                if seen.insert(query.to_string()) {
                    keywords.push(query.to_string());
                }
            }
        }
        let batches = clean_keyword_batches(keywords);

        if estimate_cost {
            let cost = provider.estimate_cost(&batches)?;
            tracing::debug!(batches = batches.len(), cost, "search volume estimate");
            return Ok(VolumeOutcome::CostEstimate(cost));
        }
        let volumes = provider.lookup(&batches, location_code).await?;
        tracing::debug!(
            batches = batches.len(),
            rows = volumes.len(),
            "search volume lookup complete"
        );

        let mut by_keyword: HashMap<String, f64> = HashMap::new();
        for row in volumes.rows() {
            if let Some(keyword) = get_str(row, "keyword") {
                by_keyword.insert(keyword.to_string(), get_f64(row, "search_volume"));
            }
        }

        let mut columns = self.table.columns().to_vec();
        columns.push("search_volume".to_string());
        let mut out = Table::new(columns);
        for row in self.table.rows() {
            let volume = get_str(row, "query")
                .map(clean_keyword)
                .and_then(|k| by_keyword.get(&k).copied())
                .unwrap_or(0.0);
            let mut row = row.clone();
            row.insert("search_volume".to_string(), Value::from(volume));
            out.push(row);
        }
        Ok(VolumeOutcome::Data(out))
    }
}

fn clean_keyword(keyword: &str) -> String {
    let mut keyword = keyword.to_string();
    for symbol in VOLUME_SYMBOLS {
        if keyword.contains(symbol) {
            keyword = keyword.replace(symbol, "");
        }
    }
    keyword
}

/// Keywords the provider can price: at most 80 characters and 10 words,
/// rejected symbols stripped, in batches of 1000.
pub(crate) fn clean_keyword_batches(keywords: Vec<String>) -> Vec<Vec<String>> {
    let mut clean: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        if keyword.chars().count() > 80 || keyword.split(' ').count() > 10 {
            continue;
        }
        clean.push(clean_keyword(&keyword));
    }
    clean
        .chunks(1000)
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_cleaning_drops_long_entries_and_strips_symbols() {
        let keywords = vec![
            "plain keyword".to_string(),
            "rust & wasm!".to_string(),
            "one two three four five six seven eight nine ten eleven".to_string(),
            "x".repeat(81),
        ];
        let batches = clean_keyword_batches(keywords);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec!["plain keyword", "rust  wasm"]);
    }

    #[test]
    fn keywords_batch_in_thousands() {
        let keywords: Vec<String> = (0..2500).map(|i| format!("kw {i}")).collect();
        let batches = clean_keyword_batches(keywords);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 1000);
        assert_eq!(batches[2].len(), 500);
    }
}
