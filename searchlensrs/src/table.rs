//! Row-oriented result table.
//!
//! Rows are JSON maps keyed by column name, the shape both backends already
//! produce, so no per-backend conversion layer is needed. Typed accessors
//! live here so analytical code never touches `serde_json::Value` matching
//! directly.

use chrono::NaiveDate;
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Row>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// String value of a column, if present and textual.
pub fn get_str<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

/// Numeric value of a column; missing or non-numeric cells read as 0.
pub fn get_f64(row: &Row, column: &str) -> f64 {
    row.get(column).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Date value of a column in `YYYY-MM-DD` form.
pub fn get_date(row: &Row, column: &str) -> Option<NaiveDate> {
    get_str(row, column).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
