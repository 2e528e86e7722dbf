//! The query specification builder.
//!
//! A `Query` is a value: every builder call consumes the query and returns a
//! new one, so a partially built query can be cloned and extended in several
//! directions without aliasing surprises. All validation happens here, at
//! builder-call time, before any network I/O is paid for.

use chrono::NaiveDate;

use crate::error::{Result, SearchlensError};
use crate::model::{DataState, Dimension, Operator, SearchType};

/// A single filter predicate. Clauses in a [`FilterSet`] always compose with
/// AND; the analytics API has no disjunction, and the warehouse side keeps
/// the same restriction so both backends behave identically.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub dimension: Dimension,
    pub operator: Operator,
    pub expression: String,
    /// Marks a clause whose dimension is used for filtering only and is not
    /// part of the report output.
    pub group_filter: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    clauses: Vec<FilterClause>,
}

impl FilterSet {
    pub fn add(
        &mut self,
        dimension: &str,
        expression: &str,
        operator: &str,
        group_filter: bool,
    ) -> Result<()> {
        let dimension = Dimension::parse(dimension)?;
        let operator = Operator::parse(operator)?;
        self.clauses.push(FilterClause {
            dimension,
            operator,
            expression: expression.to_string(),
            group_filter,
        });
        Ok(())
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Declarative specification of one fetch: date range, dimensions, filters,
/// search surface and row cap.
///
/// Consumed exactly once by an executor's `fetch`; executors do not retain
/// it. `estimate_cost` only affects the warehouse backend, where it defaults
/// to on as a rail against unbounded billing.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) start_date: Option<NaiveDate>,
    pub(crate) end_date: Option<NaiveDate>,
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) filters: FilterSet,
    pub(crate) search_type: SearchType,
    pub(crate) data_state: DataState,
    pub(crate) row_limit: Option<usize>,
    pub(crate) estimate_cost: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            dimensions: Vec::new(),
            filters: FilterSet::default(),
            search_type: SearchType::default(),
            data_state: DataState::default(),
            row_limit: None,
            estimate_cost: true,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date range, both bounds inclusive, `YYYY-MM-DD`.
    pub fn range(mut self, start: &str, stop: &str) -> Result<Self> {
        let start = parse_date(start)?;
        let stop = parse_date(stop)?;
        if start > stop {
            return Err(SearchlensError::InvalidArgument(format!(
                "start date {start} is after end date {stop}"
            )));
        }
        self.start_date = Some(start);
        self.end_date = Some(stop);
        Ok(self)
    }

    /// Set the output dimensions. Order is preserved and determines the
    /// report column order; duplicates are dropped.
    pub fn dimensions(mut self, dimensions: &[&str]) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(SearchlensError::InvalidArgument(
                "provide at least one dimension".to_string(),
            ));
        }
        let mut parsed = Vec::with_capacity(dimensions.len());
        for token in dimensions {
            let dim = Dimension::parse(token)?;
            if !parsed.contains(&dim) {
                parsed.push(dim);
            }
        }
        self.dimensions = parsed;
        Ok(self)
    }

    /// Add a filter clause. The dimension does not have to be present in
    /// `dimensions`; a filter may reference an axis not selected for output.
    pub fn filter(self, dimension: &str, expression: &str, operator: &str) -> Result<Self> {
        self.add_filter(dimension, expression, operator, false)
    }

    /// Like [`Query::filter`], but marks the clause as filter-only.
    pub fn group_filter(self, dimension: &str, expression: &str, operator: &str) -> Result<Self> {
        self.add_filter(dimension, expression, operator, true)
    }

    fn add_filter(
        mut self,
        dimension: &str,
        expression: &str,
        operator: &str,
        group_filter: bool,
    ) -> Result<Self> {
        self.filters.add(dimension, expression, operator, group_filter)?;
        Ok(self)
    }

    /// Search surface to report on (API backend only).
    pub fn search_type(mut self, value: &str) -> Result<Self> {
        self.search_type = SearchType::parse(value)?;
        Ok(self)
    }

    /// Data freshness (API backend only).
    pub fn data_state(mut self, value: &str) -> Result<Self> {
        self.data_state = DataState::parse(value)?;
        Ok(self)
    }

    /// Cap the number of rows returned across all pages.
    pub fn limit(mut self, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(SearchlensError::InvalidArgument(
                "limit must be greater than 0".to_string(),
            ));
        }
        self.row_limit = Some(limit);
        Ok(self)
    }

    /// Toggle the warehouse dry-run. When true (the default), the SQL
    /// executor returns a cost estimate instead of running the query.
    pub fn estimate_cost(mut self, value: bool) -> Self {
        self.estimate_cost = value;
        self
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn dimension_list(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.row_limit
    }

    pub(crate) fn require_dimensions(&self) -> Result<&[Dimension]> {
        if self.dimensions.is_empty() {
            return Err(SearchlensError::Precondition(
                "query has no dimensions; call dimensions() before fetch".to_string(),
            ));
        }
        Ok(&self.dimensions)
    }

    pub(crate) fn require_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(SearchlensError::Precondition(
                "query has no date range; call range() before fetch".to_string(),
            )),
        }
    }
}

fn parse_date(token: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| {
        SearchlensError::InvalidArgument(format!("'{token}' is not a valid YYYY-MM-DD date"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = Query::new().range("2023-02-01", "2023-01-01").unwrap_err();
        assert!(matches!(err, SearchlensError::InvalidArgument(_)));
    }

    #[test]
    fn range_accepts_single_day() {
        let q = Query::new().range("2023-01-01", "2023-01-01").unwrap();
        assert_eq!(q.start_date(), q.end_date());
    }

    #[test]
    fn range_rejects_malformed_dates() {
        assert!(Query::new().range("2023-1-1", "2023-02-01").is_err());
        assert!(Query::new().range("01/01/2023", "2023-02-01").is_err());
        assert!(Query::new().range("2023-02-30", "2023-03-01").is_err());
    }

    #[test]
    fn dimensions_preserve_order_and_dedupe() {
        let q = Query::new()
            .dimensions(&["query", "date", "query", "page"])
            .unwrap();
        assert_eq!(
            q.dimension_list(),
            &[Dimension::Query, Dimension::Date, Dimension::Page]
        );
    }

    #[test]
    fn dimensions_reject_empty_and_unknown() {
        assert!(Query::new().dimensions(&[]).is_err());
        assert!(Query::new().dimensions(&["query", "pages"]).is_err());
    }

    #[test]
    fn filter_rejects_unknown_operator() {
        let err = Query::new()
            .filter("page", "/blog/", "like")
            .unwrap_err();
        assert!(matches!(err, SearchlensError::InvalidArgument(_)));
    }

    #[test]
    fn limit_must_be_positive() {
        assert!(Query::new().limit(0).is_err());
        assert_eq!(Query::new().limit(5).unwrap().row_limit(), Some(5));
    }

    #[test]
    fn builder_calls_commute() {
        let a = Query::new()
            .range("2023-01-01", "2023-01-31")
            .unwrap()
            .filter("country", "usa", "equals")
            .unwrap()
            .dimensions(&["query", "date"])
            .unwrap();
        let b = Query::new()
            .dimensions(&["query", "date"])
            .unwrap()
            .filter("country", "usa", "equals")
            .unwrap()
            .range("2023-01-01", "2023-01-31")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cloned_partial_query_diverges_independently() {
        let base = Query::new().range("2023-01-01", "2023-01-31").unwrap();
        let pages = base.clone().dimensions(&["page"]).unwrap();
        let queries = base.dimensions(&["query"]).unwrap();
        assert_eq!(pages.dimension_list(), &[Dimension::Page]);
        assert_eq!(queries.dimension_list(), &[Dimension::Query]);
    }
}
