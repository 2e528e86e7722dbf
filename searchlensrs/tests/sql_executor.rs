//! Integration tests for the warehouse SQL executor: text generation, table
//! selection and the dry-run cost guard.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use searchlens::{
    FetchOutcome, Query, Result, Row, SearchlensError, SqlExecutor, Table, WarehouseClient,
    WarehouseConfig,
};
use serde_json::Value;

// ============================================================================
// Test doubles
// ============================================================================

struct ScriptedWarehouse {
    bytes_scanned: u64,
    result: Table,
    dry_runs: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedWarehouse {
    fn new(bytes_scanned: u64, result: Table) -> Arc<Self> {
        Arc::new(Self {
            bytes_scanned,
            result,
            dry_runs: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        })
    }

    fn empty(bytes_scanned: u64) -> Arc<Self> {
        Self::new(bytes_scanned, Table::default())
    }
}

#[async_trait]
impl WarehouseClient for ScriptedWarehouse {
    async fn dry_run(&self, sql: &str) -> Result<u64> {
        self.dry_runs.lock().unwrap().push(sql.to_string());
        Ok(self.bytes_scanned)
    }

    async fn execute(&self, sql: &str) -> Result<Table> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }
}

fn base_query() -> Query {
    Query::new()
        .range("2023-01-01", "2023-01-31")
        .unwrap()
        .dimensions(&["query"])
        .unwrap()
}

// ============================================================================
// Cost guard
// ============================================================================

#[tokio::test]
async fn default_fetch_stops_at_the_cost_estimate() {
    let warehouse = ScriptedWarehouse::empty(1u64 << 40);
    let executor = SqlExecutor::new(warehouse.clone(), "project.dataset");

    let outcome = executor.fetch(&base_query()).await.unwrap();
    let estimate = outcome.cost_estimate().unwrap();
    assert_eq!(estimate.bytes_scanned, 1u64 << 40);
    assert_eq!(estimate.estimated_cost_usd, 5.0);

    assert_eq!(warehouse.dry_runs.lock().unwrap().len(), 1);
    assert!(warehouse.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn opting_out_of_the_estimate_executes() {
    let mut row = Row::new();
    row.insert("query".to_string(), Value::from("rust"));
    row.insert("clicks".to_string(), Value::from(12.0));
    let result = Table::from_rows(vec!["query", "clicks"], vec![row]);

    let warehouse = ScriptedWarehouse::new(2048, result);
    let executor = SqlExecutor::new(warehouse.clone(), "project.dataset");

    let query = base_query().estimate_cost(false);
    let outcome = executor.fetch(&query).await.unwrap();
    let report = match outcome {
        FetchOutcome::Report(report) => report,
        FetchOutcome::CostEstimate(_) => panic!("expected an executed report"),
    };
    assert_eq!(report.table().len(), 1);
    assert_eq!(report.site_url(), "project.dataset");

    // The dry run still happened before execution.
    assert_eq!(warehouse.dry_runs.lock().unwrap().len(), 1);
    assert_eq!(warehouse.executed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn custom_pricing_flows_into_the_estimate() {
    let warehouse = ScriptedWarehouse::empty(1u64 << 39);
    let executor = SqlExecutor::with_config(
        warehouse,
        "project.dataset",
        WarehouseConfig {
            price_per_terabyte: 6.25,
        },
    );

    let outcome = executor.fetch(&base_query()).await.unwrap();
    assert_eq!(outcome.cost_estimate().unwrap().estimated_cost_usd, 3.125);
}

// ============================================================================
// SQL text
// ============================================================================

#[test]
fn dimensions_are_aliased_back_to_canonical_names() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");
    let query = Query::new()
        .range("2023-01-01", "2023-01-31")
        .unwrap()
        .dimensions(&["page", "date", "query"])
        .unwrap()
        .filter("country", "usa", "equals")
        .unwrap()
        .limit(100)
        .unwrap();

    let sql = executor.render_sql(&query).unwrap();
    assert_eq!(
        sql,
        "SELECT url AS page, data_date AS date, query, \
         SUM(clicks) AS clicks, SUM(impressions) AS impressions, \
         SAFE_DIVIDE(SUM(clicks), SUM(impressions)) AS ctr, \
         SAFE_DIVIDE(SUM(sum_position), SUM(impressions)) + 1 AS position \
         FROM `project.dataset.searchdata_url_impression` \
         WHERE data_date BETWEEN '2023-01-01' AND '2023-01-31' \
         AND country = 'usa' \
         GROUP BY url, data_date, query LIMIT 100"
    );
}

#[test]
fn each_operator_renders_its_predicate() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");
    let cases = [
        ("equals", "query = 'rust'"),
        ("notEquals", "query != 'rust'"),
        ("contains", "query LIKE '%rust%'"),
        ("notContains", "query NOT LIKE '%rust%'"),
        ("includingRegex", "REGEXP_CONTAINS(query, 'rust')"),
        ("excludingRegex", "NOT REGEXP_CONTAINS(query, 'rust')"),
    ];
    for (operator, predicate) in cases {
        let query = base_query().filter("query", "rust", operator).unwrap();
        let sql = executor.render_sql(&query).unwrap();
        assert!(sql.contains(predicate), "{operator}: {sql}");
    }
}

#[test]
fn string_literals_are_escaped() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");
    let query = base_query().filter("query", "o'reilly", "equals").unwrap();
    let sql = executor.render_sql(&query).unwrap();
    assert!(sql.contains("query = 'o\\'reilly'"));
}

#[test]
fn site_table_is_used_when_nothing_touches_pages() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");

    let site_level = Query::new()
        .range("2023-01-01", "2023-01-31")
        .unwrap()
        .dimensions(&["query", "country"])
        .unwrap();
    assert!(executor
        .render_sql(&site_level)
        .unwrap()
        .contains("searchdata_site_impression"));

    // A page filter forces the URL table even without a page dimension.
    let page_filtered = site_level.filter("page", "/blog/", "contains").unwrap();
    assert!(executor
        .render_sql(&page_filtered)
        .unwrap()
        .contains("searchdata_url_impression"));
}

#[test]
fn date_filters_are_rejected() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");
    let query = base_query()
        .filter("date", "2023-01-15", "equals")
        .unwrap();
    assert!(matches!(
        executor.render_sql(&query).unwrap_err(),
        SearchlensError::InvalidArgument(_)
    ));
}

#[tokio::test]
async fn fetch_requires_dimensions_and_range() {
    let executor = SqlExecutor::new(ScriptedWarehouse::empty(0), "project.dataset");

    let no_dims = Query::new().range("2023-01-01", "2023-01-31").unwrap();
    assert!(matches!(
        executor.fetch(&no_dims).await.unwrap_err(),
        SearchlensError::Precondition(_)
    ));

    let no_range = Query::new().dimensions(&["query"]).unwrap();
    assert!(matches!(
        executor.fetch(&no_range).await.unwrap_err(),
        SearchlensError::Precondition(_)
    ));
}
