use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use searchlens::{Query, Result, SearchlensError, SqlExecutor, Table, WarehouseClient};

/// SQL rendering never touches the network, so the demo runs without a
/// warehouse connection.
struct Offline;

#[async_trait]
impl WarehouseClient for Offline {
    async fn dry_run(&self, _sql: &str) -> Result<u64> {
        Err(SearchlensError::Backend("offline demo client".to_string()))
    }

    async fn execute(&self, _sql: &str) -> Result<Table> {
        Err(SearchlensError::Backend("offline demo client".to_string()))
    }
}

fn usage() {
    eprintln!("Usage: print_sql <dataset> <start> <end> [dimension ...]");
    eprintln!(
        "Example: cargo run --example print_sql -- project.searchconsole 2024-01-01 2024-01-31 query page"
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 3 {
        usage();
        std::process::exit(1);
    }
    let dataset = args.remove(0);
    let start = args.remove(0);
    let end = args.remove(0);
    let dimensions: Vec<&str> = if args.is_empty() {
        vec!["query"]
    } else {
        args.iter().map(String::as_str).collect()
    };

    let query = Query::new().range(&start, &end)?.dimensions(&dimensions)?;
    let executor = SqlExecutor::new(Arc::new(Offline), dataset);
    println!("{}", executor.render_sql(&query)?);
    Ok(())
}
