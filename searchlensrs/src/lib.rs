pub mod backends;
pub mod config;
pub mod error;
pub mod external;
pub mod model;
pub mod query;
pub mod report;
pub mod table;

pub use backends::{
    ApiExecutor, ApiPage, ApiRow, CostEstimate, FetchOutcome, SearchConsoleApi, SqlExecutor,
    WarehouseClient,
};
pub use config::{ApiConfig, SearchlensConfig, WarehouseConfig};
pub use error::{Result, SearchlensError};
pub use external::{CausalAnalyst, Forecaster, SearchVolumeProvider};
pub use model::{DataState, Dimension, Metric, Operator, Period, SearchType};
pub use query::{FilterClause, FilterSet, Query};
pub use report::{
    CannibalizationOptions, ContentDecayOptions, DecayEntity, DecayPeriod, PagesLifespan, Report,
    VolumeOutcome,
};
pub use table::{Row, Table};
