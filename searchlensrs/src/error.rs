use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchlensError>;

#[derive(Debug, Error)]
pub enum SearchlensError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("report is missing the '{0}' dimension")]
    MissingDimension(String),
    #[error("report is missing the '{0}' metric")]
    MissingMetric(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
