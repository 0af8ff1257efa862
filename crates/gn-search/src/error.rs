use thiserror::Error;

#[derive(Error, Debug)]
pub enum GnSearchError {
    #[error("Parse error: {0}")]
    ParseError(#[from] crate::terms::ParseError),
    #[error("Compile error: {0}")]
    CompileError(#[from] crate::compile::CompileError),
    #[error("Expansion error: {0}")]
    ExpandError(#[from] crate::expand::ExpandError),
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] crate::db::DatabaseError),
    #[error("Access error: {0}")]
    AccessError(#[from] crate::access::AccessError),
    #[error("Normalize error: {0}")]
    NormalizeError(#[from] crate::normalize::NormalizeError),
    #[error("Dataset error: {0}")]
    DatasetError(#[from] crate::dataset::DatasetError),
    #[error("Search error: {0}")]
    SearchError(#[from] crate::search::SearchError),
    #[cfg(feature = "http")]
    #[error("HTTP client error: {0}")]
    ClientError(#[from] gn_search_clients::ClientError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GnSearchError>;
