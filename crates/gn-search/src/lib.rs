//! gn-search - Search-term compilation and result shaping for GeneNetwork
//!
//! A trait search turns a free-text, multi-term expression into either a
//! full-text index query or a generated SQL query, runs it once, and shapes
//! the rows into display-ready [`TraitRecord`]s that read the same whichever
//! back-end produced them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gn_search::{GeneSearcher, SearchConfig, SearchRequest, test_data};
//!
//! gn_search::init_logging(tracing::Level::INFO)?;
//!
//! let config = SearchConfig::from_env()?;
//! let searcher = GeneSearcher::builder(config)
//!     .database(test_data::RecordingDatabase::new())
//!     .catalog(test_data::StaticCatalog::fixtures())
//!     .with_http_services()?
//!     .build()?;
//!
//! // Two terms joined with AND: a gene symbol and a LOD range
//! let request = SearchRequest::and("HC_M2_0606_P", "grin2b LOD=2 4");
//! let results = searcher.search(&request, "user-1");
//! println!("{} traits", results.trait_list.len());
//! # Ok::<(), gn_search::error::GnSearchError>(())
//! ```
//!
//! # Stages
//!
//! - [`terms`]: denylist check and parsing of the search string
//! - [`expand`]: gene alias and GO-term expansion
//! - [`compile`]: per-term index fragments and SQL fragments
//! - [`search`]: back-end choice, execution and index-to-SQL fallback
//! - [`normalize`] and [`access`]: record shaping and per-trait permissions
//!
//! Databases, the index, the alias service and the authorization service
//! are reached through traits. The `http` feature (on by default) implements
//! the service traits with the clients from `gn-search-clients`.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod access;
pub mod compile;
mod config;
mod core;
mod data_hmac;
pub mod dataset;
pub mod db;
pub mod error;
pub mod expand;
#[cfg(feature = "http")]
mod http;
pub mod index;
pub mod normalize;
pub mod search;
pub mod terms;
pub mod test_data;

pub use self::core::{GeneSearcher, GeneSearcherBuilder, SearchRequest, SearchResultSet, header_data_names};

pub use compile::Backend;
pub use config::{SearchConfig, SearchConfigBuilder};
pub use data_hmac::DataHmac;
pub use dataset::{Dataset, DatasetType, Group};
pub use normalize::{NA, TraitRecord};
pub use terms::{Keyword, LogicalOp, SearchTerm};

#[cfg(feature = "http")]
pub use gn_search_clients as clients;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the search core.
///
/// Installs a `tracing` fmt subscriber filtered at `level` unless `RUST_LOG`
/// says otherwise. Later calls are no-ops.
///
/// ```rust
/// gn_search::init_logging(tracing::Level::WARN)?;
/// # Ok::<(), gn_search::error::GnSearchError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::GnSearchError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}
