//! Query planning and execution.
//!
//! Picks the back-end for a term set, runs the compiled query once and
//! falls back from the index to SQL when the index has nothing usable.

pub use error::SearchError;
mod search_orchestration;

use error::Result;
pub use search_orchestration::{
    Collaborators, SearchOutcome, compile_sql, index_eligible, plan_and_run,
};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Compile error: {0}")]
        Compile(#[from] crate::compile::CompileError),
        #[error("Index error: {0}")]
        Index(#[from] crate::index::IndexError),
        #[error("Database error: {0}")]
        Database(#[from] crate::db::DatabaseError),
    }
    pub type Result<T> = std::result::Result<T, SearchError>;
}
