//! HTTP clients for the services the GeneNetwork search core talks to.
//!
//! Each client is a blocking facade over an async `reqwest` client. The
//! facades share one [`HttpTransport`], which owns the `tokio` runtime that
//! drives the requests, so callers never need to be async themselves.
//!
//! - [`IndexClient`]: the full-text search index (`GET /api/search`).
//! - [`AliasClient`]: gene symbol aliases (`GET /gn3/gene/aliases/<symbol>`).
//! - [`AuthClient`]: per-resource permission lookups (`GET /available`).

mod aliases;
mod auth;
mod index;
mod transport;

pub use aliases::AliasClient;
pub use auth::{AuthClient, ResourceAvailability};
pub use index::{IndexClient, IndexPayload};
pub use transport::{DEFAULT_TIMEOUT, HttpTransport};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ClientError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("Unexpected status {status} from {url}")]
        Status {
            status: reqwest::StatusCode,
            url: String,
        },
        #[error("Invalid URL: {0}")]
        Url(#[from] url::ParseError),
        #[error("Base URL cannot carry path segments: {0}")]
        CannotBeABase(String),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Runtime error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub type Result<T> = std::result::Result<T, ClientError>;
}

pub use error::{ClientError, Result};
