//! Full-text index back-end: request shape, service seam and row decoding.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod loose;

pub use error::IndexError;
use error::Result;

/// One request to the index service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexQuery {
    pub query: String,
    /// `gene`, `phenotype` or `genotype`.
    pub search_type: &'static str,
    pub per_page: usize,
}

/// What the index service answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexResponse {
    Rows(Vec<Value>),
    /// The service answered with an object carrying an `error` key.
    Error(String),
}

pub trait IndexService: Send + Sync {
    fn search(&self, query: &IndexQuery) -> Result<IndexResponse>;
}

impl<T: IndexService + ?Sized> IndexService for Arc<T> {
    fn search(&self, query: &IndexQuery) -> Result<IndexResponse> {
        (**self).search(query)
    }
}

/// A decoded index record.
///
/// The index is loosely typed: numbers may arrive as strings and vice
/// versa, and any field may be missing or `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexRow {
    #[serde(deserialize_with = "loose::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose::string")]
    pub dataset: Option<String>,
    #[serde(deserialize_with = "loose::string")]
    pub symbol: Option<String>,
    #[serde(deserialize_with = "loose::string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "loose::string")]
    pub chr: Option<String>,
    #[serde(deserialize_with = "loose::number")]
    pub mb: Option<f64>,
    #[serde(deserialize_with = "loose::number")]
    pub mean: Option<f64>,
    #[serde(deserialize_with = "loose::number")]
    pub lrs: Option<f64>,
    #[serde(deserialize_with = "loose::number")]
    pub additive: Option<f64>,
    #[serde(deserialize_with = "loose::string")]
    pub geno_chr: Option<String>,
    #[serde(deserialize_with = "loose::number")]
    pub geno_mb: Option<f64>,
    #[serde(deserialize_with = "loose::string")]
    pub inbredsetcode: Option<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub authors: Vec<String>,
    #[serde(deserialize_with = "loose::string")]
    pub year: Option<String>,
    #[serde(deserialize_with = "loose::string")]
    pub pubmed_id: Option<String>,
}

impl IndexRow {
    /// Only JSON objects are rows; serde would otherwise read an array
    /// positionally into the fields.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(IndexError::Decode(serde::de::Error::custom(
                "index row is not a JSON object",
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("Index service error: {0}")]
        Service(String),
        #[error("Index transport error: {0}")]
        Transport(#[source] anyhow::Error),
        #[error("Malformed index row: {0}")]
        Decode(#[from] serde_json::Error),
    }

    pub type Result<T> = std::result::Result<T, IndexError>;
}
