//! Relational database seam.
//!
//! The search core never owns a connection; it hands parameterized SQL to a
//! [`Database`] and reads positional rows back.

use std::{borrow::Cow, fmt, sync::Arc};

pub use error::DatabaseError;
use error::Result;

/// A bound parameter or a returned cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

static NULL_VALUE: SqlValue = SqlValue::Null;

impl SqlValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text view of the cell. Byte columns are decoded as UTF-8 with a Latin-1 fallback.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Int(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(f) => Some(Cow::Owned(f.to_string())),
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Bytes(b) => Some(decode_text(b)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) | Self::Bytes(_) => self.as_text()?.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// SQL literal for this value. Only used to render queries for logs.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => format!("X'{}'", hex::encode(b)),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Decodes stored text, trying UTF-8 first and falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().copied().map(char::from).collect()),
    }
}

/// One positional result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow(Vec<SqlValue>);

impl SqlRow {
    pub const fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cell at `index`; out-of-range reads as `NULL`.
    pub fn get(&self, index: usize) -> &SqlValue {
        self.0.get(index).unwrap_or(&NULL_VALUE)
    }

    /// Trimmed text at `index`; `NULL` and empty cells read as `None`.
    pub fn text(&self, index: usize) -> Option<String> {
        self.get(index)
            .as_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn float(&self, index: usize) -> Option<f64> {
        self.get(index).as_f64()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }
}

impl From<Vec<SqlValue>> for SqlRow {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}

pub trait Database: Send + Sync {
    /// Executes `sql` with `params` bound positionally to its `?` placeholders.
    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>>;

    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlRow>> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }
}

impl<T: Database + ?Sized> Database for Arc<T> {
    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        (**self).fetch_all(sql, params)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DatabaseError {
        #[error("Query failed: {0}")]
        Query(String),
        #[error("Connection error: {0}")]
        Connection(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }

    pub type Result<T> = std::result::Result<T, DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text("Müller".as_bytes()), "Müller");
        assert_eq!(decode_text(&[0x4d, 0xfc, 0x6c, 0x6c, 0x65, 0x72]), "Müller");
    }

    #[test]
    fn test_row_accessors() {
        let row = SqlRow::new(vec![
            SqlValue::Text("  Shh ".into()),
            SqlValue::Bytes(b"sonic hedgehog".to_vec()),
            SqlValue::Text("12.5".into()),
            SqlValue::Null,
            SqlValue::Text(String::new()),
        ]);
        assert_eq!(row.text(0).as_deref(), Some("Shh"));
        assert_eq!(row.text(1).as_deref(), Some("sonic hedgehog"));
        assert_eq!(row.float(2), Some(12.5));
        assert_eq!(row.text(3), None);
        assert_eq!(row.text(4), None);
        assert!(row.get(42).is_null());
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(SqlValue::from("O'Brien").to_sql_literal(), "'O''Brien'");
        assert_eq!(SqlValue::from(20.0).to_sql_literal(), "20");
        assert_eq!(SqlValue::from(9.22).to_sql_literal(), "9.22");
        assert_eq!(SqlValue::from(7_u64).to_sql_literal(), "7");
        assert_eq!(SqlValue::from(None::<i64>).to_sql_literal(), "NULL");
    }
}
