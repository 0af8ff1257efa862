//! Structured search terms and the parser that produces them.
//!
//! A search string such as `grin2b LOD=2 4 POSITION=(chr1 10 20)` becomes an
//! ordered list of [`SearchTerm`]s. Each term carries an optional
//! [`Keyword`] and its operands; the keyword decides how many operands are
//! legal and which back-ends can answer it.

use std::{fmt, str::FromStr};

use serde::Serialize;

mod parser;

pub use error::ParseError;
pub use parser::{is_suspicious, parse};

/// Closed set of search keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Position,
    Mean,
    Lrs,
    Lod,
    Rif,
    Wiki,
    Author,
    Go,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Mean => "MEAN",
            Self::Lrs => "LRS",
            Self::Lod => "LOD",
            Self::Rif => "RIF",
            Self::Wiki => "WIKI",
            Self::Author => "AUTHOR",
            Self::Go => "GO",
        }
    }

    /// Keywords the full-text index can answer. AUTHOR and GO always go to SQL.
    pub const fn is_index_compatible(self) -> bool {
        !matches!(self, Self::Author | Self::Go)
    }

    /// Legal operand counts.
    pub const fn arities(self) -> &'static [usize] {
        match self {
            Self::Position => &[3],
            Self::Mean => &[2],
            Self::Lrs | Self::Lod => &[2, 5],
            Self::Rif | Self::Wiki | Self::Author | Self::Go => &[1],
        }
    }

    pub fn max_arity(self) -> usize {
        self.arities().iter().copied().max().unwrap_or(1)
    }

    /// Operand position that names a chromosome, if any.
    pub const fn chromosome_slot(self) -> Option<usize> {
        match self {
            Self::Position => Some(0),
            Self::Lrs | Self::Lod => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITION" | "POS" | "MB" => Ok(Self::Position),
            "MEAN" => Ok(Self::Mean),
            "LRS" => Ok(Self::Lrs),
            "LOD" => Ok(Self::Lod),
            "RIF" => Ok(Self::Rif),
            "WIKI" => Ok(Self::Wiki),
            "AUTHOR" => Ok(Self::Author),
            "GO" => Ok(Self::Go),
            _ => Err(ParseError::UnknownKeyword(s.to_string())),
        }
    }
}

/// Logical joiner between terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic clause of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTerm {
    pub key: Option<Keyword>,
    pub search_term: Vec<String>,
    /// Joiner to the next term; `None` on the last one.
    pub separator: Option<LogicalOp>,
}

impl SearchTerm {
    pub fn keyless(text: impl Into<String>) -> Self {
        Self {
            key: None,
            search_term: vec![text.into()],
            separator: None,
        }
    }

    pub fn keyed<I, S>(key: Keyword, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: Some(key),
            search_term: operands.into_iter().map(Into::into).collect(),
            separator: None,
        }
    }

    pub fn with_separator(mut self, separator: Option<LogicalOp>) -> Self {
        self.separator = separator;
        self
    }

    pub fn first(&self) -> Option<&str> {
        self.search_term.first().map(String::as_str)
    }

    pub fn operand_count(&self) -> usize {
        self.search_term.len()
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Some(key) => write!(f, "{key}=({})", self.search_term.join(" ")),
            None => f.write_str(&self.search_term.join(" ")),
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ParseError {
        #[error("Search string is empty")]
        Empty,
        #[error("Unknown search keyword '{0}'")]
        UnknownKeyword(String),
        #[error("Keyword {0} has no operands")]
        MissingOperand(String),
        #[error("Search string contains disallowed tokens")]
        Suspicious,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_synonyms() {
        assert_eq!("pos".parse::<Keyword>().unwrap(), Keyword::Position);
        assert_eq!("Mb".parse::<Keyword>().unwrap(), Keyword::Position);
        assert_eq!("lod".parse::<Keyword>().unwrap(), Keyword::Lod);
        assert_eq!(
            "CISLRS".parse::<Keyword>(),
            Err(ParseError::UnknownKeyword("CISLRS".into()))
        );
    }

    #[test]
    fn test_index_compatibility() {
        let compatible: Vec<_> = [
            Keyword::Position,
            Keyword::Mean,
            Keyword::Lrs,
            Keyword::Lod,
            Keyword::Rif,
            Keyword::Wiki,
            Keyword::Author,
            Keyword::Go,
        ]
        .into_iter()
        .filter(|k| k.is_index_compatible())
        .collect();
        assert_eq!(
            compatible,
            vec![
                Keyword::Position,
                Keyword::Mean,
                Keyword::Lrs,
                Keyword::Lod,
                Keyword::Rif,
                Keyword::Wiki
            ]
        );
    }

    #[test]
    fn test_display() {
        let term = SearchTerm::keyed(Keyword::Lrs, ["20", "30"]);
        assert_eq!(term.to_string(), "LRS=(20 30)");
        assert_eq!(SearchTerm::keyless("shh").to_string(), "shh");
        assert_eq!(Keyword::Lod.max_arity(), 5);
        assert_eq!(Keyword::Lrs.chromosome_slot(), Some(2));
        assert_eq!(Keyword::Mean.chromosome_slot(), None);
    }
}
