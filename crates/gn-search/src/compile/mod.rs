//! Search-term compilation.
//!
//! Every `(keyword, dataset type)` pair is matched exhaustively: a pair
//! without a rule is a [`CompileError::UnsupportedKeyword`], never a silent
//! fall-through. One term compiles either to an index query fragment or to
//! SQL fragments that [`SqlQueryBuilder`] assembles into a single statement.

use serde::Serialize;

use crate::{
    dataset::Dataset,
    terms::{Keyword, SearchTerm},
};

mod index_terms;
mod query;
mod sql_terms;

pub use error::CompileError;
use error::Result;
pub use index_terms::{index_fragment, index_query};
pub(crate) use query::columns;
pub use query::{CompiledSql, QueryTemplate, SqlQueryBuilder};
pub use sql_terms::{SqlFragment, alias_fragment, sql_fragment};

/// LRS = LOD × 4.61.
pub const LOD_TO_LRS: f64 = 4.61;

/// Execution back-end a search ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Backend {
    Index,
    Sql,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompilationResult {
    IndexFragment(String),
    SqlFragment {
        fragment: SqlFragment,
        query: QueryTemplate,
    },
}

/// Compiles one term for `backend`, scoped to `dataset`.
pub fn compile(term: &SearchTerm, dataset: &Dataset, backend: Backend) -> Result<CompilationResult> {
    match backend {
        Backend::Index => index_fragment(term, dataset).map(CompilationResult::IndexFragment),
        Backend::Sql => Ok(CompilationResult::SqlFragment {
            fragment: sql_fragment(term, dataset)?,
            query: QueryTemplate::for_dataset(dataset.dataset_type)?,
        }),
    }
}

/// Inclusive numeric range, always stored low-to-high.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Locus {
    pub chromosome: String,
    pub mb: Range,
}

/// LRS/LOD operands with the score already in LRS units.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeakFilter {
    pub score: Range,
    pub locus: Option<Locus>,
}

fn check_arity(term: &SearchTerm, key: Keyword) -> Result<()> {
    let found = term.operand_count();
    if key.arities().contains(&found) {
        Ok(())
    } else {
        Err(CompileError::Arity {
            key,
            expected: key.arities().to_vec(),
            found,
        })
    }
}

fn number(key: Keyword, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CompileError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}

fn range(key: Keyword, low: &str, high: &str, scale: f64) -> Result<Range> {
    Ok(Range::ordered(
        number(key, low)? * scale,
        number(key, high)? * scale,
    ))
}

/// Strips a leading `chr`, any case.
pub(crate) fn strip_chr(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &raw[3..],
        _ => raw,
    }
}

pub(crate) fn position_operands(term: &SearchTerm) -> Result<Locus> {
    check_arity(term, Keyword::Position)?;
    let ops = &term.search_term;
    Ok(Locus {
        chromosome: strip_chr(&ops[0]).to_string(),
        mb: range(Keyword::Position, &ops[1], &ops[2], 1.0)?,
    })
}

pub(crate) fn mean_operands(term: &SearchTerm) -> Result<Range> {
    check_arity(term, Keyword::Mean)?;
    range(Keyword::Mean, &term.search_term[0], &term.search_term[1], 1.0)
}

/// LOD bounds are scaled to LRS; the peak megabase bounds never are.
pub(crate) fn peak_operands(term: &SearchTerm, key: Keyword) -> Result<PeakFilter> {
    check_arity(term, key)?;
    let ops = &term.search_term;
    let scale = if key == Keyword::Lod { LOD_TO_LRS } else { 1.0 };
    let score = range(key, &ops[0], &ops[1], scale)?;
    let locus = if ops.len() == 5 {
        Some(Locus {
            chromosome: strip_chr(&ops[2]).to_string(),
            mb: range(key, &ops[3], &ops[4], 1.0)?,
        })
    } else {
        None
    };
    Ok(PeakFilter { score, locus })
}

/// The single operand of a text-valued term.
pub(crate) fn text_operand(term: &SearchTerm) -> Result<&str> {
    match term.search_term.as_slice() {
        [only] if !only.trim().is_empty() => Ok(only.trim()),
        [] | [_] => Err(CompileError::EmptyTerm),
        many => Err(match term.key {
            Some(key) => CompileError::Arity {
                key,
                expected: key.arities().to_vec(),
                found: many.len(),
            },
            None => CompileError::KeylessArity {
                expected: vec![1],
                found: many.len(),
            },
        }),
    }
}

mod error {
    use thiserror::Error;

    use crate::{dataset::DatasetType, terms::Keyword};

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum CompileError {
        #[error(
            "No search is defined for {} on {dataset_type} datasets",
            .key.map_or("keyless terms", Keyword::as_str)
        )]
        UnsupportedKeyword {
            key: Option<Keyword>,
            dataset_type: DatasetType,
        },
        #[error("{key} expects {expected:?} operands, got {found}")]
        Arity {
            key: Keyword,
            expected: Vec<usize>,
            found: usize,
        },
        #[error("Keyless terms expect {expected:?} operands, got {found}")]
        KeylessArity { expected: Vec<usize>, found: usize },
        #[error("{key} operand '{value}' is not a number")]
        InvalidNumber { key: Keyword, value: String },
        #[error("Search term is empty")]
        EmptyTerm,
        #[error("Ontology term {0} must be expanded before compilation")]
        UnexpandedOntologyTerm(String),
    }

    pub type Result<T> = std::result::Result<T, CompileError>;
}
