//! Alias and ontology expansion of search terms.
//!
//! Both expansions fail open: a lookup failure is logged and the search
//! continues with the terms it already has.

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::{
    db::{Database, SqlValue},
    terms::{Keyword, SearchTerm},
};

pub use error::ExpandError;
use error::Result;

/// Gene-list lookup for one ontology code.
pub const ONTOLOGY_QUERY: &str = "SELECT genes FROM GORef WHERE goterm = ?";

pub trait AliasService: Send + Sync {
    /// Raw alias list for an already-capitalized symbol.
    fn aliases(&self, symbol: &str) -> Result<Vec<String>>;
}

impl<T: AliasService + ?Sized> AliasService for Arc<T> {
    fn aliases(&self, symbol: &str) -> Result<Vec<String>> {
        (**self).aliases(symbol)
    }
}

/// Applies the species' symbol capitalization. Species without a rule get no lookup.
pub fn alias_symbol(symbol: &str, species: &str) -> Option<String> {
    match species.to_ascii_lowercase().as_str() {
        "mouse" => {
            let mut chars = symbol.chars();
            chars.next().map(|first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        }
        "human" => Some(symbol.to_uppercase()),
        _ => None,
    }
}

/// Alias terms for `symbol`, deduplicated in first-seen order.
#[instrument(name = "Expand Aliases", level = "debug", skip(service))]
pub fn expand_aliases(service: &dyn AliasService, symbol: &str, species: &str) -> Vec<SearchTerm> {
    let Some(lookup) = alias_symbol(symbol, species) else {
        return Vec::new();
    };
    match service.aliases(&lookup) {
        Ok(aliases) => {
            let terms: Vec<SearchTerm> = aliases
                .into_iter()
                .map(|alias| alias.trim().to_string())
                .filter(|alias| !alias.is_empty())
                .unique()
                .map(SearchTerm::keyless)
                .collect();
            debug!(aliases = terms.len(), "Expanded symbol aliases");
            terms
        }
        Err(e) => {
            warn!(error = %e, symbol = %lookup, "Alias lookup failed; searching the literal term only");
            Vec::new()
        }
    }
}

/// Genes annotated with the ontology code in a GO-keyed term.
pub fn lookup_ontology_genes(database: &dyn Database, term: &SearchTerm) -> Result<Vec<String>> {
    let code = term.first().ok_or(ExpandError::EmptyOntologyTerm)?;
    let goterm = format!("{}:{}", Keyword::Go.as_str(), code.trim());
    let row = database
        .fetch_one(ONTOLOGY_QUERY, &[SqlValue::Text(goterm.clone())])?
        .ok_or_else(|| ExpandError::OntologyTermNotFound(goterm.clone()))?;
    Ok(row
        .text(0)
        .map(|genes| genes.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default())
}

/// Terms after GO resolution, plus the last ontology term that was resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologyExpansion {
    pub terms: Vec<SearchTerm>,
    pub go_term: Option<String>,
}

/// Replaces every GO-keyed term with keyless gene terms.
///
/// All lookups happen before anything is compiled; the synthesized gene
/// terms follow the original terms and are never expanded again.
#[instrument(name = "Expand Ontology Terms", level = "debug", skip_all, fields(terms = terms.len()))]
pub fn expand_ontology_terms(database: &dyn Database, terms: Vec<SearchTerm>) -> OntologyExpansion {
    let (ontology, mut kept): (Vec<SearchTerm>, Vec<SearchTerm>) = terms
        .into_iter()
        .partition(|term| term.key == Some(Keyword::Go));

    let mut go_term = None;
    for term in &ontology {
        go_term = term.first().map(str::to_string);
        match lookup_ontology_genes(database, term) {
            Ok(genes) => {
                debug!(genes = genes.len(), term = %term, "Resolved ontology term");
                kept.extend(genes.into_iter().map(SearchTerm::keyless));
            }
            Err(ExpandError::OntologyTermNotFound(goterm)) => {
                debug!(%goterm, "Ontology term has no genes");
            }
            Err(e) => warn!(error = %e, term = %term, "Ontology lookup failed; treating as zero genes"),
        }
    }
    OntologyExpansion {
        terms: kept,
        go_term,
    }
}

mod error {
    use thiserror::Error;

    use crate::db::DatabaseError;

    #[derive(Error, Debug)]
    pub enum ExpandError {
        #[error("Ontology term {0} not found")]
        OntologyTermNotFound(String),
        #[error("Ontology term has no code")]
        EmptyOntologyTerm,
        #[error("Ontology lookup failed: {0}")]
        Database(#[from] DatabaseError),
        #[error("Alias service error: {0}")]
        AliasService(#[source] anyhow::Error),
    }

    pub type Result<T> = std::result::Result<T, ExpandError>;
}
