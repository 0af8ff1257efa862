use tracing::{debug, info, instrument, warn};

use super::Result;
use crate::{
    compile::{
        Backend, CompileError, CompiledSql, QueryTemplate, SqlQueryBuilder, alias_fragment,
        index_query, sql_fragment,
    },
    dataset::{Dataset, DatasetType},
    db::Database,
    expand::{AliasService, expand_aliases, expand_ontology_terms},
    index::{IndexError, IndexResponse, IndexRow, IndexService},
    normalize::RawRow,
    terms::{LogicalOp, SearchTerm},
};

/// External services one search may call.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub database: &'a dyn Database,
    pub index: Option<&'a dyn IndexService>,
    pub aliases: Option<&'a dyn AliasService>,
}

/// Rows from whichever back-end answered.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub backend: Backend,
    pub rows: Vec<RawRow>,
    /// Ontology code resolved on the SQL path, if any.
    pub go_term: Option<String>,
}

/// Whether the index can answer the whole term set.
///
/// Every keyword must be index-compatible, and keyless terms are only
/// indexed outside phenotype datasets.
pub fn index_eligible(dataset_type: DatasetType, terms: &[SearchTerm]) -> bool {
    dataset_type.index_type().is_some()
        && terms.iter().all(|term| match term.key {
            Some(key) => key.is_index_compatible(),
            None => dataset_type != DatasetType::Publish,
        })
}

/// Runs `terms` against the index when eligible, otherwise (or on an
/// empty or failed index answer) against SQL.
#[instrument(name = "Plan And Run", level = "info", skip_all, fields(dataset = %dataset.name, terms = terms.len(), op = %op))]
pub fn plan_and_run(
    services: Collaborators<'_>,
    dataset: &Dataset,
    terms: Vec<SearchTerm>,
    op: LogicalOp,
    use_index: bool,
    per_page: usize,
) -> Result<SearchOutcome> {
    if use_index && index_eligible(dataset.dataset_type, &terms) {
        if let Some(index) = services.index {
            match run_index(index, dataset, &terms, op, per_page) {
                Ok(rows) if !rows.is_empty() => {
                    info!(rows = rows.len(), "Index search answered");
                    return Ok(SearchOutcome {
                        backend: Backend::Index,
                        rows,
                        go_term: None,
                    });
                }
                Ok(_) => info!("Index returned no rows; falling back to SQL"),
                Err(e) => warn!(error = %e, "Index search failed; falling back to SQL"),
            }
        }
    } else {
        debug!("Terms are not index-eligible; using SQL");
    }
    run_sql(services, dataset, terms, op)
}

fn run_index(
    index: &dyn IndexService,
    dataset: &Dataset,
    terms: &[SearchTerm],
    op: LogicalOp,
    per_page: usize,
) -> Result<Vec<RawRow>> {
    let query = index_query(dataset, terms, op, per_page)?;
    debug!(query = %query.query, search_type = query.search_type, "Compiled index query");
    match index.search(&query)? {
        IndexResponse::Error(message) => Err(IndexError::Service(message).into()),
        IndexResponse::Rows(values) => Ok(values
            .into_iter()
            .filter_map(|value| match IndexRow::from_value(value) {
                Ok(row) => Some(RawRow::Index(row)),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable index row");
                    None
                }
            })
            .collect()),
    }
}

/// Compiles the whole term set into one statement.
///
/// Keyless ProbeSet terms become an OR-group of their aliases and the
/// literal term. `Ok(None)` means there was nothing to compile.
pub fn compile_sql(
    dataset: &Dataset,
    terms: &[SearchTerm],
    op: LogicalOp,
    aliases: Option<&dyn AliasService>,
) -> std::result::Result<Option<CompiledSql>, CompileError> {
    let template = QueryTemplate::for_dataset(dataset.dataset_type)?;
    let mut builder = SqlQueryBuilder::new();
    for term in terms {
        let literal = sql_fragment(term, dataset)?;
        let mut group = Vec::new();
        if term.key.is_none()
            && dataset.dataset_type == DatasetType::ProbeSet
            && let (Some(aliases), Some(symbol)) = (aliases, term.first())
        {
            for alias in expand_aliases(aliases, symbol, &dataset.group.species) {
                group.push(alias_fragment(&alias)?);
            }
        }
        group.push(literal);
        builder.push_group(group);
    }
    Ok(builder.finish(template, dataset, op))
}

#[instrument(name = "SQL Search", level = "info", skip_all, fields(dataset = %dataset.name))]
fn run_sql(
    services: Collaborators<'_>,
    dataset: &Dataset,
    terms: Vec<SearchTerm>,
    op: LogicalOp,
) -> Result<SearchOutcome> {
    let expansion = expand_ontology_terms(services.database, terms);
    let rows = match compile_sql(dataset, &expansion.terms, op, services.aliases)? {
        Some(compiled) => {
            debug!(sql = %compiled.render_inline(), "Compiled SQL query");
            let rows = services.database.fetch_all(&compiled.sql, &compiled.params)?;
            info!(rows = rows.len(), "SQL search answered");
            rows.into_iter().map(RawRow::Sql).collect()
        }
        None => {
            info!("No terms left after ontology expansion");
            Vec::new()
        }
    };
    Ok(SearchOutcome {
        backend: Backend::Sql,
        rows,
        go_term: expansion.go_term,
    })
}
