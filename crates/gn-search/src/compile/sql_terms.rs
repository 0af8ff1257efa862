use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    CompileError, Result, mean_operands, peak_operands, position_operands, text_operand,
};
use crate::{
    dataset::{Dataset, DatasetType},
    db::SqlValue,
    terms::{Keyword, SearchTerm},
};

/// Short-prefix or short-suffix hyphenated symbols (`h-2`, `Ccl-21a`) that
/// the full-text parser would otherwise split on the hyphen.
static HYPHENATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w{1,2}-\w+|\w+-\w{1,2}").expect("hyphen pattern is valid"));

const PROBESET_MATCH_COLUMNS: &str = "ProbeSet.Name, ProbeSet.description, ProbeSet.symbol, \
    ProbeSet.alias, ProbeSet.GenbankId, ProbeSet.UniGeneId, ProbeSet.Probe_Target_Description";

const PHENOTYPE_TEXT_COLUMNS: [&str; 10] = [
    "Phenotype.Post_publication_description",
    "Phenotype.Pre_publication_description",
    "Phenotype.Pre_publication_abbreviation",
    "Phenotype.Post_publication_abbreviation",
    "Phenotype.Lab_code",
    "Publication.PubMed_ID",
    "Publication.Abstract",
    "Publication.Title",
    "Publication.Authors",
    "PublishXRef.Id",
];

const GENOTYPE_TEXT_COLUMNS: [&str; 2] = ["Geno.Name", "Geno.Chr"];

const RIF_JOIN: &str = "INNER JOIN GeneRIF_BASIC ON GeneRIF_BASIC.symbol = ProbeSet.Symbol";
const WIKI_JOIN: &str = "INNER JOIN GeneRIF ON GeneRIF.symbol = ProbeSet.Symbol";

/// SQL pieces contributed by one term.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// Extra join appended to the base query's FROM clause.
    pub from_clause: Option<String>,
    pub where_clause: String,
    /// Values for the `?` placeholders in `where_clause`, in order.
    pub params: Vec<SqlValue>,
}

impl SqlFragment {
    fn predicate(where_clause: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            from_clause: None,
            where_clause: where_clause.into(),
            params,
        }
    }

    fn joined(mut self, from_clause: &str) -> Self {
        self.from_clause = Some(from_clause.to_string());
        self
    }
}

/// Compiles one term into SQL fragments for `dataset`.
pub fn sql_fragment(term: &SearchTerm, dataset: &Dataset) -> Result<SqlFragment> {
    use DatasetType as D;
    use Keyword as K;

    let dataset_type = dataset.dataset_type;
    match (term.key, dataset_type) {
        (None, D::ProbeSet) => probeset_text(term),
        (None, D::Publish) => like_any(&PHENOTYPE_TEXT_COLUMNS, term),
        (None, D::Geno) => like_any(&GENOTYPE_TEXT_COLUMNS, term),
        (Some(K::Position), D::ProbeSet | D::Geno) => position(term, dataset_type),
        (Some(K::Mean), D::ProbeSet | D::Publish) => mean(term, dataset_type),
        (Some(key @ (K::Lrs | K::Lod)), D::ProbeSet | D::Publish) => peak(term, key, dataset_type),
        (Some(K::Rif), D::ProbeSet) => rif(term),
        (Some(K::Wiki), D::ProbeSet) => wiki(term),
        (Some(K::Author), D::Publish) => author(term),
        (Some(K::Go), D::ProbeSet | D::Publish | D::Geno) => {
            Err(CompileError::UnexpandedOntologyTerm(term.search_term.join(" ")))
        }
        (key, dataset_type) => Err(CompileError::UnsupportedKeyword { key, dataset_type }),
    }
}

/// Match clause for one alias of a keyless ProbeSet term.
pub fn alias_fragment(alias: &SearchTerm) -> Result<SqlFragment> {
    let alias = text_operand(alias)?;
    Ok(SqlFragment::predicate(
        "MATCH (ProbeSet.symbol) AGAINST (? IN BOOLEAN MODE)",
        vec![boolean_mode_term(alias).into()],
    ))
}

fn boolean_mode_term(raw: &str) -> String {
    if HYPHENATED_RE.is_match(raw) {
        format!("\"{raw}*\"")
    } else {
        raw.to_string()
    }
}

/// `*` → `%` and `?` → `_`, wrapped for a substring match.
fn like_pattern(raw: &str) -> String {
    let translated: String = raw
        .chars()
        .map(|c| match c {
            '*' => '%',
            '?' => '_',
            other => other,
        })
        .collect();
    format!("%{translated}%")
}

fn probeset_text(term: &SearchTerm) -> Result<SqlFragment> {
    let text = text_operand(term)?;
    if text == "*" {
        return Ok(SqlFragment::predicate("1 = 1", Vec::new()));
    }
    Ok(SqlFragment::predicate(
        format!("MATCH ({PROBESET_MATCH_COLUMNS}) AGAINST (? IN BOOLEAN MODE)"),
        vec![boolean_mode_term(text).into()],
    ))
}

fn like_any(columns: &[&str], term: &SearchTerm) -> Result<SqlFragment> {
    let pattern = like_pattern(text_operand(term)?);
    Ok(SqlFragment::predicate(
        columns.iter().map(|c| format!("{c} LIKE ?")).join(" OR "),
        vec![SqlValue::Text(pattern); columns.len()],
    ))
}

fn position(term: &SearchTerm, dataset_type: DatasetType) -> Result<SqlFragment> {
    let locus = position_operands(term)?;
    let table = dataset_type.as_str();
    Ok(SqlFragment::predicate(
        format!("{table}.Chr = ? AND {table}.Mb BETWEEN ? AND ?"),
        vec![
            locus.chromosome.into(),
            locus.mb.low.into(),
            locus.mb.high.into(),
        ],
    ))
}

fn mean(term: &SearchTerm, dataset_type: DatasetType) -> Result<SqlFragment> {
    let range = mean_operands(term)?;
    Ok(SqlFragment::predicate(
        format!("{}XRef.mean BETWEEN ? AND ?", dataset_type.as_str()),
        vec![range.low.into(), range.high.into()],
    ))
}

fn peak(term: &SearchTerm, key: Keyword, dataset_type: DatasetType) -> Result<SqlFragment> {
    let peak = peak_operands(term, key)?;
    let mut where_clause = format!("{}XRef.LRS BETWEEN ? AND ?", dataset_type.as_str());
    let mut params: Vec<SqlValue> = vec![peak.score.low.into(), peak.score.high.into()];
    if let Some(locus) = peak.locus {
        where_clause.push_str(" AND Geno.Chr = ? AND Geno.Mb BETWEEN ? AND ?");
        params.extend([
            locus.chromosome.into(),
            locus.mb.low.into(),
            locus.mb.high.into(),
        ]);
    }
    Ok(SqlFragment::predicate(where_clause, params))
}

fn rif(term: &SearchTerm) -> Result<SqlFragment> {
    let text = text_operand(term)?;
    Ok(SqlFragment::predicate(
        "MATCH (GeneRIF_BASIC.comment) AGAINST (? IN BOOLEAN MODE)",
        vec![format!("+{text}").into()],
    )
    .joined(RIF_JOIN))
}

fn wiki(term: &SearchTerm) -> Result<SqlFragment> {
    let text = text_operand(term)?;
    Ok(SqlFragment::predicate(
        "GeneRIF.comment LIKE ? AND GeneRIF.display > 0 AND GeneRIF.reason != 'obsolete'",
        vec![like_pattern(text).into()],
    )
    .joined(WIKI_JOIN))
}

fn author(term: &SearchTerm) -> Result<SqlFragment> {
    let text = text_operand(term)?;
    Ok(SqlFragment::predicate(
        "Publication.Authors LIKE ?",
        vec![like_pattern(text).into()],
    ))
}
