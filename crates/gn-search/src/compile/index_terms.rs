use super::{
    CompileError, Result, mean_operands, peak_operands, position_operands, text_operand,
};
use crate::{
    dataset::Dataset,
    index::IndexQuery,
    terms::{Keyword, LogicalOp, SearchTerm},
};

/// Megabase → base pair.
const BP_PER_MB: f64 = 1_000_000.0;

fn base_pairs(mb: f64) -> i64 {
    (mb * BP_PER_MB).round() as i64
}

/// Compiles one term into an index expression scoped to `dataset`.
pub fn index_fragment(term: &SearchTerm, dataset: &Dataset) -> Result<String> {
    let body = match term.key {
        None => text_operand(term)?.to_string(),
        Some(Keyword::Mean) => {
            let range = mean_operands(term)?;
            format!("mean:{}..{}", range.low, range.high)
        }
        Some(Keyword::Position) => {
            let locus = position_operands(term)?;
            format!(
                "chr:{} AND position:{}..{}",
                locus.chromosome.to_lowercase(),
                base_pairs(locus.mb.low),
                base_pairs(locus.mb.high)
            )
        }
        Some(key @ (Keyword::Lrs | Keyword::Lod)) => {
            let peak = peak_operands(term, key)?;
            let mut body = format!("peak:{}..{}", peak.score.low, peak.score.high);
            if let Some(locus) = peak.locus {
                body.push_str(&format!(
                    " AND peakchr:{} AND peakmb:{}..{}",
                    locus.chromosome.to_lowercase(),
                    locus.mb.low,
                    locus.mb.high
                ));
            }
            body
        }
        Some(key @ (Keyword::Author | Keyword::Rif | Keyword::Wiki)) => {
            format!("{}:{}", key.as_str().to_lowercase(), text_operand(term)?)
        }
        Some(Keyword::Go) => {
            return Err(CompileError::UnsupportedKeyword {
                key: term.key,
                dataset_type: dataset.dataset_type,
            });
        }
    };
    Ok(format!("dataset:{} AND {body}", dataset.name.to_lowercase()))
}

/// Joins every term's fragment into one index request for `dataset`.
pub fn index_query(
    dataset: &Dataset,
    terms: &[SearchTerm],
    op: LogicalOp,
    per_page: usize,
) -> Result<IndexQuery> {
    let search_type = dataset
        .dataset_type
        .index_type()
        .ok_or(CompileError::UnsupportedKeyword {
            key: None,
            dataset_type: dataset.dataset_type,
        })?;
    let query = terms
        .iter()
        .map(|term| index_fragment(term, dataset))
        .collect::<Result<Vec<_>>>()?
        .join(&format!(" {op} "));
    Ok(IndexQuery {
        query,
        search_type,
        per_page,
    })
}
