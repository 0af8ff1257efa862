use unicode_normalization::UnicodeNormalization;

use crate::compile::LOD_TO_LRS;

/// Placeholder for every absent value.
pub const NA: &str = "N/A";

pub fn fixed(value: Option<f64>, precision: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| NA.to_string(), |v| format!("{v:.precision$}"))
}

/// Like [`fixed`], but zero also reads as absent.
pub fn fixed_nonzero(value: Option<f64>, precision: usize) -> String {
    fixed(value.filter(|v| *v != 0.0), precision)
}

fn known_chromosome(chr: Option<&str>) -> Option<&str> {
    chr.map(str::trim)
        .filter(|c| !c.is_empty() && *c != "Un" && !c.eq_ignore_ascii_case("null"))
}

/// `Chr{chr}: {mb:.6}`, or N/A for an unknown chromosome or a zero position.
pub fn location(chr: Option<&str>, mb: Option<f64>) -> String {
    match (known_chromosome(chr), mb.filter(|m| m.is_finite() && *m != 0.0)) {
        (Some(chr), Some(mb)) => format!("Chr{chr}: {mb:.6}"),
        _ => NA.to_string(),
    }
}

/// Peak location; only requires both parts to be present.
pub fn peak_location(chr: Option<&str>, mb: Option<f64>) -> String {
    let chr = chr.map(str::trim).filter(|c| !c.is_empty());
    match (chr, mb.filter(|m| m.is_finite())) {
        (Some(chr), Some(mb)) => format!("Chr{chr}: {mb:.6}"),
        _ => NA.to_string(),
    }
}

/// Stored LRS rendered as LOD.
pub fn lod_score(lrs: Option<f64>) -> String {
    fixed(lrs.map(|lrs| lrs / LOD_TO_LRS), 1)
}

pub fn text_or_na(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NA.to_string())
}

/// Cuts to `limit` characters and appends `...` when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// More than two authors render as the first two plus `et al.`.
pub fn authors_display<S: AsRef<str>>(authors: &[S]) -> String {
    let names: Vec<&str> = authors.iter().map(AsRef::as_ref).collect();
    if names.len() > 2 {
        format!("{}, et al.", names[..2].join(", "))
    } else {
        names.join(", ")
    }
}

pub fn split_authors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn nfkd(text: &str) -> String {
    text.nfkd().collect()
}
