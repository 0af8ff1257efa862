//! Shaping raw rows into display-ready trait records.
//!
//! SQL rows and index rows arrive in different shapes; both are mapped
//! explicitly into the one [`TraitRecord`] type so that a trait renders
//! the same whichever back-end found it. The only intentional difference is
//! that index descriptions are truncated and SQL descriptions are not.

use serde::Serialize;
use tracing::debug;

use crate::{
    access::PermissionFilter,
    config::SearchConfig,
    data_hmac::DataHmac,
    dataset::{Dataset, DatasetType},
    db::SqlRow,
    index::IndexRow,
};

mod format;

pub use error::NormalizeError;
use error::Result;
pub use format::NA;
use format::{
    authors_display, fixed, fixed_nonzero, lod_score, location, nfkd, peak_location,
    split_authors, text_or_na, truncate,
};

/// Symbol width cap used for display and the info string.
const SYMBOL_DISPLAY_CHARS: usize = 20;

/// A raw result row from either back-end.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Sql(SqlRow),
    Index(IndexRow),
}

/// One display-ready result. Every numeric-looking field is pre-formatted text or `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitRecord {
    /// 1-based arrival position.
    pub index: usize,
    pub name: String,
    pub display_name: String,
    pub dataset: String,
    pub hmac: String,
    pub description: String,
    pub location: String,
    pub mean: String,
    pub lod_score: String,
    pub lrs_location: String,
    pub additive: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubmed_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubmed_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubmed_link: Option<String>,
    pub trait_info_str: String,
}

impl TraitRecord {
    fn new(index: usize, name: String, dataset: String, hmac: String) -> Self {
        Self {
            index,
            display_name: name.clone(),
            name,
            dataset,
            hmac,
            description: NA.to_string(),
            location: NA.to_string(),
            mean: NA.to_string(),
            lod_score: NA.to_string(),
            lrs_location: NA.to_string(),
            additive: NA.to_string(),
            symbol: None,
            authors: None,
            authors_display: None,
            pubmed_id: None,
            pubmed_text: None,
            pubmed_link: None,
            trait_info_str: String::new(),
        }
    }

    /// Shape used for dataset types that have no display rules.
    pub fn empty(index: usize, dataset: &str) -> Self {
        Self::new(index, String::new(), dataset.to_string(), String::new())
    }
}

/// Converts rows for one dataset into trait records.
pub struct Normalizer<'a> {
    dataset: &'a Dataset,
    hmac: &'a DataHmac,
    config: &'a SearchConfig,
    permissions: Option<PermissionFilter<'a>>,
}

impl<'a> Normalizer<'a> {
    pub const fn new(dataset: &'a Dataset, hmac: &'a DataHmac, config: &'a SearchConfig) -> Self {
        Self {
            dataset,
            hmac,
            config,
            permissions: None,
        }
    }

    /// Phenotype rows are checked against `filter` before they are shaped.
    pub fn with_permissions(mut self, filter: PermissionFilter<'a>) -> Self {
        self.permissions = Some(filter);
        self
    }

    /// Shapes one row; `Ok(None)` means the row is hidden from this user.
    pub fn normalize(&self, row: &RawRow, index: usize) -> Result<Option<TraitRecord>> {
        let dataset_type = self.dataset.dataset_type;
        let record = match (dataset_type, row) {
            (DatasetType::Temp, _) => Some(TraitRecord::empty(index, &self.dataset.name)),
            (DatasetType::ProbeSet, RawRow::Sql(row)) => Some(self.probeset_from_sql(row, index)?),
            (DatasetType::Publish, RawRow::Sql(row)) => self.phenotype_from_sql(row, index)?,
            (DatasetType::Geno, RawRow::Sql(row)) => Some(self.genotype_from_sql(row, index)?),
            (_, RawRow::Index(row)) => self.index_record(row, index)?,
        };
        Ok(record.map(|mut record| {
            if dataset_type != DatasetType::Temp {
                record.trait_info_str = trait_info_str(&record, dataset_type);
            }
            record
        }))
    }

    fn base(&self, index: usize, name: String, dataset: String) -> TraitRecord {
        let hmac = self.hmac.tag(&name, &dataset);
        TraitRecord::new(index, name, dataset, hmac)
    }

    fn visible(&self, trait_name: &str) -> bool {
        let visible = self
            .permissions
            .as_ref()
            .is_none_or(|filter| filter.allows(trait_name));
        if !visible {
            debug!(trait_name, "Row hidden by permissions");
        }
        visible
    }

    fn pubmed(&self, record: &mut TraitRecord, pubmed_id: Option<String>, year: Option<String>) {
        let pubmed_id = pubmed_id.filter(|id| !id.eq_ignore_ascii_case("null"));
        record.pubmed_link = Some(pubmed_id.as_deref().map_or_else(
            || NA.to_string(),
            |id| self.config.pubmed_link(id),
        ));
        record.pubmed_id = Some(text_or_na(pubmed_id));
        record.pubmed_text = Some(
            year.filter(|y| !y.is_empty() && y.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or_else(|| NA.to_string()),
        );
    }

    fn authors(record: &mut TraitRecord, authors: &[String]) {
        record.authors = Some(authors.join(", "));
        record.authors_display = Some(authors_display(authors));
    }

    fn display_name(name: &str, code: Option<&str>) -> String {
        match code.map(str::trim) {
            Some(code) if code.chars().count() == 3 => format!("{code}_{name}"),
            _ => name.to_string(),
        }
    }

    fn probeset_from_sql(&self, row: &SqlRow, index: usize) -> Result<TraitRecord> {
        use crate::compile::columns::probeset as col;

        check_width(row, col::WIDTH)?;
        let name = row.text(col::NAME).ok_or(NormalizeError::MissingField("ProbeSet.Name"))?;
        let mut record = self.base(index, name, self.dataset.name.clone());

        record.symbol = Some(text_or_na(row.text(col::SYMBOL)));
        let description = nfkd(&row.text(col::DESCRIPTION).unwrap_or_default());
        record.description = match row.text(col::TARGET_DESCRIPTION) {
            Some(target) => text_or_na(Some(format!("{description}; {target}"))),
            None => text_or_na(Some(description)),
        };
        record.location = location(row.text(col::CHR).as_deref(), row.float(col::MB));
        record.mean = fixed(row.float(col::MEAN), 3);
        record.additive = fixed(row.float(col::ADDITIVE), 3);
        record.lod_score = lod_score(row.float(col::LRS));
        record.lrs_location = peak_location(row.text(col::GENO_CHR).as_deref(), row.float(col::GENO_MB));
        Ok(record)
    }

    fn phenotype_from_sql(&self, row: &SqlRow, index: usize) -> Result<Option<TraitRecord>> {
        use crate::compile::columns::phenotype as col;

        check_width(row, col::WIDTH)?;
        let name = row.text(col::ID).ok_or(NormalizeError::MissingField("PublishXRef.Id"))?;
        if !self.visible(&name) {
            return Ok(None);
        }
        let mut record = self.base(index, name, self.dataset.name.clone());
        record.display_name = Self::display_name(&record.name, row.text(col::CODE).as_deref());

        let pubmed_id = row.text(col::PUBMED_ID);
        let description = if pubmed_id.as_deref().is_some_and(|id| !id.eq_ignore_ascii_case("null")) {
            row.text(col::POST_DESCRIPTION)
        } else {
            row.text(col::PRE_DESCRIPTION)
        };
        record.description = text_or_na(description);
        self.pubmed(&mut record, pubmed_id, row.text(col::YEAR));
        Self::authors(&mut record, &split_authors(&row.text(col::AUTHORS).unwrap_or_default()));

        record.mean = fixed(row.float(col::MEAN), 3);
        record.additive = fixed_nonzero(row.float(col::ADDITIVE), 3);
        record.lod_score = lod_score(row.float(col::LRS));
        record.lrs_location = peak_location(row.text(col::GENO_CHR).as_deref(), row.float(col::GENO_MB));
        Ok(Some(record))
    }

    fn genotype_from_sql(&self, row: &SqlRow, index: usize) -> Result<TraitRecord> {
        use crate::compile::columns::genotype as col;

        check_width(row, col::WIDTH)?;
        let name = row.text(col::NAME).ok_or(NormalizeError::MissingField("Geno.Name"))?;
        let mut record = self.base(index, name, self.dataset.name.clone());
        record.location = location(row.text(col::CHR).as_deref(), row.float(col::MB));
        Ok(record)
    }

    fn index_record(&self, row: &IndexRow, index: usize) -> Result<Option<TraitRecord>> {
        let dataset_type = self.dataset.dataset_type;
        let name = row
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(NormalizeError::MissingField("name"))?
            .to_string();
        if dataset_type == DatasetType::Publish && !self.visible(&name) {
            return Ok(None);
        }
        let dataset = row
            .dataset
            .clone()
            .unwrap_or_else(|| self.dataset.name.clone());
        let mut record = self.base(index, name, dataset);
        record.location = location(row.chr.as_deref(), row.mb);
        if dataset_type == DatasetType::Geno {
            return Ok(Some(record));
        }

        record.description = truncate(
            &text_or_na(row.description.clone()),
            self.config.description_limit,
        );
        record.mean = fixed(row.mean, 3);
        record.lod_score = lod_score(row.lrs);
        record.lrs_location = peak_location(row.geno_chr.as_deref(), row.geno_mb);
        match dataset_type {
            DatasetType::ProbeSet => {
                record.additive = fixed(row.additive, 3);
                record.symbol = Some(text_or_na(row.symbol.clone()));
            }
            DatasetType::Publish => {
                record.additive = fixed_nonzero(row.additive, 3);
                record.display_name = Self::display_name(&record.name, row.inbredsetcode.as_deref());
                self.pubmed(&mut record, row.pubmed_id.clone(), row.year.clone());
                Self::authors(&mut record, &row.authors);
            }
            DatasetType::Geno | DatasetType::Temp => {}
        }
        Ok(Some(record))
    }
}

fn check_width(row: &SqlRow, expected: usize) -> Result<()> {
    if row.len() < expected {
        return Err(NormalizeError::ShortRow {
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

/// `display|||dataset|||description|||symbol|||location|||mean|||lrs|||lrs_location`
pub fn trait_info_str(record: &TraitRecord, dataset_type: DatasetType) -> String {
    let description = match dataset_type {
        DatasetType::Geno => format!("Marker: {}", record.display_name),
        _ => record.description.clone(),
    };
    let symbol = match dataset_type {
        DatasetType::ProbeSet => record
            .symbol
            .as_deref()
            .unwrap_or(NA)
            .chars()
            .take(SYMBOL_DISPLAY_CHARS)
            .collect(),
        _ => "None".to_string(),
    };
    let location = match dataset_type {
        DatasetType::Publish => "None",
        _ => record.location.as_str(),
    };
    let (mean, lrs) = match dataset_type {
        DatasetType::Geno => ("0".to_string(), "0".to_string()),
        _ => {
            let lrs = match record.lod_score.parse::<f64>() {
                Ok(score) if score > 0.0 => format!("{score:.3}"),
                _ => record.lod_score.clone(),
            };
            (record.mean.clone(), lrs)
        }
    };
    format!(
        "{}|||{}|||{}|||{}|||{}|||{}|||{}|||{}",
        record.display_name, record.dataset, description, symbol, location, mean, lrs, record.lrs_location
    )
}

/// Widest value per display column over a result page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnWidths {
    pub display_name: usize,
    pub symbol: usize,
    pub description: usize,
    pub authors: usize,
}

impl ColumnWidths {
    pub fn measure(records: &[TraitRecord]) -> Self {
        records.iter().fold(Self::default(), |widths, record| {
            let authors = record.authors.as_deref().map_or(0, |authors| {
                let first_two: Vec<&str> = authors.split(',').take(2).collect();
                format!("{}, et al.", first_two.join(",")).chars().count()
            });
            let symbol = record
                .symbol
                .as_deref()
                .map_or(0, |s| s.chars().count().min(SYMBOL_DISPLAY_CHARS));
            Self {
                display_name: widths.display_name.max(record.display_name.chars().count()),
                symbol: widths.symbol.max(symbol),
                description: widths.description.max(record.description.chars().count()),
                authors: widths.authors.max(authors),
            }
        })
    }

    /// Whether the page needs the wide table layout.
    pub const fn wide_columns_exist(&self, dataset_type: DatasetType) -> bool {
        match dataset_type {
            DatasetType::Publish => {
                self.display_name > 25 || self.description > 100 || self.authors > 80
            }
            DatasetType::ProbeSet => {
                self.display_name > 25 || self.symbol > 25 || self.description > 100
            }
            DatasetType::Geno | DatasetType::Temp => false,
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum NormalizeError {
        #[error("Row has no {0}")]
        MissingField(&'static str),
        #[error("Row has {found} columns, expected at least {expected}")]
        ShortRow { expected: usize, found: usize },
    }

    pub type Result<T> = std::result::Result<T, NormalizeError>;
}
