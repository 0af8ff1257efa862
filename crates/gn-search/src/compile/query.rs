use itertools::Itertools;

use super::{CompileError, Result, SqlFragment};
use crate::{
    dataset::{Dataset, DatasetType},
    db::SqlValue,
    terms::LogicalOp,
};

const PROBESET_SELECT: &str = concat!(
    "SELECT DISTINCT ProbeSetFreeze.Name, ProbeSetFreeze.FullName, ProbeSet.Name, ProbeSet.Symbol, ",
    "CAST(ProbeSet.description AS BINARY), CAST(ProbeSet.Probe_Target_Description AS BINARY), ",
    "ProbeSet.Chr, ProbeSet.Mb, ProbeSetXRef.Mean, ProbeSetXRef.LRS, ProbeSetXRef.Locus, ",
    "ProbeSetXRef.pValue, ProbeSetXRef.additive, Geno.Chr AS geno_chr, Geno.Mb AS geno_mb ",
    "FROM Species ",
    "INNER JOIN InbredSet ON InbredSet.SpeciesId = Species.Id ",
    "INNER JOIN ProbeFreeze ON ProbeFreeze.InbredSetId = InbredSet.Id ",
    "INNER JOIN Tissue ON ProbeFreeze.TissueId = Tissue.Id ",
    "INNER JOIN ProbeSetFreeze ON ProbeSetFreeze.ProbeFreezeId = ProbeFreeze.Id ",
    "INNER JOIN ProbeSetXRef ON ProbeSetXRef.ProbeSetFreezeId = ProbeSetFreeze.Id ",
    "INNER JOIN ProbeSet ON ProbeSet.Id = ProbeSetXRef.ProbeSetId ",
    "LEFT JOIN Geno ON ProbeSetXRef.Locus = Geno.Name AND Geno.SpeciesId = Species.Id",
);

const PHENOTYPE_SELECT: &str = concat!(
    "SELECT DISTINCT PublishXRef.Id, ",
    "CAST(Phenotype.Pre_publication_description AS BINARY), ",
    "CAST(Phenotype.Post_publication_description AS BINARY), ",
    "Publication.Authors, Publication.Year, Publication.PubMed_ID, ",
    "PublishXRef.mean, PublishXRef.LRS, PublishXRef.additive, PublishXRef.Locus, ",
    "InbredSet.InbredSetCode, Geno.Chr, Geno.Mb ",
    "FROM Species ",
    "INNER JOIN InbredSet ON InbredSet.SpeciesId = Species.Id ",
    "INNER JOIN PublishXRef ON PublishXRef.InbredSetId = InbredSet.Id ",
    "INNER JOIN PublishFreeze ON PublishFreeze.InbredSetId = InbredSet.Id ",
    "INNER JOIN Publication ON Publication.Id = PublishXRef.PublicationId ",
    "INNER JOIN Phenotype ON Phenotype.Id = PublishXRef.PhenotypeId ",
    "LEFT JOIN Geno ON PublishXRef.Locus = Geno.Name AND Geno.SpeciesId = Species.Id",
);

const GENOTYPE_SELECT: &str = concat!(
    "SELECT Geno.Name, GenoFreeze.createtime AS thistable, Geno.Name AS Geno_Name, ",
    "Geno.Source2 AS Geno_Source2, Geno.Chr AS Geno_Chr, Geno.Mb AS Geno_Mb ",
    "FROM GenoXRef ",
    "INNER JOIN GenoFreeze ON GenoFreeze.Id = GenoXRef.GenoFreezeId ",
    "INNER JOIN Geno ON Geno.Id = GenoXRef.GenoId",
);

/// Positions of the columns each base query selects.
pub(crate) mod columns {
    pub mod probeset {
        pub const NAME: usize = 2;
        pub const SYMBOL: usize = 3;
        pub const DESCRIPTION: usize = 4;
        pub const TARGET_DESCRIPTION: usize = 5;
        pub const CHR: usize = 6;
        pub const MB: usize = 7;
        pub const MEAN: usize = 8;
        pub const LRS: usize = 9;
        pub const ADDITIVE: usize = 12;
        pub const GENO_CHR: usize = 13;
        pub const GENO_MB: usize = 14;
        pub const WIDTH: usize = 15;
    }

    pub mod phenotype {
        pub const ID: usize = 0;
        pub const PRE_DESCRIPTION: usize = 1;
        pub const POST_DESCRIPTION: usize = 2;
        pub const AUTHORS: usize = 3;
        pub const YEAR: usize = 4;
        pub const PUBMED_ID: usize = 5;
        pub const MEAN: usize = 6;
        pub const LRS: usize = 7;
        pub const ADDITIVE: usize = 8;
        pub const CODE: usize = 10;
        pub const GENO_CHR: usize = 11;
        pub const GENO_MB: usize = 12;
        pub const WIDTH: usize = 13;
    }

    pub mod genotype {
        pub const NAME: usize = 0;
        pub const CHR: usize = 4;
        pub const MB: usize = 5;
        pub const WIDTH: usize = 6;
    }
}

/// Base query a dataset type's SQL search is assembled onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTemplate {
    ProbeSet,
    Phenotype,
    Genotype,
}

impl QueryTemplate {
    pub fn for_dataset(dataset_type: DatasetType) -> Result<Self> {
        match dataset_type {
            DatasetType::ProbeSet => Ok(Self::ProbeSet),
            DatasetType::Publish => Ok(Self::Phenotype),
            DatasetType::Geno => Ok(Self::Genotype),
            DatasetType::Temp => Err(CompileError::UnsupportedKeyword {
                key: None,
                dataset_type,
            }),
        }
    }

    const fn select(self) -> &'static str {
        match self {
            Self::ProbeSet => PROBESET_SELECT,
            Self::Phenotype => PHENOTYPE_SELECT,
            Self::Genotype => GENOTYPE_SELECT,
        }
    }

    fn scope(self, dataset: &Dataset) -> (&'static str, Vec<SqlValue>) {
        match self {
            Self::ProbeSet => (
                "ProbeSetXRef.ProbeSetFreezeId = ?",
                vec![dataset.id.into()],
            ),
            Self::Phenotype => (
                "PublishXRef.InbredSetId = ? AND PublishFreeze.Id = ?",
                vec![dataset.group.id.into(), dataset.id.into()],
            ),
            Self::Genotype => ("GenoFreeze.Id = ?", vec![dataset.id.into()]),
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::ProbeSet => "ORDER BY ProbeSet.symbol ASC",
            Self::Phenotype => "ORDER BY PublishXRef.Id",
            Self::Genotype => "ORDER BY Geno.chr_num, Geno.Mb",
        }
    }

    /// Column labels the display layer shows for this query's rows.
    pub const fn header_fields(self) -> &'static [&'static str] {
        match self {
            Self::ProbeSet => &[
                "Index",
                "Record",
                "Symbol",
                "Description",
                "Location",
                "Mean",
                "Max LRS",
                "Max LRS Location",
                "Additive Effect",
            ],
            Self::Phenotype => &[
                "Index",
                "Record",
                "Description",
                "Authors",
                "Year",
                "Max LRS",
                "Max LRS Location",
                "Additive Effect",
            ],
            Self::Genotype => &["Index", "ID", "Location"],
        }
    }
}

/// A complete statement ready for [`Database::fetch_all`](crate::db::Database::fetch_all).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl CompiledSql {
    /// The statement with every placeholder replaced by its literal. For logs only.
    pub fn render_inline(&self) -> String {
        let mut params = self.params.iter();
        let mut rendered = String::with_capacity(self.sql.len());
        for (i, piece) in self.sql.split('?').enumerate() {
            if i > 0 {
                match params.next() {
                    Some(value) => rendered.push_str(&value.to_sql_literal()),
                    None => rendered.push('?'),
                }
            }
            rendered.push_str(piece);
        }
        rendered
    }
}

/// Collects per-term fragments into one statement.
///
/// FROM fragments are kept once each, compared by exact text. Each call to
/// [`push_group`](Self::push_group) becomes one parenthesized WHERE group.
#[derive(Debug, Clone, Default)]
pub struct SqlQueryBuilder {
    from_clauses: Vec<String>,
    groups: Vec<String>,
    params: Vec<SqlValue>,
}

impl SqlQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the same fragment text is already present.
    pub fn add_from(&mut self, clause: &str) -> bool {
        if self.from_clauses.iter().any(|c| c == clause) {
            false
        } else {
            self.from_clauses.push(clause.to_string());
            true
        }
    }

    /// Adds one WHERE group; its fragments are OR-ed together.
    pub fn push_group(&mut self, fragments: Vec<SqlFragment>) {
        if fragments.is_empty() {
            return;
        }
        let mut predicates = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            if let Some(from) = &fragment.from_clause {
                self.add_from(from);
            }
            predicates.push(fragment.where_clause);
            self.params.extend(fragment.params);
        }
        self.groups.push(format!("({})", predicates.join(" OR ")));
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn from_clauses(&self) -> &[String] {
        &self.from_clauses
    }

    /// `(<group> OP <group> ...)`
    pub fn where_clause(&self, op: LogicalOp) -> String {
        format!("({})", self.groups.iter().join(&format!(" {op} ")))
    }

    /// Assembles the final statement, or `None` when no group was added.
    pub fn finish(self, template: QueryTemplate, dataset: &Dataset, op: LogicalOp) -> Option<CompiledSql> {
        if self.is_empty() {
            return None;
        }
        let where_clause = self.where_clause(op);
        let (scope, scope_params) = template.scope(dataset);

        let mut sql = String::from(template.select());
        for from in &self.from_clauses {
            sql.push(' ');
            sql.push_str(from);
        }
        sql.push_str(&format!(
            " WHERE {where_clause} AND {scope} {}",
            template.order_by()
        ));

        let mut params = self.params;
        params.extend(scope_params);
        Some(CompiledSql { sql, params })
    }
}
