//! In-memory collaborators and fixtures.
//!
//! Each double records the calls it receives so tests can assert on what the
//! search core asked for, not only on what it returned.

use std::sync::Mutex;

use ahash::AHashMap;
use anyhow::anyhow;
use serde_json::Value;

use crate::{
    access::{AccessError, AuthorizationService},
    dataset::{Dataset, DatasetCatalog, DatasetError, DatasetType, Group},
    db::{Database, DatabaseError, SqlRow, SqlValue},
    expand::{AliasService, ExpandError, ONTOLOGY_QUERY},
    index::{IndexError, IndexQuery, IndexResponse, IndexService},
};

fn bxd() -> Group {
    Group {
        id: 1,
        name: "BXD".to_string(),
        species: "mouse".to_string(),
        species_id: 1,
        code: Some("BXD".to_string()),
    }
}

pub fn probeset_dataset() -> Dataset {
    let mut dataset = Dataset::new(DatasetType::ProbeSet, 112, "HC_M2_0606_P", bxd());
    dataset.fullname = "Hippocampus Consortium M430v2 (Jun06) PDNN".to_string();
    dataset
}

pub fn phenotype_dataset() -> Dataset {
    let mut dataset = Dataset::new(DatasetType::Publish, 602, "BXDPublish", bxd());
    dataset.fullname = "BXD Phenotypes".to_string();
    dataset
}

pub fn genotype_dataset() -> Dataset {
    Dataset::new(DatasetType::Geno, 1, "BXDGeno", bxd())
}

pub fn temp_dataset() -> Dataset {
    Dataset::new(DatasetType::Temp, 0, "Temp", bxd())
}

/// A full-width ProbeSet row as the SQL path selects it.
pub fn probeset_row(name: &str, symbol: &str, description: &str) -> SqlRow {
    SqlRow::new(vec![
        "HC_M2_0606_P".into(),
        "Hippocampus Consortium M430v2 (Jun06) PDNN".into(),
        name.into(),
        symbol.into(),
        SqlValue::Bytes(description.as_bytes().to_vec()),
        SqlValue::Bytes(b"exon 2".to_vec()),
        "5".into(),
        28.457.into(),
        9.1.into(),
        18.44.into(),
        "rs13478357".into(),
        0.001.into(),
        0.25.into(),
        "5".into(),
        27.0.into(),
    ])
}

/// A full-width phenotype row with a PubMed id, so the post-publication
/// description is the one shown.
pub fn phenotype_row(id: &str, post_description: &str, authors: &str) -> SqlRow {
    SqlRow::new(vec![
        id.into(),
        SqlValue::Bytes(b"Central nervous system, morphology".to_vec()),
        SqlValue::Bytes(post_description.as_bytes().to_vec()),
        authors.into(),
        "2005".into(),
        "15711545".into(),
        1.5.into(),
        12.3.into(),
        0.0.into(),
        SqlValue::Null,
        "BXD".into(),
        SqlValue::Null,
        SqlValue::Null,
    ])
}

pub fn genotype_row(name: &str, chr: &str, mb: f64) -> SqlRow {
    SqlRow::new(vec![
        name.into(),
        SqlValue::Null,
        name.into(),
        SqlValue::Null,
        chr.into(),
        mb.into(),
    ])
}

fn record<T>(calls: &Mutex<Vec<T>>, call: T) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(call);
    }
}

fn recorded<T: Clone>(calls: &Mutex<Vec<T>>) -> Vec<T> {
    calls.lock().map(|calls| calls.clone()).unwrap_or_default()
}

/// One statement a [`RecordingDatabase`] was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Answers ontology lookups from a table and every other query with fixed rows.
#[derive(Debug, Default)]
pub struct RecordingDatabase {
    ontology: AHashMap<String, String>,
    rows: Vec<SqlRow>,
    failing: bool,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// `goterm` is the full code, e.g. `GO:0008150`; `genes` is whitespace-separated.
    pub fn with_ontology(mut self, goterm: &str, genes: &str) -> Self {
        self.ontology.insert(goterm.to_string(), genes.to_string());
        self
    }

    pub fn with_rows(mut self, rows: Vec<SqlRow>) -> Self {
        self.rows = rows;
        self
    }

    /// Every query fails after being recorded.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        recorded(&self.queries)
    }
}

impl Database for RecordingDatabase {
    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DatabaseError> {
        record(
            &self.queries,
            RecordedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            },
        );
        if self.failing {
            return Err(DatabaseError::Connection("connection reset".to_string()));
        }
        if sql == ONTOLOGY_QUERY {
            let goterm = params.first().and_then(SqlValue::as_text);
            return Ok(goterm
                .and_then(|goterm| self.ontology.get(&*goterm))
                .map(|genes| vec![SqlRow::new(vec![genes.as_str().into()])])
                .unwrap_or_default());
        }
        Ok(self.rows.clone())
    }
}

#[derive(Debug, Clone)]
enum IndexScript {
    Rows(Vec<Value>),
    Error(String),
    Unreachable,
}

/// An index service that always gives the same answer.
#[derive(Debug)]
pub struct ScriptedIndex {
    script: IndexScript,
    queries: Mutex<Vec<IndexQuery>>,
}

impl ScriptedIndex {
    fn scripted(script: IndexScript) -> Self {
        Self {
            script,
            queries: Mutex::default(),
        }
    }

    pub fn rows(rows: Vec<Value>) -> Self {
        Self::scripted(IndexScript::Rows(rows))
    }

    pub fn empty() -> Self {
        Self::rows(Vec::new())
    }

    /// Answers with an `{"error": ...}` payload.
    pub fn error(message: &str) -> Self {
        Self::scripted(IndexScript::Error(message.to_string()))
    }

    /// Fails at the transport level.
    pub fn unreachable() -> Self {
        Self::scripted(IndexScript::Unreachable)
    }

    pub fn queries(&self) -> Vec<IndexQuery> {
        recorded(&self.queries)
    }
}

impl IndexService for ScriptedIndex {
    fn search(&self, query: &IndexQuery) -> Result<IndexResponse, IndexError> {
        record(&self.queries, query.clone());
        match &self.script {
            IndexScript::Rows(rows) => Ok(IndexResponse::Rows(rows.clone())),
            IndexScript::Error(message) => Ok(IndexResponse::Error(message.clone())),
            IndexScript::Unreachable => Err(IndexError::Transport(anyhow!("connection refused"))),
        }
    }
}

#[derive(Debug, Default)]
pub struct StaticAliases {
    aliases: AHashMap<String, Vec<String>>,
    failing: bool,
    lookups: Mutex<Vec<String>>,
}

impl StaticAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `symbol` must already carry the species capitalization.
    pub fn with<I, S>(mut self, symbol: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(symbol.to_string(), aliases.into_iter().map(Into::into).collect());
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        recorded(&self.lookups)
    }
}

impl AliasService for StaticAliases {
    fn aliases(&self, symbol: &str) -> Result<Vec<String>, ExpandError> {
        record(&self.lookups, symbol.to_string());
        if self.failing {
            return Err(ExpandError::AliasService(anyhow!("alias service timed out")));
        }
        Ok(self.aliases.get(symbol).cloned().unwrap_or_default())
    }
}

/// Per-trait permission table; traits not listed get no permissions.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    traits: AHashMap<String, Vec<String>>,
    failing: bool,
    lookups: Mutex<Vec<String>>,
}

impl StaticPermissions {
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_trait<I, S>(mut self, trait_name: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits.insert(
            trait_name.to_string(),
            permissions.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Trait names looked up, in call order.
    pub fn lookups(&self) -> Vec<String> {
        recorded(&self.lookups)
    }
}

impl AuthorizationService for StaticPermissions {
    fn trait_permissions(
        &self,
        _dataset: &Dataset,
        _user_id: &str,
        trait_name: &str,
    ) -> Result<Vec<String>, AccessError> {
        record(&self.lookups, trait_name.to_string());
        if self.failing {
            return Err(AccessError::Service(anyhow!("authorization proxy unavailable")));
        }
        Ok(self.traits.get(trait_name).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    datasets: Vec<Dataset>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four fixture datasets of this module.
    pub fn fixtures() -> Self {
        Self::new()
            .with(probeset_dataset())
            .with(phenotype_dataset())
            .with(genotype_dataset())
            .with(temp_dataset())
    }

    pub fn with(mut self, dataset: Dataset) -> Self {
        self.datasets.push(dataset);
        self
    }
}

impl DatasetCatalog for StaticCatalog {
    fn resolve(&self, name: &str, dataset_type: DatasetType) -> Result<Dataset, DatasetError> {
        self.datasets
            .iter()
            .find(|d| d.name == name && d.dataset_type == dataset_type)
            .cloned()
            .ok_or_else(|| DatasetError::NotFound {
                name: name.to_string(),
                dataset_type,
            })
    }
}
