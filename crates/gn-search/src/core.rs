//! The request-level search facade.
//!
//! [`GeneSearcher`] ties the stages together for one request: validate and
//! parse the search string, resolve the dataset, plan and run the query,
//! then shape and filter the rows. Every stage failure is logged and
//! reported as "no search results"; nothing escapes [`GeneSearcher::search`].
//!
//! ```rust
//! use gn_search::{
//!     GeneSearcher, SearchConfig, SearchRequest,
//!     test_data::{RecordingDatabase, StaticCatalog, StaticPermissions, genotype_row},
//! };
//!
//! let searcher = GeneSearcher::builder(SearchConfig::builder().hmac_secret("secret").build())
//!     .database(RecordingDatabase::new().with_rows(vec![genotype_row("rs3", "1", 3.5)]))
//!     .catalog(StaticCatalog::fixtures())
//!     .authorization(StaticPermissions::deny_all())
//!     .build()?;
//!
//! let request = SearchRequest::and("BXDGeno", "rs3").with_search_type("Genotypes");
//! let results = searcher.search(&request, "anonymous");
//! assert!(results.search_term_exists);
//! assert_eq!(results.trait_list[0].location, "Chr1: 3.500000");
//! # Ok::<(), gn_search::error::GnSearchError>(())
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    access::{AuthorizationService, PermissionFilter},
    compile::{Backend, QueryTemplate},
    config::SearchConfig,
    data_hmac::DataHmac,
    dataset::{Dataset, DatasetCatalog, DatasetType},
    db::Database,
    error::{GnSearchError, Result},
    expand::AliasService,
    index::IndexService,
    normalize::{ColumnWidths, Normalizer, RawRow, TraitRecord},
    search::{Collaborators, plan_and_run},
    terms::{self, LogicalOp},
};

/// The search form as the web layer receives it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub search_terms_and: Option<String>,
    #[serde(default)]
    pub search_terms_or: Option<String>,
    /// `Phenotypes`, `Genotypes`, or anything else for gene expression.
    #[serde(default, rename = "type")]
    pub search_type: Option<String>,
    pub dataset: String,
}

impl SearchRequest {
    pub fn and(dataset: impl Into<String>, terms: impl Into<String>) -> Self {
        Self {
            search_terms_and: Some(terms.into()),
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn or(dataset: impl Into<String>, terms: impl Into<String>) -> Self {
        Self {
            search_terms_or: Some(terms.into()),
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn with_search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    /// A non-empty OR string wins over the AND string. The chosen string
    /// comes back untrimmed so the denylist sees it as submitted.
    pub fn operator_and_terms(&self) -> (LogicalOp, &str) {
        fn non_empty(terms: &Option<String>) -> Option<&str> {
            terms.as_deref().filter(|s| !s.trim().is_empty())
        }
        match non_empty(&self.search_terms_or) {
            Some(terms) => (LogicalOp::Or, terms),
            None => (LogicalOp::And, non_empty(&self.search_terms_and).unwrap_or_default()),
        }
    }

    pub fn dataset_type(&self) -> DatasetType {
        DatasetType::from_search_type(self.search_type.as_deref())
    }
}

/// Everything the results page renders for one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultSet {
    pub original_search_string: String,
    pub and_or: LogicalOp,
    pub dataset: String,
    pub dataset_type: DatasetType,
    pub search_term_exists: bool,
    pub too_many_results: bool,
    pub wide_columns_exist: bool,
    /// Rows the back-end returned, before permission filtering.
    pub result_count: usize,
    pub trait_list: Vec<TraitRecord>,
    pub header_data_names: Vec<&'static str>,
    pub header_fields: Vec<&'static str>,
    pub max_widths: ColumnWidths,
    pub backend: Option<Backend>,
    pub go_term: Option<String>,
}

impl SearchResultSet {
    fn empty(request: &SearchRequest) -> Self {
        let (and_or, original) = request.operator_and_terms();
        let dataset_type = request.dataset_type();
        Self {
            original_search_string: original.trim().to_string(),
            and_or,
            dataset: request.dataset.clone(),
            dataset_type,
            search_term_exists: false,
            too_many_results: false,
            wide_columns_exist: false,
            result_count: 0,
            trait_list: Vec::new(),
            header_data_names: header_data_names(dataset_type).to_vec(),
            header_fields: QueryTemplate::for_dataset(dataset_type)
                .map(|t| t.header_fields().to_vec())
                .unwrap_or_default(),
            max_widths: ColumnWidths::default(),
            backend: None,
            go_term: None,
        }
    }
}

/// Record fields the results table shows, in column order.
pub const fn header_data_names(dataset_type: DatasetType) -> &'static [&'static str] {
    match dataset_type {
        DatasetType::ProbeSet => &[
            "index",
            "display_name",
            "symbol",
            "description",
            "location",
            "mean",
            "lod_score",
            "lrs_location",
            "additive",
        ],
        DatasetType::Publish => &[
            "index",
            "display_name",
            "description",
            "mean",
            "authors",
            "pubmed_text",
            "lod_score",
            "lrs_location",
            "additive",
        ],
        DatasetType::Geno => &["index", "display_name", "location"],
        DatasetType::Temp => &[],
    }
}

/// Search entry point holding the collaborators shared across requests.
pub struct GeneSearcher {
    config: SearchConfig,
    hmac: DataHmac,
    database: Box<dyn Database>,
    catalog: Box<dyn DatasetCatalog>,
    authorization: Box<dyn AuthorizationService>,
    index: Option<Box<dyn IndexService>>,
    aliases: Option<Box<dyn AliasService>>,
}

impl GeneSearcher {
    pub fn builder(config: SearchConfig) -> GeneSearcherBuilder {
        GeneSearcherBuilder::new(config)
    }

    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Tag signer for the `(trait, dataset)` pairs this searcher emits.
    pub const fn hmac(&self) -> &DataHmac {
        &self.hmac
    }

    /// Runs one search. Failures are logged and come back as
    /// `search_term_exists = false` with an empty trait list.
    #[instrument(name = "Gene Search", level = "info", skip_all, fields(dataset = %request.dataset))]
    pub fn search(&self, request: &SearchRequest, user_id: &str) -> SearchResultSet {
        match self.try_search(request, user_id) {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Search failed; reporting no results");
                SearchResultSet::empty(request)
            }
        }
    }

    /// Like [`search`](Self::search), but hands the failing stage's error back.
    pub fn try_search(&self, request: &SearchRequest, user_id: &str) -> Result<SearchResultSet> {
        let t_search = std::time::Instant::now();
        let mut results = SearchResultSet::empty(request);
        let (op, input) = request.operator_and_terms();

        if terms::is_suspicious(input) {
            warn!(input, "Rejected suspicious search string");
            return Ok(results);
        }
        let search_terms = terms::parse(input, op)?;
        let dataset = self
            .catalog
            .resolve(&request.dataset, request.dataset_type())?;

        let outcome = plan_and_run(
            self.collaborators(),
            &dataset,
            search_terms,
            op,
            self.config.use_index,
            self.config.index_per_page,
        )?;
        results.search_term_exists = true;
        results.backend = Some(outcome.backend);
        results.go_term = outcome.go_term;
        results.result_count = outcome.rows.len();

        let max_results = self.config.max_results_for(dataset.dataset_type);
        if outcome.rows.len() > max_results {
            info!(rows = outcome.rows.len(), max_results, "Too many results to display");
            results.too_many_results = true;
            return Ok(results);
        }

        results.trait_list = self.shape(&dataset, &outcome.rows, user_id)?;
        results.max_widths = ColumnWidths::measure(&results.trait_list);
        results.wide_columns_exist = results.max_widths.wide_columns_exist(dataset.dataset_type);

        info!(
            backend = ?outcome.backend,
            rows = results.result_count,
            shown = results.trait_list.len(),
            elapsed_seconds = ?t_search.elapsed(),
            "Search complete"
        );
        Ok(results)
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            database: self.database.as_ref(),
            index: self.index.as_deref(),
            aliases: self.aliases.as_deref(),
        }
    }

    fn shape(
        &self,
        dataset: &Dataset,
        rows: &[RawRow],
        user_id: &str,
    ) -> Result<Vec<TraitRecord>> {
        let mut normalizer = Normalizer::new(dataset, &self.hmac, &self.config);
        if dataset.dataset_type == DatasetType::Publish {
            normalizer = normalizer.with_permissions(PermissionFilter::new(
                self.authorization.as_ref(),
                dataset,
                user_id,
            ));
        }
        let mut records = Vec::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            if let Some(record) = normalizer.normalize(row, position + 1)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Collects the collaborators for a [`GeneSearcher`].
pub struct GeneSearcherBuilder {
    config: SearchConfig,
    database: Option<Box<dyn Database>>,
    catalog: Option<Box<dyn DatasetCatalog>>,
    authorization: Option<Box<dyn AuthorizationService>>,
    index: Option<Box<dyn IndexService>>,
    aliases: Option<Box<dyn AliasService>>,
}

impl GeneSearcherBuilder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            database: None,
            catalog: None,
            authorization: None,
            index: None,
            aliases: None,
        }
    }

    pub fn database(mut self, database: impl Database + 'static) -> Self {
        self.database = Some(Box::new(database));
        self
    }

    pub fn catalog(mut self, catalog: impl DatasetCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    pub fn authorization(mut self, authorization: impl AuthorizationService + 'static) -> Self {
        self.authorization = Some(Box::new(authorization));
        self
    }

    /// Without an index every search compiles to SQL.
    pub fn index(mut self, index: impl IndexService + 'static) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    /// Without an alias service keyless ProbeSet terms match literally.
    pub fn aliases(mut self, aliases: impl AliasService + 'static) -> Self {
        self.aliases = Some(Box::new(aliases));
        self
    }

    /// Wires the HTTP clients for the index, alias and authorization
    /// services at the URLs in the configuration.
    #[cfg(feature = "http")]
    pub fn with_http_services(self) -> Result<Self> {
        use gn_search_clients::{AliasClient, AuthClient, HttpTransport, IndexClient};

        let transport = HttpTransport::with_timeout(self.config.request_timeout)?;
        let index = IndexClient::new(&self.config.index_url, transport.clone())?;
        let aliases = AliasClient::new(&self.config.gn2_base_url, transport.clone())?;
        let authorization = AuthClient::new(&self.config.auth_url, transport)?;
        Ok(self.index(index).aliases(aliases).authorization(authorization))
    }

    pub fn build(self) -> Result<GeneSearcher> {
        let missing = |what: &str| GnSearchError::ConfigError(format!("GeneSearcher needs a {what}"));
        let hmac = DataHmac::new(self.config.hmac_secret.as_bytes())?;
        if self.config.hmac_secret.is_empty() {
            warn!("HMAC secret is empty; result tags are not tamper-evident");
        }
        Ok(GeneSearcher {
            database: self.database.ok_or_else(|| missing("database"))?,
            catalog: self.catalog.ok_or_else(|| missing("dataset catalog"))?,
            authorization: self
                .authorization
                .ok_or_else(|| missing("authorization service"))?,
            index: self.index,
            aliases: self.aliases,
            hmac,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::{
        RecordingDatabase, ScriptedIndex, StaticCatalog, StaticPermissions, genotype_row,
        phenotype_row,
    };

    fn searcher(database: RecordingDatabase, config: SearchConfig) -> GeneSearcher {
        GeneSearcher::builder(config)
            .database(database)
            .catalog(StaticCatalog::fixtures())
            .authorization(StaticPermissions::deny_all().with_trait("10001", ["view"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_request_operator_selection() {
        let request = SearchRequest {
            search_terms_and: Some("shh".into()),
            search_terms_or: Some("  ".into()),
            ..SearchRequest::default()
        };
        assert_eq!(request.operator_and_terms(), (LogicalOp::And, "shh"));
        let request = SearchRequest::or("BXDPublish", "LRS=20 30").with_search_type("Phenotypes");
        assert_eq!(request.operator_and_terms(), (LogicalOp::Or, "LRS=20 30"));
        assert_eq!(request.dataset_type(), DatasetType::Publish);
        assert_eq!(SearchRequest::default().dataset_type(), DatasetType::ProbeSet);

        let request = SearchRequest::and("HC_M2_0606_P", " select shh");
        assert_eq!(request.operator_and_terms(), (LogicalOp::And, " select shh"));
    }

    #[test]
    fn test_request_deserializes_form_fields() {
        let request: SearchRequest = serde_json::from_str(
            r#"{"search_terms_or": "shh", "type": "Genotypes", "dataset": "BXDGeno"}"#,
        )
        .unwrap();
        assert_eq!(request.dataset_type(), DatasetType::Geno);
        assert_eq!(request.search_terms_and, None);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = GeneSearcher::builder(SearchConfig::default())
            .catalog(StaticCatalog::fixtures())
            .build();
        assert!(matches!(result, Err(GnSearchError::ConfigError(msg)) if msg.contains("database")));
    }

    #[test]
    fn test_suspicious_input_never_reaches_the_database() {
        let searcher = searcher(RecordingDatabase::new(), SearchConfig::default());
        let request = SearchRequest::and("BXDGeno", "x <a href=evil> y").with_search_type("Genotypes");
        let results = searcher.search(&request, "user-1");
        assert!(!results.search_term_exists);
        assert_eq!(results.header_data_names, vec!["index", "display_name", "location"]);
    }

    #[test]
    fn test_leading_whitespace_does_not_hide_suspicious_input() {
        let searcher = searcher(RecordingDatabase::new(), SearchConfig::default());
        let results = searcher.search(&SearchRequest::and("HC_M2_0606_P", " select shh"), "user-1");
        assert!(!results.search_term_exists);
        assert_eq!(results.original_search_string, "select shh");
    }

    #[test]
    fn test_unknown_dataset_fails_soft() {
        let searcher = searcher(RecordingDatabase::new(), SearchConfig::default());
        let request = SearchRequest::and("NoSuchDataset", "shh");
        assert!(matches!(
            searcher.try_search(&request, "user-1"),
            Err(GnSearchError::DatasetError(_))
        ));
        let results = searcher.search(&request, "user-1");
        assert!(!results.search_term_exists);
        assert!(results.trait_list.is_empty());
    }

    #[test]
    fn test_too_many_results_skips_shaping() {
        let rows = (0..4).map(|i| genotype_row(&format!("rs{i}"), "1", 1.0)).collect();
        let config = SearchConfig::builder().max_results(3, 3).build();
        let searcher = searcher(RecordingDatabase::new().with_rows(rows), config);
        let results = searcher.search(
            &SearchRequest::and("BXDGeno", "rs").with_search_type("Genotypes"),
            "user-1",
        );
        assert!(results.search_term_exists);
        assert!(results.too_many_results);
        assert_eq!(results.result_count, 4);
        assert!(results.trait_list.is_empty());
    }

    #[test]
    fn test_phenotype_rows_are_permission_filtered() {
        let rows = vec![
            phenotype_row("10001", "Brain weight", "Chesler EJ"),
            phenotype_row("10002", "Body weight", "Chesler EJ"),
        ];
        let searcher = searcher(RecordingDatabase::new().with_rows(rows), SearchConfig::default());
        let results = searcher.search(
            &SearchRequest::and("BXDPublish", "weight").with_search_type("Phenotypes"),
            "user-1",
        );
        assert_eq!(results.result_count, 2);
        assert_eq!(results.trait_list.len(), 1);
        assert_eq!(results.trait_list[0].name, "10001");
        assert_eq!(results.backend, Some(Backend::Sql));
    }

    #[test]
    fn test_index_answer_is_used() {
        let searcher = GeneSearcher::builder(SearchConfig::default())
            .database(RecordingDatabase::new())
            .catalog(StaticCatalog::fixtures())
            .authorization(StaticPermissions::deny_all())
            .index(ScriptedIndex::rows(vec![serde_json::json!({
                "name": "rs3", "dataset": "BXDGeno", "chr": "1", "mb": 3.5
            })]))
            .build()
            .unwrap();
        let results = searcher.search(
            &SearchRequest::and("BXDGeno", "rs3").with_search_type("Genotypes"),
            "user-1",
        );
        assert_eq!(results.backend, Some(Backend::Index));
        assert_eq!(results.trait_list[0].display_name, "rs3");
        assert!(!results.wide_columns_exist);
    }
}
