use std::{env, fmt, str::FromStr, time::Duration};

use crate::{
    dataset::DatasetType,
    error::{GnSearchError, Result},
};

/// Placeholder replaced by the PubMed id in [`SearchConfig::pubmed_link_template`].
const PUBMED_ID_PLACEHOLDER: &str = "{id}";

/// Settings for one [`GeneSearcher`](crate::GeneSearcher).
#[derive(Clone)]
pub struct SearchConfig {
    /// Base URL of the full-text index service.
    pub index_url: String,
    /// Base URL the alias endpoint is served under.
    pub gn2_base_url: String,
    /// Base URL of the authorization proxy.
    pub auth_url: String,
    /// Try the index before SQL when the terms allow it.
    pub use_index: bool,
    pub index_per_page: usize,
    /// Above this many rows no records are shaped and `too_many_results` is set.
    pub max_results: usize,
    /// Ceiling for phenotype searches.
    pub max_phenotype_results: usize,
    /// Index-path descriptions are cut to this many characters.
    pub description_limit: usize,
    /// Applies to every call to an external service.
    pub request_timeout: Duration,
    /// Link template; `{id}` is replaced by the PubMed id.
    pub pubmed_link_template: String,
    pub hmac_secret: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_url: "http://localhost:8087/".to_string(),
            gn2_base_url: "http://localhost:5003/".to_string(),
            auth_url: "http://localhost:8080/".to_string(),
            use_index: true,
            index_per_page: 50_000,
            max_results: 100_000,
            max_phenotype_results: 50_000,
            description_limit: 200,
            request_timeout: Duration::from_secs(30),
            pubmed_link_template: "http://www.ncbi.nlm.nih.gov/entrez/query.fcgi?cmd=Retrieve&db=PubMed&list_uids={id}&dopt=Abstract"
                .to_string(),
            hmac_secret: String::new(),
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("index_url", &self.index_url)
            .field("gn2_base_url", &self.gn2_base_url)
            .field("auth_url", &self.auth_url)
            .field("use_index", &self.use_index)
            .field("index_per_page", &self.index_per_page)
            .field("max_results", &self.max_results)
            .field("max_phenotype_results", &self.max_phenotype_results)
            .field("description_limit", &self.description_limit)
            .field("request_timeout", &self.request_timeout)
            .field("pubmed_link_template", &self.pubmed_link_template)
            .field("hmac_secret", &"<redacted>")
            .finish()
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    /// Defaults overridden by `GN3_LOCAL_URL`, `GN2_BASE_URL`, `GN2_PROXY`,
    /// `SECRET_HMAC_CODE`, `GN_SEARCH_TIMEOUT_SECS`, `GN_SEARCH_MAX_RESULTS`
    /// and `GN_SEARCH_MAX_PHENOTYPE_RESULTS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = var("GN3_LOCAL_URL") {
            config.index_url = url;
        }
        if let Some(url) = var("GN2_BASE_URL") {
            config.gn2_base_url = url;
        }
        if let Some(url) = var("GN2_PROXY") {
            config.auth_url = url;
        }
        if let Some(secret) = var("SECRET_HMAC_CODE") {
            config.hmac_secret = secret;
        }
        if let Some(secs) = var("GN_SEARCH_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("GN_SEARCH_TIMEOUT_SECS", &secs)?);
        }
        if let Some(max) = var("GN_SEARCH_MAX_RESULTS") {
            config.max_results = parse_var("GN_SEARCH_MAX_RESULTS", &max)?;
        }
        if let Some(max) = var("GN_SEARCH_MAX_PHENOTYPE_RESULTS") {
            config.max_phenotype_results = parse_var("GN_SEARCH_MAX_PHENOTYPE_RESULTS", &max)?;
        }
        Ok(config)
    }

    /// Result ceiling for a dataset type.
    pub const fn max_results_for(&self, dataset_type: DatasetType) -> usize {
        match dataset_type {
            DatasetType::Publish => self.max_phenotype_results,
            _ => self.max_results,
        }
    }

    pub fn pubmed_link(&self, pubmed_id: &str) -> String {
        self.pubmed_link_template
            .replace(PUBMED_ID_PLACEHOLDER, pubmed_id)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| GnSearchError::ConfigError(format!("{name}={value}: {e}")))
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Never consult the index; every search compiles to SQL.
    pub fn sql_only() -> Self {
        let mut builder = Self::new();
        builder.config.use_index = false;
        builder
    }

    /// Prefer the index for eligible searches and fall back to SQL.
    pub fn index_first() -> Self {
        let mut builder = Self::new();
        builder.config.use_index = true;
        builder
    }

    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.config.index_url = url.into();
        self
    }

    pub fn gn2_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gn2_base_url = url.into();
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth_url = url.into();
        self
    }

    pub fn use_index(mut self, enabled: bool) -> Self {
        self.config.use_index = enabled;
        self
    }

    pub fn index_per_page(mut self, per_page: usize) -> Self {
        self.config.index_per_page = per_page.max(1);
        self
    }

    /// Set the result ceilings for non-phenotype and phenotype searches
    pub fn max_results(mut self, max: usize, max_phenotype: usize) -> Self {
        self.config.max_results = max;
        self.config.max_phenotype_results = max_phenotype;
        self
    }

    pub fn description_limit(mut self, limit: usize) -> Self {
        self.config.description_limit = limit;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn pubmed_link_template(mut self, template: impl Into<String>) -> Self {
        self.config.pubmed_link_template = template.into();
        self
    }

    pub fn hmac_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.hmac_secret = secret.into();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}
