use tracing::instrument;
use url::Url;

use crate::{HttpTransport, Result, transport::with_segments};

/// Client for the gene alias endpoint served under the GN2 base URL.
#[derive(Debug, Clone)]
pub struct AliasClient {
    base_url: Url,
    transport: HttpTransport,
}

impl AliasClient {
    pub fn new(base_url: &str, transport: HttpTransport) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport,
        })
    }

    /// Fetches the alias list for an already-capitalized gene symbol.
    #[instrument(name = "Gene Aliases", level = "debug", skip(self))]
    pub fn aliases(&self, symbol: &str) -> Result<Vec<String>> {
        let url = with_segments(&self.base_url, ["gn3", "gene", "aliases", symbol])?;
        self.transport.get_json(&url)
    }
}
