use std::{fmt, sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};
use url::Url;

use crate::{ClientError, Result};

/// Upper bound on a single request to any of the services.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP transport shared by all service clients.
///
/// Owns the runtime that drives the async client. Cloning is cheap; clones
/// share the runtime and the connection pool. Must not be used from inside
/// another async runtime.
#[derive(Clone)]
pub struct HttpTransport {
    runtime: Arc<Runtime>,
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let runtime = Runtime::new()?;
        let client = {
            let _guard = runtime.enter();
            Client::builder().timeout(timeout).build()?
        };
        Ok(Self {
            runtime: Arc::new(runtime),
            client,
        })
    }

    /// Issues a GET and returns the status together with the raw body,
    /// whatever the status was.
    #[instrument(name = "HTTP GET", level = "debug", skip_all, fields(url = %url))]
    pub(crate) fn get(&self, url: &Url) -> Result<(StatusCode, Vec<u8>)> {
        self.runtime.block_on(async {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();
            debug!(%status, bytes = body.len(), "Response received");
            Ok((status, body))
        })
    }

    /// Issues a GET and decodes a successful JSON body.
    pub(crate) fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let (status, body) = self.get(url)?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

/// Appends path segments to a base URL, keeping any path it already has.
pub(crate) fn with_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
