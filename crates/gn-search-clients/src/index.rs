use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{ClientError, HttpTransport, Result};

/// What the index service answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexPayload {
    /// Matching records, loosely typed.
    Rows(Vec<Value>),
    /// The service reported a failure (an object carrying an `error` key).
    Error(String),
}

/// Client for the full-text search index service.
#[derive(Debug, Clone)]
pub struct IndexClient {
    base_url: Url,
    transport: HttpTransport,
}

impl IndexClient {
    pub fn new(base_url: &str, transport: HttpTransport) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport,
        })
    }

    /// Builds `<base>/api/search?query=..&type=..&per_page=..`.
    pub fn search_url(&self, query: &str, search_type: &str, per_page: usize) -> Result<Url> {
        let mut url = self.base_url.join("/api/search")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("type", search_type)
            .append_pair("per_page", &per_page.to_string());
        Ok(url)
    }

    #[instrument(name = "Index Search", level = "info", skip(self))]
    pub fn search(&self, query: &str, search_type: &str, per_page: usize) -> Result<IndexPayload> {
        let url = self.search_url(query, search_type, per_page)?;
        let (status, body) = self.transport.get(&url)?;

        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Status {
                    status,
                    url: url.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        match value {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "Index returned rows");
                Ok(IndexPayload::Rows(rows))
            }
            Value::Object(mut object) if object.contains_key("error") => {
                let message = match object.remove("error") {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                warn!(%status, %message, "Index service reported an error");
                Ok(IndexPayload::Error(message))
            }
            _ if !status.is_success() => Err(ClientError::Status {
                status,
                url: url.to_string(),
            }),
            other => Ok(IndexPayload::Error(format!(
                "unexpected index payload: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::runtime::Runtime;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;

    fn start_server(rt: &Runtime, mocks: Vec<Mock>) -> MockServer {
        rt.block_on(async {
            let server = MockServer::start().await;
            for mock in mocks {
                mock.mount(&server).await;
            }
            server
        })
    }

    fn client(server: &MockServer) -> IndexClient {
        IndexClient::new(&server.uri(), HttpTransport::new().unwrap()).unwrap()
    }

    #[test]
    fn test_search_url_encodes_query() {
        let client = IndexClient::new(
            "http://gn3.example.org/some/prefix",
            HttpTransport::new().unwrap(),
        )
        .unwrap();
        let url = client
            .search_url("dataset:hc_m2_0606_p AND shh", "gene", 50000)
            .unwrap();
        assert_eq!(url.path(), "/api/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("query".into(), "dataset:hc_m2_0606_p AND shh".into()),
                ("type".into(), "gene".into()),
                ("per_page".into(), "50000".into()),
            ]
        );
    }

    #[test]
    fn test_search_returns_rows() {
        let rt = Runtime::new().unwrap();
        let server = start_server(
            &rt,
            vec![
                Mock::given(method("GET"))
                    .and(path("/api/search"))
                    .and(query_param("type", "genotype"))
                    .and(query_param("query", "dataset:bxdgeno AND rs3"))
                    .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                        {"name": "rs3", "chr": "1", "mb": 3.5}
                    ]))),
            ],
        );

        let payload = client(&server)
            .search("dataset:bxdgeno AND rs3", "genotype", 10)
            .unwrap();
        match payload {
            IndexPayload::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["name"], "rs3");
            }
            IndexPayload::Error(e) => panic!("unexpected error payload: {e}"),
        }
    }

    #[test]
    fn test_search_surfaces_error_object() {
        let rt = Runtime::new().unwrap();
        let server = start_server(
            &rt,
            vec![
                Mock::given(method("GET"))
                    .and(path("/api/search"))
                    .respond_with(
                        ResponseTemplate::new(400)
                            .set_body_json(json!({"error": "Query parse failure"})),
                    ),
            ],
        );

        let payload = client(&server).search("mean:(", "gene", 10).unwrap();
        assert_eq!(payload, IndexPayload::Error("Query parse failure".into()));
    }

    #[test]
    fn test_search_non_json_failure_is_status_error() {
        let rt = Runtime::new().unwrap();
        let server = start_server(
            &rt,
            vec![
                Mock::given(method("GET"))
                    .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway")),
            ],
        );

        let result = client(&server).search("shh", "gene", 10);
        assert!(matches!(result, Err(ClientError::Status { .. })));
    }
}
