use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::{HttpTransport, Result};

/// Permission levels a user holds on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceAvailability {
    #[serde(default)]
    pub data: Vec<String>,
}

/// Client for the authorization proxy's `available` endpoint.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: Url,
    transport: HttpTransport,
}

impl AuthClient {
    pub fn new(base_url: &str, transport: HttpTransport) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport,
        })
    }

    pub fn availability_url(
        &self,
        dataset: &str,
        user_id: &str,
        trait_name: Option<&str>,
    ) -> Result<Url> {
        let mut url = self.base_url.join("available")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("dataset", dataset);
            if let Some(trait_name) = trait_name {
                pairs.append_pair("trait", trait_name);
            }
            pairs.append_pair("user", user_id);
        }
        Ok(url)
    }

    #[instrument(name = "Resource Availability", level = "debug", skip(self))]
    pub fn availability(
        &self,
        dataset: &str,
        user_id: &str,
        trait_name: Option<&str>,
    ) -> Result<ResourceAvailability> {
        let url = self.availability_url(dataset, user_id, trait_name)?;
        self.transport.get_json(&url)
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

    #[test]
    fn test_availability_url_for_dataset_only() {
        let client = AuthClient::new(
            "http://proxy.example.org/gn2/",
            HttpTransport::new().unwrap(),
        )
        .unwrap();
        let url = client.availability_url("BXDPublish", "u-1", None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://proxy.example.org/gn2/available?dataset=BXDPublish&user=u-1"
        );
    }

    #[test]
    fn test_availability_for_trait() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/available"))
                .and(query_param("dataset", "BXDPublish"))
                .and(query_param("trait", "10001"))
                .and(query_param("user", "u-1"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"data": ["view", "edit"]})),
                )
                .mount(&server)
                .await;
            server
        });

        let client = AuthClient::new(&server.uri(), HttpTransport::new().unwrap()).unwrap();
        let availability = client
            .availability("BXDPublish", "u-1", Some("10001"))
            .unwrap();
        assert_eq!(availability.data, vec!["view", "edit"]);
    }

    #[test]
    fn test_missing_data_key_means_no_access() {
        let parsed: ResourceAvailability = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.data.is_empty());
    }
}
