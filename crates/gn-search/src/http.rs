//! Collaborator implementations backed by the HTTP clients.

use gn_search_clients::{AliasClient, AuthClient, IndexClient, IndexPayload};

use crate::{
    access::{AccessError, AuthorizationService},
    dataset::Dataset,
    expand::{AliasService, ExpandError},
    index::{IndexError, IndexQuery, IndexResponse, IndexService},
};

impl IndexService for IndexClient {
    fn search(&self, query: &IndexQuery) -> Result<IndexResponse, IndexError> {
        let payload = Self::search(self, &query.query, query.search_type, query.per_page)
            .map_err(|e| IndexError::Transport(anyhow::Error::new(e)))?;
        Ok(match payload {
            IndexPayload::Rows(rows) => IndexResponse::Rows(rows),
            IndexPayload::Error(message) => IndexResponse::Error(message),
        })
    }
}

impl AliasService for AliasClient {
    fn aliases(&self, symbol: &str) -> Result<Vec<String>, ExpandError> {
        Self::aliases(self, symbol).map_err(|e| ExpandError::AliasService(anyhow::Error::new(e)))
    }
}

impl AuthorizationService for AuthClient {
    fn trait_permissions(
        &self,
        dataset: &Dataset,
        user_id: &str,
        trait_name: &str,
    ) -> Result<Vec<String>, AccessError> {
        self.availability(&dataset.name, user_id, Some(trait_name))
            .map(|availability| availability.data)
            .map_err(|e| AccessError::Service(anyhow::Error::new(e)))
    }
}
