//! Per-trait access control for phenotype rows.

use std::sync::Arc;

use tracing::warn;

use crate::dataset::Dataset;

pub use error::AccessError;
use error::Result;

pub trait AuthorizationService: Send + Sync {
    /// Permission levels `user_id` holds on one trait of `dataset`.
    fn trait_permissions(&self, dataset: &Dataset, user_id: &str, trait_name: &str) -> Result<Vec<String>>;
}

impl<T: AuthorizationService + ?Sized> AuthorizationService for Arc<T> {
    fn trait_permissions(&self, dataset: &Dataset, user_id: &str, trait_name: &str) -> Result<Vec<String>> {
        (**self).trait_permissions(dataset, user_id, trait_name)
    }
}

/// True when the permission list includes `view` or `edit`.
pub fn grants_view<S: AsRef<str>>(permissions: &[S]) -> bool {
    permissions
        .iter()
        .any(|p| matches!(p.as_ref(), "view" | "edit"))
}

/// Answers "may this user see this row" for one dataset and user.
pub struct PermissionFilter<'a> {
    service: &'a dyn AuthorizationService,
    dataset: &'a Dataset,
    user_id: &'a str,
}

impl<'a> PermissionFilter<'a> {
    pub fn new(service: &'a dyn AuthorizationService, dataset: &'a Dataset, user_id: &'a str) -> Self {
        Self {
            service,
            dataset,
            user_id,
        }
    }

    /// A failed lookup denies access.
    pub fn allows(&self, trait_name: &str) -> bool {
        match self
            .service
            .trait_permissions(self.dataset, self.user_id, trait_name)
        {
            Ok(permissions) => grants_view(&permissions),
            Err(e) => {
                warn!(error = %e, trait_name, dataset = %self.dataset.name, "Permission lookup failed; hiding row");
                false
            }
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum AccessError {
        #[error("Authorization service error: {0}")]
        Service(#[source] anyhow::Error),
        #[error("Malformed permission data: {0}")]
        Malformed(String),
    }

    pub type Result<T> = std::result::Result<T, AccessError>;
}
