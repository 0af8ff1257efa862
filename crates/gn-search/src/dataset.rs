//! Dataset model consumed by the search core.
//!
//! Datasets are owned by the surrounding web layer; the search core only
//! needs enough of them to scope queries and to label results.

use std::{fmt, str::FromStr};

use serde::Serialize;

pub use error::DatasetError;
use error::Result;

/// Kind of dataset a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DatasetType {
    /// Gene expression (probe sets).
    ProbeSet,
    /// Phenotypes; the only type with per-trait access control.
    Publish,
    /// Genotype markers.
    Geno,
    /// Ephemeral user-uploaded traits.
    Temp,
}

impl DatasetType {
    /// Maps the request's `type` field onto a dataset type.
    pub fn from_search_type(search_type: Option<&str>) -> Self {
        match search_type {
            Some("Phenotypes") => Self::Publish,
            Some("Genotypes") => Self::Geno,
            _ => Self::ProbeSet,
        }
    }

    /// Table prefix used by the relational schema.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProbeSet => "ProbeSet",
            Self::Publish => "Publish",
            Self::Geno => "Geno",
            Self::Temp => "Temp",
        }
    }

    /// Record type understood by the index service. `Temp` traits are not indexed.
    pub const fn index_type(self) -> Option<&'static str> {
        match self {
            Self::ProbeSet => Some("gene"),
            Self::Publish => Some("phenotype"),
            Self::Geno => Some("genotype"),
            Self::Temp => None,
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ProbeSet" => Ok(Self::ProbeSet),
            "Publish" => Ok(Self::Publish),
            "Geno" => Ok(Self::Geno),
            "Temp" => Ok(Self::Temp),
            other => Err(DatasetError::UnknownType(other.to_string())),
        }
    }
}

/// The inbred set (group) a dataset belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    /// Lower-case species name, e.g. `mouse`.
    pub species: String,
    pub species_id: u64,
    /// Short inbred-set code used to prefix phenotype names, e.g. `BXD`.
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub dataset_type: DatasetType,
    pub id: u64,
    pub name: String,
    pub shortname: String,
    pub fullname: String,
    pub group: Group,
}

impl Dataset {
    pub fn new(dataset_type: DatasetType, id: u64, name: impl Into<String>, group: Group) -> Self {
        let name = name.into();
        Self {
            dataset_type,
            id,
            shortname: name.clone(),
            fullname: name.clone(),
            name,
            group,
        }
    }
}

/// Looks datasets up by name; stands in for the web layer's dataset factory.
pub trait DatasetCatalog: Send + Sync {
    fn resolve(&self, name: &str, dataset_type: DatasetType) -> Result<Dataset>;
}

mod error {
    use thiserror::Error;

    use super::DatasetType;

    #[derive(Error, Debug)]
    pub enum DatasetError {
        #[error("No {dataset_type} dataset named '{name}'")]
        NotFound {
            name: String,
            dataset_type: DatasetType,
        },
        #[error("Unknown dataset type '{0}'")]
        UnknownType(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }

    pub type Result<T> = std::result::Result<T, DatasetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_mapping() {
        assert_eq!(
            DatasetType::from_search_type(Some("Phenotypes")),
            DatasetType::Publish
        );
        assert_eq!(
            DatasetType::from_search_type(Some("Genotypes")),
            DatasetType::Geno
        );
        assert_eq!(
            DatasetType::from_search_type(Some("Gene Expression")),
            DatasetType::ProbeSet
        );
        assert_eq!(DatasetType::from_search_type(None), DatasetType::ProbeSet);
    }

    #[test]
    fn test_index_types() {
        assert_eq!(DatasetType::ProbeSet.index_type(), Some("gene"));
        assert_eq!(DatasetType::Publish.index_type(), Some("phenotype"));
        assert_eq!(DatasetType::Geno.index_type(), Some("genotype"));
        assert_eq!(DatasetType::Temp.index_type(), None);
    }

    #[test]
    fn test_parse_dataset_type() {
        assert_eq!("Geno".parse::<DatasetType>().unwrap(), DatasetType::Geno);
        assert!(matches!(
            "Genes".parse::<DatasetType>(),
            Err(DatasetError::UnknownType(_))
        ));
    }
}
