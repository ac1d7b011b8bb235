//! Repository configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object is a
//! valid configuration.
//!
//! ```json
//! {
//!   "relationship": {
//!     "updateRelatedItemsMax": 20,
//!     "updateRelatedItemsMaxDepth": 5,
//!     "placesOnlyLeft": ["isAuthorOfPublication"]
//!   },
//!   "virtualMetadata": { "isAuthorOfPublication": { ... } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::MetadataField;
use crate::services::VirtualMetadataBindings;

/// Default cap on items re-indexed after one relationship change
pub const DEFAULT_UPDATE_RELATED_ITEMS_MAX: usize = 20;

/// Default cap on relationship hops followed when collecting those items
pub const DEFAULT_UPDATE_RELATED_ITEMS_MAX_DEPTH: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipSettings {
    pub update_related_items_max: usize,
    pub update_related_items_max_depth: usize,
    /// Leftward labels whose places are indexed on the left item only
    pub places_only_left: Vec<String>,
    /// Leftward labels whose places are indexed on the right item only
    pub places_only_right: Vec<String>,
}

impl Default for RelationshipSettings {
    fn default() -> Self {
        Self {
            update_related_items_max: DEFAULT_UPDATE_RELATED_ITEMS_MAX,
            update_related_items_max_depth: DEFAULT_UPDATE_RELATED_ITEMS_MAX_DEPTH,
            places_only_left: Vec::new(),
            places_only_right: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryConfig {
    pub relationship: RelationshipSettings,
    pub virtual_metadata: VirtualMetadataBindings,
}

impl RepositoryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.relationship.update_related_items_max == 0 {
            return Err("updateRelatedItemsMax must be greater than 0".to_string());
        }

        if self.relationship.update_related_items_max_depth == 0 {
            return Err("updateRelatedItemsMaxDepth must be greater than 0".to_string());
        }

        for (label, fields) in &self.virtual_metadata {
            if label.trim().is_empty() {
                return Err("virtual metadata relationship labels cannot be empty".to_string());
            }
            for key in fields.keys() {
                MetadataField::parse(key)
                    .map_err(|e| format!("virtual metadata for '{}': {}", label, e))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.relationship.update_related_items_max, 20);
        assert_eq!(config.relationship.update_related_items_max_depth, 5);
        assert!(config.relationship.places_only_left.is_empty());
        assert!(config.virtual_metadata.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RepositoryConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero item limit
        config.relationship.update_related_items_max = 0;
        assert!(config.validate().is_err());

        // Invalid: zero depth
        config.relationship.update_related_items_max = 20;
        config.relationship.update_related_items_max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_binding_key() {
        let err = RepositoryConfig::from_json(
            r#"{ "virtualMetadata": { "isAuthorOfPublication": {
                "author": { "type": "uuidValue" }
            } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "relationship": {{ "updateRelatedItemsMax": 3, "placesOnlyRight": ["isAuthorOfPublication"] }} }}"#
        )
        .unwrap();

        let config = RepositoryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.relationship.update_related_items_max, 3);
        assert_eq!(config.relationship.update_related_items_max_depth, 5);
        assert_eq!(
            config.relationship.places_only_right,
            vec!["isAuthorOfPublication".to_string()]
        );
    }
}
