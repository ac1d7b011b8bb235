//! Store Error Types
//!
//! This module defines error types for the persistence layer, covering
//! missing records, constraint violations and fixture loading failures.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Store operation errors
///
/// Covers failures raised by store backends. Validation of relationship
/// semantics is handled by service-layer error types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Item not present in the store
    #[error("Item not found: {id}")]
    ItemNotFound { id: Uuid },

    /// Relationship not present in the store
    #[error("Relationship not found: {id}")]
    RelationshipNotFound { id: i64 },

    /// Relationship type not present in the store
    #[error("Relationship type not found: {id}")]
    RelationshipTypeNotFound { id: i64 },

    /// Record already persisted under the same key
    #[error("Duplicate record: {context}")]
    Duplicate { context: String },

    /// Failed to read a fixture or configuration file
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse a fixture file
    #[error("Failed to parse fixture: {0}")]
    ParseFailed(#[from] serde_json::Error),

    /// Fixture references records that do not exist
    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),
}

impl DatabaseError {
    /// Create an item not found error
    pub fn item_not_found(id: Uuid) -> Self {
        Self::ItemNotFound { id }
    }

    /// Create a relationship not found error
    pub fn relationship_not_found(id: i64) -> Self {
        Self::RelationshipNotFound { id }
    }

    /// Create a relationship type not found error
    pub fn relationship_type_not_found(id: i64) -> Self {
        Self::RelationshipTypeNotFound { id }
    }

    /// Create a duplicate record error
    pub fn duplicate(context: impl Into<String>) -> Self {
        Self::Duplicate {
            context: context.into(),
        }
    }

    /// Create a read failed error
    pub fn read_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::ReadFailed { path, source }
    }

    /// Create an invalid fixture error
    pub fn invalid_fixture(msg: impl Into<String>) -> Self {
        Self::InvalidFixture(msg.into())
    }
}
