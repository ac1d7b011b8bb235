//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for business rule and permission failures.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;
use uuid::Uuid;

/// Service operation errors
///
/// Provides high-level error types for all service operations,
/// with detailed context and proper error chaining.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Relationship rejected by type, cardinality or existence checks
    #[error("The relationship given was not valid: {0}")]
    InvalidRelationship(String),

    /// Acting principal lacks the required permission
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Relationship not found by ID
    #[error("Relationship not found: {id}")]
    RelationshipNotFound { id: i64 },

    /// Item not found by ID
    #[error("Item not found: {id}")]
    ItemNotFound { id: Uuid },

    /// Model validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Store operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Query execution error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Create an invalid relationship error
    pub fn invalid_relationship(msg: impl Into<String>) -> Self {
        Self::InvalidRelationship(msg.into())
    }

    /// Create an authorization denied error
    pub fn authorization_denied(msg: impl Into<String>) -> Self {
        Self::AuthorizationDenied(msg.into())
    }

    /// Create a relationship not found error
    pub fn relationship_not_found(id: i64) -> Self {
        Self::RelationshipNotFound { id }
    }

    /// Create an item not found error
    pub fn item_not_found(id: Uuid) -> Self {
        Self::ItemNotFound { id }
    }

    /// Map a store failure, keeping typed `DatabaseError`s intact
    pub fn from_store(error: anyhow::Error) -> Self {
        match error.downcast::<DatabaseError>() {
            Ok(database_error) => Self::DatabaseError(database_error),
            Err(other) => Self::query_failed(other.to_string()),
        }
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error is a validation rejection
    pub fn is_invalid_relationship(&self) -> bool {
        matches!(self, Self::InvalidRelationship(_))
    }

    /// Whether this error is a permission failure
    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, Self::AuthorizationDenied(_))
    }
}
