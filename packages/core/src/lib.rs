//! Relata Core: entity relationships and virtual metadata
//!
//! Items of a repository carry typed metadata. Items of different entity
//! types (Publication, Person, OrgUnit...) are connected by relationships of
//! a declared `RelationshipType`, and every relationship is projected back
//! onto its items as synthetic `relation.*` and configured virtual metadata.
//!
//! # Modules
//!
//! - [`models`] - Items, metadata, relationship types and relationships
//! - [`db`] - Store traits, the in-memory store, events and fixtures
//! - [`services`] - Relationship, relationship metadata and places indexing services
//! - [`config`] - Repository configuration
//! - [`context`] - Caller-owned request context

pub mod config;
pub mod context;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{ConfigError, RelationshipSettings, RepositoryConfig};
pub use context::{AuthorizationBypass, Context};
pub use models::*;
pub use services::*;
