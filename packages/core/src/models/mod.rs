//! Data Models
//!
//! This module contains the data structures of the relationship subsystem:
//!
//! - `Item` and its ordered `MetadataValue`s
//! - `EntityType` and `RelationshipType` (the allowed edge types)
//! - `Relationship` (edge instances with per-side places)
//! - `RelationshipMetadataValue` (transient projections)
//!
//! Items are referenced by UUID everywhere; there are no back-pointers.

mod item;
mod metadata;
mod relationship;
mod relationship_metadata;
mod relationship_type;

pub use item::{
    Item, ValidationError, ENTITY_TYPE_ELEMENT, ENTITY_TYPE_QUALIFIER, ENTITY_TYPE_SCHEMA,
};
pub use metadata::{MetadataField, MetadataValue, ANY, CONFIDENCE_UNSET, FIELD_SEPARATOR};
pub use relationship::{
    LatestVersionStatus, NewRelationship, Relationship, VIRTUAL_AUTHORITY_PREFIX,
};
pub use relationship_metadata::{
    RelationshipMetadataValue, CONFIDENCE_ACCEPTED, LATEST_FOR_DISCOVERY, RELATION_SCHEMA,
    UNORDERED_PLACE,
};
pub use relationship_type::{EntityType, RelationshipType, Side, Tilted};
