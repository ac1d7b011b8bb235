//! Item Data Structures
//!
//! An `Item` is the archival object relationships are drawn between. Its
//! descriptive data lives entirely in ordered metadata values; the entity
//! type of an item (Publication, Person, ...) is itself a metadata value in
//! `dspace.entity.type`.
//!
//! # Examples
//!
//! ```rust
//! use relata_core::models::Item;
//!
//! let mut person = Item::new();
//! person.add_metadata("dspace.entity.type", "Person").unwrap();
//! person.add_metadata("person.familyName", "Smith").unwrap();
//!
//! assert_eq!(person.entity_type_label(), Some("Person"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::metadata::{MetadataField, MetadataValue};

/// Schema, element and qualifier of the field holding an item's entity type
pub const ENTITY_TYPE_SCHEMA: &str = "dspace";
pub const ENTITY_TYPE_ELEMENT: &str = "entity";
pub const ENTITY_TYPE_QUALIFIER: &str = "type";

/// Validation errors for model construction
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid metadata field: {0}")]
    InvalidField(String),

    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    #[error("Invalid relationship type: {0}")]
    InvalidRelationshipType(String),
}

/// An archived item with ordered metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,

    #[serde(default)]
    pub metadata: Vec<MetadataValue>,

    /// Set when derived (virtual) metadata must be recomputed on next update
    #[serde(skip)]
    pub metadata_modified: bool,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl Item {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            metadata: Vec::new(),
            metadata_modified: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// Append a value to a field, placing it after the field's existing values
    pub fn add_metadata(&mut self, key: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let field = MetadataField::parse(key)?;
        let place = self.next_place_for(&field);
        self.metadata.push(MetadataValue::new(field, value, place));
        self.metadata_modified = true;
        Ok(())
    }

    /// Next free place among the values of `field`
    pub fn next_place_for(&self, field: &MetadataField) -> i32 {
        self.metadata
            .iter()
            .filter(|mv| &mv.field == field)
            .map(|mv| mv.place + 1)
            .max()
            .unwrap_or(0)
    }

    /// Values of a field ordered by place
    pub fn values_of(&self, field: &MetadataField) -> Vec<&MetadataValue> {
        let mut values: Vec<&MetadataValue> =
            self.metadata.iter().filter(|mv| &mv.field == field).collect();
        values.sort_by_key(|mv| mv.place);
        values
    }

    /// Label of the item's entity type (first `dspace.entity.type` value)
    pub fn entity_type_label(&self) -> Option<&str> {
        self.metadata
            .iter()
            .filter(|mv| {
                mv.field.matches(
                    ENTITY_TYPE_SCHEMA,
                    ENTITY_TYPE_ELEMENT,
                    Some(ENTITY_TYPE_QUALIFIER),
                )
            })
            .min_by_key(|mv| mv.place)
            .map(|mv| mv.value.as_str())
    }

    pub fn set_metadata_modified(&mut self) {
        self.metadata_modified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_metadata_assigns_consecutive_places() {
        let mut item = Item::new();
        item.add_metadata("dc.contributor.author", "Smith, John").unwrap();
        item.add_metadata("dc.contributor.author", "Doe, Jane").unwrap();
        item.add_metadata("dc.title", "A title").unwrap();

        let field = MetadataField::new("dc", "contributor", Some("author"));
        let authors = item.values_of(&field);
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].place, 0);
        assert_eq!(authors[1].place, 1);
        assert_eq!(item.next_place_for(&field), 2);
        assert!(item.metadata_modified);
    }

    #[test]
    fn test_entity_type_label() {
        let mut item = Item::new();
        assert!(item.entity_type_label().is_none());

        item.add_metadata("dspace.entity.type", "Publication").unwrap();
        assert_eq!(item.entity_type_label(), Some("Publication"));
    }

    #[test]
    fn test_add_metadata_rejects_bad_key() {
        let mut item = Item::new();
        assert!(item.add_metadata("title", "x").is_err());
        assert!(item.metadata.is_empty());
    }

    #[test]
    fn test_metadata_modified_not_serialized() {
        let mut item = Item::new();
        item.set_metadata_modified();
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("metadataModified").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
