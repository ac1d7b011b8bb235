//! JSON fixtures for populating a store
//!
//! A fixture declares entity types, relationship types, items with their
//! metadata and the relationships between them:
//!
//! ```json
//! {
//!   "relationshipTypes": [{
//!     "id": 1,
//!     "leftType": { "id": 1, "label": "Publication" },
//!     "rightType": { "id": 2, "label": "Person" },
//!     "leftwardType": "isAuthorOfPublication",
//!     "rightwardType": "isPublicationOfAuthor"
//!   }],
//!   "items": [{
//!     "id": "6a0c4f2e-8d7b-4d7e-9a61-1b5f1f2f6d10",
//!     "metadata": { "dspace.entity.type": ["Person"], "person.familyName": ["Smith"] }
//!   }],
//!   "relationships": [{ "relationshipTypeId": 1, "leftItem": "...", "rightItem": "..." }]
//! }
//! ```
//!
//! Types, fields and items are written straight into the store by
//! [`SeedData::load_into`]. Relationships are returned to the caller so they
//! go through the relationship service and get validated and placed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use super::error::DatabaseError;
use super::store::{ItemStore, MetadataFieldStore, RelationshipTypeStore};
use crate::models::{Item, MetadataField, RelationshipType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    /// Extra entity types not mentioned by any relationship type
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Extra metadata fields not used by any item
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub relationship_types: Vec<RelationshipType>,
    #[serde(default)]
    pub items: Vec<SeedItem>,
    #[serde(default)]
    pub relationships: Vec<SeedRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedItem {
    pub id: Uuid,
    /// Field key to values, in place order
    #[serde(default)]
    pub metadata: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRelationship {
    pub relationship_type_id: i64,
    pub left_item: Uuid,
    pub right_item: Uuid,
    #[serde(default)]
    pub left_place: Option<i32>,
    #[serde(default)]
    pub right_place: Option<i32>,
    #[serde(default)]
    pub leftward_value: Option<String>,
    #[serde(default)]
    pub rightward_value: Option<String>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DatabaseError::read_failed(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    /// Write types, fields and items into `store`
    ///
    /// Returns the relationships still to be created, after checking that
    /// each one references a known type and known items.
    pub async fn load_into<S>(&self, store: &S) -> anyhow::Result<Vec<SeedRelationship>>
    where
        S: RelationshipTypeStore + ItemStore + MetadataFieldStore,
    {
        for label in &self.entity_types {
            store.create_entity_type(label).await?;
        }
        for key in &self.fields {
            store.register_field(MetadataField::parse(key)?).await?;
        }

        for relationship_type in &self.relationship_types {
            store
                .create_entity_type(&relationship_type.left_type.label)
                .await?;
            store
                .create_entity_type(&relationship_type.right_type.label)
                .await?;
            store
                .create_relationship_type(relationship_type.clone())
                .await?;
        }

        for seed_item in &self.items {
            let mut item = Item::with_id(seed_item.id);
            for (key, values) in &seed_item.metadata {
                store.register_field(MetadataField::parse(key)?).await?;
                for value in values {
                    item.add_metadata(key, value.clone())?;
                }
            }
            item.metadata_modified = false;
            store.create_item(item).await?;
        }

        for relationship in &self.relationships {
            if store
                .get_relationship_type(relationship.relationship_type_id)
                .await?
                .is_none()
            {
                return Err(
                    DatabaseError::relationship_type_not_found(relationship.relationship_type_id)
                        .into(),
                );
            }
            for id in [relationship.left_item, relationship.right_item] {
                if store.get_item(id).await?.is_none() {
                    return Err(
                        DatabaseError::invalid_fixture(format!("unknown item {}", id)).into(),
                    );
                }
            }
        }

        Ok(self.relationships.clone())
    }
}
