//! Store Traits - Persistence Abstraction Layer
//!
//! This module defines the traits that abstract persistence for the
//! relationship services. Services only ever talk to these traits, so a
//! relational backend can replace the in-memory [`MemoryStore`] without
//! changing business logic.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so network backends fit
//! 2. **Ownership Semantics**: Methods take ownership of records; callers clone
//!    when they need to keep the original
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context;
//!    services map failures into their own error type
//! 4. **Transactions**: Owned by the caller; stores do not coordinate
//!
//! # Examples
//!
//! ```rust
//! use relata_core::db::{ItemStore, MemoryStore};
//! use relata_core::models::Item;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let item = store.create_item(Item::new()).await?;
//! assert!(store.get_item(item.id).await?.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! [`MemoryStore`]: super::MemoryStore

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{EntityType, Item, MetadataField, Relationship, RelationshipType, Side};

/// Persistence of relationship instances
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts
/// where futures may be moved between threads.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Persist a new relationship and assign its id
    ///
    /// # Errors
    ///
    /// Returns error if the relationship already carries an id.
    async fn create_relationship(&self, relationship: Relationship) -> Result<Relationship>;

    /// Get relationship by id
    ///
    /// Returns `None` if no relationship has this id.
    async fn get_relationship(&self, id: i64) -> Result<Option<Relationship>>;

    /// Overwrite a persisted relationship
    ///
    /// # Errors
    ///
    /// Returns error if the relationship does not exist.
    async fn save_relationship(&self, relationship: Relationship) -> Result<Relationship>;

    /// Delete a relationship; returns whether it existed
    async fn delete_relationship(&self, id: i64) -> Result<bool>;

    /// All relationships ordered by id
    async fn list_relationships(&self, limit: Option<usize>, offset: usize)
        -> Result<Vec<Relationship>>;

    /// Relationships with `item` on either side, ordered by id
    async fn find_relationships_by_item(&self, item: Uuid) -> Result<Vec<Relationship>>;

    /// Relationships touching `item` whose type carries the same label as
    /// `relationship_type` on the side `item` sits on, ordered by id
    ///
    /// Types are matched by label, not by id: two types sharing a leftward
    /// label share the left item's places. With `side` given, only
    /// relationships where `item` sits on that side.
    async fn find_relationships_by_item_and_type(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        side: Option<Side>,
    ) -> Result<Vec<Relationship>>;

    /// Relationships of one type, ordered by id
    async fn find_relationships_by_type(
        &self,
        relationship_type_id: i64,
    ) -> Result<Vec<Relationship>>;

    async fn count_relationships(&self) -> Result<usize>;
}

/// Persistence of entity types and relationship types
#[async_trait]
pub trait RelationshipTypeStore: Send + Sync {
    /// Register an entity type; returns the existing one if the label is taken
    async fn create_entity_type(&self, label: &str) -> Result<EntityType>;

    async fn find_entity_type_by_label(&self, label: &str) -> Result<Option<EntityType>>;

    async fn list_entity_types(&self) -> Result<Vec<EntityType>>;

    /// Persist a relationship type; an id of 0 is assigned by the store
    async fn create_relationship_type(
        &self,
        relationship_type: RelationshipType,
    ) -> Result<RelationshipType>;

    async fn get_relationship_type(&self, id: i64) -> Result<Option<RelationshipType>>;

    /// Types where `entity_type` sits on the left or the right
    async fn find_relationship_types_by_entity_type(
        &self,
        entity_type: &EntityType,
    ) -> Result<Vec<RelationshipType>>;

    /// Types whose leftward or rightward label equals `label`
    async fn find_relationship_types_by_label(&self, label: &str) -> Result<Vec<RelationshipType>>;

    async fn list_relationship_types(&self) -> Result<Vec<RelationshipType>>;
}

/// Persistence of items and their metadata
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// # Errors
    ///
    /// Returns error if an item with the same id already exists.
    async fn create_item(&self, item: Item) -> Result<Item>;

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>>;

    /// Overwrite a persisted item
    ///
    /// # Errors
    ///
    /// Returns error if the item does not exist.
    async fn save_item(&self, item: Item) -> Result<Item>;

    async fn list_items(&self) -> Result<Vec<Item>>;
}

/// Registry of known metadata fields
#[async_trait]
pub trait MetadataFieldStore: Send + Sync {
    /// Register a field; registering twice is a no-op
    async fn register_field(&self, field: MetadataField) -> Result<()>;

    /// Look up a field by its components (exact qualifier match)
    async fn find_field(
        &self,
        schema: &str,
        element: &str,
        qualifier: Option<&str>,
    ) -> Result<Option<MetadataField>>;

    async fn list_fields(&self) -> Result<Vec<MetadataField>>;
}
