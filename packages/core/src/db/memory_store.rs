//! In-memory store backend
//!
//! Implements every store trait over tokio `RwLock`ed maps. Used by tests,
//! the dev tools and as the reference backend of [`ContentServices`].
//!
//! Relationship ids are assigned sequentially starting at 1, so id order is
//! creation order.
//!
//! [`ContentServices`]: crate::services::ContentServices

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::DatabaseError;
use super::store::{ItemStore, MetadataFieldStore, RelationshipStore, RelationshipTypeStore};
use crate::models::{EntityType, Item, MetadataField, Relationship, RelationshipType, Side};

/// Thread-safe in-memory implementation of the store traits
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
    relationships: Arc<RwLock<BTreeMap<i64, Relationship>>>,
    relationship_types: Arc<RwLock<BTreeMap<i64, RelationshipType>>>,
    entity_types: Arc<RwLock<BTreeMap<i64, EntityType>>>,
    fields: Arc<RwLock<BTreeSet<MetadataField>>>,
    next_relationship_id: Arc<AtomicI64>,
    next_type_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn create_relationship(&self, mut relationship: Relationship) -> Result<Relationship> {
        if relationship.is_persisted() {
            bail!(DatabaseError::duplicate(format!(
                "relationship {} is already persisted",
                relationship.id
            )));
        }
        relationship.id = Self::allocate(&self.next_relationship_id);
        self.relationships
            .write()
            .await
            .insert(relationship.id, relationship.clone());
        Ok(relationship)
    }

    async fn get_relationship(&self, id: i64) -> Result<Option<Relationship>> {
        Ok(self.relationships.read().await.get(&id).cloned())
    }

    async fn save_relationship(&self, relationship: Relationship) -> Result<Relationship> {
        let mut relationships = self.relationships.write().await;
        match relationships.get_mut(&relationship.id) {
            Some(existing) => {
                *existing = relationship.clone();
                Ok(relationship)
            }
            None => bail!(DatabaseError::relationship_not_found(relationship.id)),
        }
    }

    async fn delete_relationship(&self, id: i64) -> Result<bool> {
        Ok(self.relationships.write().await.remove(&id).is_some())
    }

    async fn list_relationships(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Relationship>> {
        let relationships = self.relationships.read().await;
        let page = relationships
            .values()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(page)
    }

    async fn find_relationships_by_item(&self, item: Uuid) -> Result<Vec<Relationship>> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .values()
            .filter(|r| r.left_item == item || r.right_item == item)
            .cloned()
            .collect())
    }

    async fn find_relationships_by_item_and_type(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        side: Option<Side>,
    ) -> Result<Vec<Relationship>> {
        let on_side = |r: &Relationship, side: Side| {
            r.item(side) == item
                && r.relationship_type
                    .has_label(side, relationship_type.label(side))
        };
        let relationships = self.relationships.read().await;
        Ok(relationships
            .values()
            .filter(|r| match side {
                Some(side) => on_side(r, side),
                None => on_side(r, Side::Left) || on_side(r, Side::Right),
            })
            .cloned()
            .collect())
    }

    async fn find_relationships_by_type(
        &self,
        relationship_type_id: i64,
    ) -> Result<Vec<Relationship>> {
        let relationships = self.relationships.read().await;
        Ok(relationships
            .values()
            .filter(|r| r.relationship_type.id == relationship_type_id)
            .cloned()
            .collect())
    }

    async fn count_relationships(&self) -> Result<usize> {
        Ok(self.relationships.read().await.len())
    }
}

#[async_trait]
impl RelationshipTypeStore for MemoryStore {
    async fn create_entity_type(&self, label: &str) -> Result<EntityType> {
        let mut entity_types = self.entity_types.write().await;
        if let Some(existing) = entity_types.values().find(|et| et.label == label) {
            return Ok(existing.clone());
        }
        let entity_type = EntityType::new(Self::allocate(&self.next_type_id), label);
        entity_types.insert(entity_type.id, entity_type.clone());
        Ok(entity_type)
    }

    async fn find_entity_type_by_label(&self, label: &str) -> Result<Option<EntityType>> {
        let entity_types = self.entity_types.read().await;
        Ok(entity_types.values().find(|et| et.label == label).cloned())
    }

    async fn list_entity_types(&self) -> Result<Vec<EntityType>> {
        Ok(self.entity_types.read().await.values().cloned().collect())
    }

    async fn create_relationship_type(
        &self,
        mut relationship_type: RelationshipType,
    ) -> Result<RelationshipType> {
        relationship_type.validate()?;

        let mut types = self.relationship_types.write().await;
        if relationship_type.id == 0 {
            relationship_type.id = Self::allocate(&self.next_type_id);
        } else if types.contains_key(&relationship_type.id) {
            bail!(DatabaseError::duplicate(format!(
                "relationship type {} already exists",
                relationship_type.id
            )));
        } else {
            // Keep generated ids ahead of explicitly chosen ones
            self.next_type_id
                .fetch_max(relationship_type.id, Ordering::SeqCst);
        }
        types.insert(relationship_type.id, relationship_type.clone());
        Ok(relationship_type)
    }

    async fn get_relationship_type(&self, id: i64) -> Result<Option<RelationshipType>> {
        Ok(self.relationship_types.read().await.get(&id).cloned())
    }

    async fn find_relationship_types_by_entity_type(
        &self,
        entity_type: &EntityType,
    ) -> Result<Vec<RelationshipType>> {
        let types = self.relationship_types.read().await;
        Ok(types
            .values()
            .filter(|rt| {
                rt.left_type.label == entity_type.label || rt.right_type.label == entity_type.label
            })
            .cloned()
            .collect())
    }

    async fn find_relationship_types_by_label(&self, label: &str) -> Result<Vec<RelationshipType>> {
        let types = self.relationship_types.read().await;
        Ok(types
            .values()
            .filter(|rt| rt.leftward_type == label || rt.rightward_type == label)
            .cloned()
            .collect())
    }

    async fn list_relationship_types(&self) -> Result<Vec<RelationshipType>> {
        Ok(self.relationship_types.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn create_item(&self, item: Item) -> Result<Item> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            bail!(DatabaseError::duplicate(format!("item {} already exists", item.id)));
        }
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn save_item(&self, item: Item) -> Result<Item> {
        let mut items = self.items.write().await;
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item)
            }
            None => bail!(DatabaseError::item_not_found(item.id)),
        }
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self.items.read().await.values().cloned().collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        Ok(items)
    }
}

#[async_trait]
impl MetadataFieldStore for MemoryStore {
    async fn register_field(&self, field: MetadataField) -> Result<()> {
        self.fields.write().await.insert(field);
        Ok(())
    }

    async fn find_field(
        &self,
        schema: &str,
        element: &str,
        qualifier: Option<&str>,
    ) -> Result<Option<MetadataField>> {
        let fields = self.fields.read().await;
        Ok(fields
            .iter()
            .find(|f| {
                f.schema == schema && f.element == element && f.qualifier.as_deref() == qualifier
            })
            .cloned())
    }

    async fn list_fields(&self) -> Result<Vec<MetadataField>> {
        Ok(self.fields.read().await.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRelationship, Tilted};

    fn relationship_type(id: i64) -> RelationshipType {
        RelationshipType {
            id,
            left_type: EntityType::new(1, "Publication"),
            right_type: EntityType::new(2, "Person"),
            leftward_type: "isAuthorOfPublication".to_string(),
            rightward_type: "isPublicationOfAuthor".to_string(),
            left_min_cardinality: None,
            left_max_cardinality: None,
            right_min_cardinality: None,
            right_max_cardinality: None,
            copy_to_left: false,
            copy_to_right: false,
            tilted: Tilted::None,
        }
    }

    #[tokio::test]
    async fn test_relationship_ids_follow_creation_order() {
        let store = MemoryStore::new();
        let rt = relationship_type(1);
        let (left, right) = (Uuid::new_v4(), Uuid::new_v4());

        let first = store
            .create_relationship(NewRelationship::new(rt.clone(), left, right).into_relationship())
            .await
            .unwrap();
        let second = store
            .create_relationship(NewRelationship::new(rt, left, right).into_relationship())
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.count_relationships().await.unwrap(), 2);

        // Persisted relationships cannot be created twice
        assert!(store.create_relationship(first).await.is_err());
    }

    #[tokio::test]
    async fn test_find_by_item_and_type_respects_side() {
        let store = MemoryStore::new();
        let rt = relationship_type(1);
        let item = Uuid::new_v4();

        store
            .create_relationship(
                NewRelationship::new(rt.clone(), item, Uuid::new_v4()).into_relationship(),
            )
            .await
            .unwrap();
        store
            .create_relationship(
                NewRelationship::new(rt.clone(), Uuid::new_v4(), item).into_relationship(),
            )
            .await
            .unwrap();

        let left = store
            .find_relationships_by_item_and_type(item, &rt, Some(Side::Left))
            .await
            .unwrap();
        let any = store
            .find_relationships_by_item_and_type(item, &rt, None)
            .await
            .unwrap();

        assert_eq!(left.len(), 1);
        assert_eq!(any.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_item_and_type_matches_side_label() {
        let store = MemoryStore::new();
        let person_authors = relationship_type(1);
        let org_unit_authors = RelationshipType {
            right_type: EntityType::new(3, "OrgUnit"),
            rightward_type: "isPublicationOfAuthorOrgUnit".to_string(),
            ..relationship_type(2)
        };
        let publication = Uuid::new_v4();

        for rt in [&person_authors, &org_unit_authors] {
            store
                .create_relationship(
                    NewRelationship::new(rt.clone(), publication, Uuid::new_v4())
                        .into_relationship(),
                )
                .await
                .unwrap();
        }

        let shared = store
            .find_relationships_by_item_and_type(publication, &org_unit_authors, Some(Side::Left))
            .await
            .unwrap();
        assert_eq!(shared.len(), 2);

        let mut renamed = relationship_type(1);
        renamed.leftward_type = "isEditorOfPublication".to_string();
        assert!(store
            .find_relationships_by_item_and_type(publication, &renamed, Some(Side::Left))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_save_missing_records_fails() {
        let store = MemoryStore::new();
        assert!(store.save_item(Item::new()).await.is_err());

        let mut relationship =
            NewRelationship::new(relationship_type(1), Uuid::new_v4(), Uuid::new_v4())
                .into_relationship();
        relationship.id = 42;
        let err = store.save_relationship(relationship).await.unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[tokio::test]
    async fn test_generated_type_ids_skip_explicit_ids() {
        let store = MemoryStore::new();
        store
            .create_relationship_type(relationship_type(10))
            .await
            .unwrap();
        let generated = store
            .create_relationship_type(relationship_type(0))
            .await
            .unwrap();
        assert_eq!(generated.id, 11);
        assert!(store
            .create_relationship_type(relationship_type(10))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_entity_type_registration_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.create_entity_type("Person").await.unwrap();
        let second = store.create_entity_type("Person").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_entity_types().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_field_lookup_is_exact() {
        let store = MemoryStore::new();
        store
            .register_field(MetadataField::new("dc", "contributor", Some("author")))
            .await
            .unwrap();

        assert!(store
            .find_field("dc", "contributor", Some("author"))
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_field("dc", "contributor", None)
            .await
            .unwrap()
            .is_none());
    }
}
