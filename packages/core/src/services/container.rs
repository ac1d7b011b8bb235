//! Service composition
//!
//! Wires the relationship services over one store with explicit constructor
//! injection. [`ContentServices::in_memory`] backs everything with a
//! [`MemoryStore`], a [`MemoryIndex`] and a [`PolicyAuthorizeService`].

use std::sync::Arc;
use tracing::info;

use super::authorize::PolicyAuthorizeService;
use super::error::ServiceError;
use super::indexing::MemoryIndex;
use super::item_service::ItemService;
use super::places_indexing_service::RelationshipPlacesIndexingService;
use super::relationship_metadata_service::RelationshipMetadataService;
use super::relationship_service::RelationshipService;
use super::virtual_metadata::VirtualMetadataPopulator;
use crate::config::RepositoryConfig;
use crate::context::Context;
use crate::db::{DatabaseError, MemoryStore, MetadataFieldStore, RelationshipTypeStore, SeedData};
use crate::models::{
    MetadataField, NewRelationship, Relationship, RelationshipType, LATEST_FOR_DISCOVERY,
    RELATION_SCHEMA,
};

#[derive(Clone)]
pub struct ContentServices {
    pub store: MemoryStore,
    pub index: MemoryIndex,
    pub authorize: Arc<PolicyAuthorizeService>,
    pub items: Arc<ItemService>,
    pub relationship_metadata: Arc<RelationshipMetadataService>,
    pub places_indexing: Arc<RelationshipPlacesIndexingService>,
    pub relationships: Arc<RelationshipService>,
}

impl ContentServices {
    /// Build the services over fresh in-memory backends
    ///
    /// Registers the metadata fields named by the virtual metadata bindings.
    pub async fn in_memory(config: RepositoryConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::configuration)?;

        let store = MemoryStore::new();
        let index = MemoryIndex::new();
        let authorize = Arc::new(PolicyAuthorizeService::new());
        let populator = Arc::new(VirtualMetadataPopulator::new(config.virtual_metadata.clone()));

        let items = Arc::new(ItemService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            authorize.clone(),
        ));
        let relationship_metadata = Arc::new(RelationshipMetadataService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            items.clone(),
            populator.clone(),
        ));
        let places_indexing = Arc::new(RelationshipPlacesIndexingService::new(
            Arc::new(store.clone()),
            Arc::new(index.clone()),
            &config.relationship,
        ));
        let relationships = Arc::new(
            RelationshipService::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                items.clone(),
                authorize.clone(),
                populator.clone(),
                relationship_metadata.clone(),
                config.relationship.clone(),
            )
            .with_places_indexing(places_indexing.clone()),
        );

        for fields in populator.bindings().values() {
            for key in fields.keys() {
                register_field(&store, key).await?;
            }
        }

        Ok(Self {
            store,
            index,
            authorize,
            items,
            relationship_metadata,
            places_indexing,
            relationships,
        })
    }

    /// Store a relationship type along with the `relation.*` fields it projects
    pub async fn register_relationship_type(
        &self,
        relationship_type: RelationshipType,
    ) -> Result<RelationshipType, ServiceError> {
        relationship_type.validate()?;

        self.store
            .create_entity_type(&relationship_type.left_type.label)
            .await
            .map_err(ServiceError::from_store)?;
        self.store
            .create_entity_type(&relationship_type.right_type.label)
            .await
            .map_err(ServiceError::from_store)?;
        let created = self
            .store
            .create_relationship_type(relationship_type)
            .await
            .map_err(ServiceError::from_store)?;

        self.register_relation_fields(&created).await?;
        Ok(created)
    }

    async fn register_relation_fields(&self, relationship_type: &RelationshipType) -> Result<(), ServiceError> {
        for label in [&relationship_type.leftward_type, &relationship_type.rightward_type] {
            register_field(&self.store, &format!("{}.{}", RELATION_SCHEMA, label)).await?;
            register_field(
                &self.store,
                &format!("{}.{}.{}", RELATION_SCHEMA, label, LATEST_FOR_DISCOVERY),
            )
            .await?;
        }
        Ok(())
    }

    /// Load a fixture, creating its relationships through the relationship
    /// service so they are validated and placed
    pub async fn load_seed(&self, context: &Context, seed: &SeedData) -> Result<Vec<Relationship>, ServiceError> {
        let pending = seed
            .load_into(&self.store)
            .await
            .map_err(ServiceError::from_store)?;
        for relationship_type in &seed.relationship_types {
            self.register_relation_fields(relationship_type).await?;
        }

        let _bypass = context.turn_off_authorization();
        let mut created = Vec::with_capacity(pending.len());
        for relationship in pending {
            let relationship_type = self
                .store
                .get_relationship_type(relationship.relationship_type_id)
                .await
                .map_err(ServiceError::from_store)?
                .ok_or_else(|| {
                    DatabaseError::relationship_type_not_found(relationship.relationship_type_id)
                })?;
            let new_relationship = NewRelationship::new(
                relationship_type,
                relationship.left_item,
                relationship.right_item,
            )
            .with_places(relationship.left_place, relationship.right_place)
            .with_name_variants(relationship.leftward_value, relationship.rightward_value);
            created.push(self.relationships.create(context, new_relationship).await?);
        }

        info!(
            "Loaded seed with {} items and {} relationships",
            seed.items.len(),
            created.len()
        );
        Ok(created)
    }
}

async fn register_field(store: &MemoryStore, key: &str) -> Result<(), ServiceError> {
    let field = MetadataField::parse(key)?;
    store
        .register_field(field)
        .await
        .map_err(ServiceError::from_store)
}
