//! Relationship Metadata Service
//!
//! Projects relationships into transient metadata values on an item:
//!
//! 1. `relation.<label>.latestForDiscovery` for every relationship where the
//!    item holds latest-version status (skipping tilted fan-out sides)
//! 2. Per relationship, in display order: the configured virtual fields
//!    computed from the other item, then `relation.<label>` carrying the
//!    other item's UUID
//!
//! Every projected value carries the authority `virtual::<relationship id>`.
//! Projection never writes anything, so repeated calls return equal lists.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::error;

use super::error::ServiceError;
use super::item_service::ItemService;
use super::relationship_queries;
use super::virtual_metadata::{
    VirtualFieldBindings, VirtualMetadataConfiguration, VirtualMetadataPopulator, VirtualSource,
};
use crate::db::{MetadataFieldStore, RelationshipStore, RelationshipTypeStore};
use crate::models::{
    EntityType, Item, MetadataField, Relationship, RelationshipMetadataValue, RelationshipType,
    Side, Tilted, LATEST_FOR_DISCOVERY, RELATION_SCHEMA, UNORDERED_PLACE,
};

type ValuesFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>, ServiceError>> + Send + 'a>>;

pub struct RelationshipMetadataService {
    relationships: Arc<dyn RelationshipStore>,
    relationship_types: Arc<dyn RelationshipTypeStore>,
    fields: Arc<dyn MetadataFieldStore>,
    item_service: Arc<ItemService>,
    populator: Arc<VirtualMetadataPopulator>,
}

impl RelationshipMetadataService {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        relationship_types: Arc<dyn RelationshipTypeStore>,
        fields: Arc<dyn MetadataFieldStore>,
        item_service: Arc<ItemService>,
        populator: Arc<VirtualMetadataPopulator>,
    ) -> Self {
        Self {
            relationships,
            relationship_types,
            fields,
            item_service,
            populator,
        }
    }

    /// All projected values for `item`
    ///
    /// Items without a known entity type have no projected values.
    pub async fn get_relationship_metadata(
        &self,
        item: &Item,
        enable_virtual_metadata: bool,
    ) -> Result<Vec<RelationshipMetadataValue>, ServiceError> {
        let Some(entity_type) = self.get_entity_type(item).await? else {
            return Ok(Vec::new());
        };

        let mut values = self
            .find_latest_for_discovery_metadata_values(item, &entity_type)
            .await?;

        let relationships =
            relationship_queries::find_by_item(self.relationships.as_ref(), item.id, true)
                .await
                .map_err(ServiceError::from_store)?;
        for relationship in &relationships {
            values.extend(
                self.find_relationship_metadata_value_for_item_relationship(
                    item,
                    &entity_type.label,
                    relationship,
                    enable_virtual_metadata,
                )
                .await?,
            );
        }

        Ok(values)
    }

    pub fn get_entity_type_string_from_metadata(&self, item: &Item) -> Option<String> {
        item.entity_type_label().map(str::to_string)
    }

    pub async fn get_entity_type(&self, item: &Item) -> Result<Option<EntityType>, ServiceError> {
        self.item_service.get_entity_type(item).await
    }

    async fn find_latest_for_discovery_metadata_values(
        &self,
        item: &Item,
        entity_type: &EntityType,
    ) -> Result<Vec<RelationshipMetadataValue>, ServiceError> {
        let relationship_types = self
            .relationship_types
            .find_relationship_types_by_entity_type(entity_type)
            .await
            .map_err(ServiceError::from_store)?;

        let mut values = Vec::new();
        for relationship_type in &relationship_types {
            for side in [Side::Left, Side::Right] {
                let skipped_tilt = match side {
                    Side::Left => Tilted::Right,
                    Side::Right => Tilted::Left,
                };
                if relationship_type.entity_type(side).label != entity_type.label
                    || relationship_type.tilted == skipped_tilt
                {
                    continue;
                }
                values.extend(
                    self.latest_for_discovery_values(item, relationship_type, side)
                        .await?,
                );
            }
        }
        Ok(values)
    }

    async fn latest_for_discovery_values(
        &self,
        item: &Item,
        relationship_type: &RelationshipType,
        side: Side,
    ) -> Result<Vec<RelationshipMetadataValue>, ServiceError> {
        let pairs = relationship_queries::find_by_latest_item_and_relationship_type(
            self.relationships.as_ref(),
            item.id,
            relationship_type,
            side,
        )
        .await
        .map_err(ServiceError::from_store)?;

        let key = format!(
            "{}.{}.{}",
            RELATION_SCHEMA,
            relationship_type.label(side),
            LATEST_FOR_DISCOVERY
        );
        let mut values = Vec::with_capacity(pairs.len());
        for (other_item, relationship_id) in pairs {
            if let Some(value) = self
                .construct_metadata_value(
                    &key,
                    other_item.to_string(),
                    relationship_id,
                    UNORDERED_PLACE,
                    false,
                )
                .await?
            {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Projected values contributed by one relationship to `item`
    ///
    /// Returns nothing when `item` does not sit on a side whose entity type
    /// is `entity_type`.
    pub async fn find_relationship_metadata_value_for_item_relationship(
        &self,
        item: &Item,
        entity_type: &str,
        relationship: &Relationship,
        enable_virtual_metadata: bool,
    ) -> Result<Vec<RelationshipMetadataValue>, ServiceError> {
        let relationship_type = &relationship.relationship_type;
        let side = [Side::Left, Side::Right].into_iter().find(|side| {
            relationship_type.entity_type(*side).label == entity_type
                && relationship.item(*side) == item.id
        });
        let Some(side) = side else {
            return Ok(Vec::new());
        };

        let relation_name = relationship_type.label(side);
        let place = relationship.place(side);
        let other_item_id = relationship.item(side.opposite());

        let mut values = Vec::new();
        if enable_virtual_metadata {
            if let Some(bindings) = self.populator.bindings_for(relation_name) {
                let other_item = self.item_service.get(other_item_id).await?;
                values.extend(
                    self.find_virtual_metadata_from_configuration(
                        bindings,
                        &other_item,
                        relationship,
                        side,
                        place,
                    )
                    .await?,
                );
            }
        }

        let relation_key = format!("{}.{}", RELATION_SCHEMA, relation_name);
        if let Some(value) = self
            .construct_metadata_value(
                &relation_key,
                other_item_id.to_string(),
                relationship.id,
                place,
                true,
            )
            .await?
        {
            values.push(value);
        }

        Ok(values)
    }

    async fn find_virtual_metadata_from_configuration(
        &self,
        bindings: &VirtualFieldBindings,
        other_item: &Item,
        relationship: &Relationship,
        side: Side,
        place: i32,
    ) -> Result<Vec<RelationshipMetadataValue>, ServiceError> {
        let mut values = Vec::new();
        for (key, configuration) in bindings {
            let name_variant = configuration
                .populate_with_name_variant
                .then(|| relationship.name_variant_seen_from(side))
                .flatten();

            let raw_values = match name_variant {
                Some(variant) => vec![variant.to_string()],
                None => self.evaluate(configuration, other_item).await?,
            };

            for raw in raw_values {
                if raw.trim().is_empty() {
                    continue;
                }
                if let Some(value) = self
                    .construct_metadata_value(
                        key,
                        raw,
                        relationship.id,
                        place,
                        configuration.use_for_place,
                    )
                    .await?
                {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    /// Compute the raw values of a configuration against `item`
    fn evaluate<'a>(
        &'a self,
        configuration: &'a VirtualMetadataConfiguration,
        item: &'a Item,
    ) -> ValuesFuture<'a> {
        Box::pin(async move {
            match &configuration.source {
                VirtualSource::Concatenate { fields, separator } => {
                    let parts = self.collect_values(item, fields)?;
                    if parts.is_empty() {
                        Ok(Vec::new())
                    } else {
                        Ok(vec![parts.join(separator)])
                    }
                }
                VirtualSource::Collected { fields } => self.collect_values(item, fields),
                VirtualSource::Related {
                    relationship_type,
                    place,
                    configuration,
                } => match self.find_related_item(item, relationship_type, *place).await? {
                    Some(related) => self.evaluate(configuration, &related).await,
                    None => Ok(Vec::new()),
                },
                VirtualSource::UuidValue => Ok(vec![item.id.to_string()]),
            }
        })
    }

    fn collect_values(&self, item: &Item, fields: &[String]) -> Result<Vec<String>, ServiceError> {
        let mut values = Vec::new();
        for key in fields {
            for metadata_value in self.item_service.get_metadata_by_key(item, key)? {
                if !metadata_value.value.trim().is_empty() {
                    values.push(metadata_value.value);
                }
            }
        }
        Ok(values)
    }

    /// First item reached from `item` through a relationship labelled `label`
    /// on `item`'s side, optionally at a given place
    async fn find_related_item(
        &self,
        item: &Item,
        label: &str,
        place: Option<i32>,
    ) -> Result<Option<Item>, ServiceError> {
        let relationships =
            relationship_queries::find_by_item(self.relationships.as_ref(), item.id, false)
                .await
                .map_err(ServiceError::from_store)?;

        for relationship in relationships {
            let Some(side) = relationship.side_of(item.id) else {
                continue;
            };
            if relationship.relationship_type.has_label(side, label)
                && place.map_or(true, |p| relationship.place(side) == p)
            {
                return self
                    .item_service
                    .find(relationship.item(side.opposite()))
                    .await;
            }
        }
        Ok(None)
    }

    /// Build a projected value, or `None` if the field is not registered
    async fn construct_metadata_value(
        &self,
        key: &str,
        value: String,
        relationship_id: i64,
        place: i32,
        use_for_place: bool,
    ) -> Result<Option<RelationshipMetadataValue>, ServiceError> {
        let parts: Vec<&str> = key.split('.').collect();
        let (schema, element, qualifier) = match parts.as_slice() {
            [schema, element] => (*schema, *element, None),
            [schema, element, qualifier] => (*schema, *element, Some(*qualifier)),
            _ => {
                error!("Could not build virtual metadata value: malformed field key {}", key);
                return Ok(None);
            }
        };

        let field: Option<MetadataField> = self
            .fields
            .find_field(schema, element, qualifier)
            .await
            .map_err(ServiceError::from_store)?;
        let Some(field) = field else {
            error!(
                "A MetadataValue was attempted to construct with MetadataField for parameters: \
                 metadataschema: {}, metadataelement: {}, metadataqualifier: {}",
                schema,
                element,
                qualifier.unwrap_or("null")
            );
            return Ok(None);
        };

        let authority = Relationship::virtual_authority(relationship_id);
        Ok(Some(
            RelationshipMetadataValue::new(field, value, relationship_id, authority, place)
                .with_use_for_place(use_for_place),
        ))
    }

    /// Whether the label on the given side has a `use_for_place` binding
    pub fn is_use_for_place_true_for_relationship_type(
        &self,
        relationship_type: &RelationshipType,
        is_left: bool,
    ) -> bool {
        self.populator
            .is_use_for_place(relationship_type, Side::from_is_left(is_left))
    }
}
