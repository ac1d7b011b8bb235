//! Relationship Service
//!
//! Validates, places and persists relationships between items.
//!
//! # Places
//!
//! Every relationship has a place on each side: its zero-based position
//! among the relationships held by that side's item under the same label.
//! Types sharing a label (an author may be a Person or an OrgUnit) share
//! one place sequence. When
//! no virtual metadata binding of the side's label has `use_for_place`, the
//! service keeps those places dense: each create or delete re-sorts the
//! siblings by place, renumbers them `0..n-1` and appends the new
//! relationship at `n`.
//!
//! When a binding does use the place, ordering is shared with the real
//! metadata values of the bound field. The relationship then keeps its
//! requested place (or the next free one) and the item is re-saved so its
//! derived metadata is recomputed.
//!
//! # Authorization
//!
//! Mutations require WRITE on at least one endpoint. Follow-up saves of the
//! endpoints and of related items run with authorization turned off, since
//! the change itself was already authorized.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::authorize::{Action, AuthorizeService};
use super::error::ServiceError;
use super::item_service::ItemService;
use super::places_indexing_service::RelationshipPlacesIndexingService;
use super::relationship_metadata_service::RelationshipMetadataService;
use super::relationship_queries;
use super::virtual_metadata::VirtualMetadataPopulator;
use crate::config::RelationshipSettings;
use crate::context::Context;
use crate::db::{
    DomainEvent, PlaceOrderCalculator, RelationshipStore, RelationshipTypeStore,
    RemovedRelationship, DOMAIN_EVENT_CHANNEL_CAPACITY,
};
use crate::models::{
    Item, NewRelationship, Relationship, RelationshipType, Side, CONFIDENCE_UNSET,
};

type TraversalFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send + 'a>>;

pub struct RelationshipService {
    relationships: Arc<dyn RelationshipStore>,
    relationship_types: Arc<dyn RelationshipTypeStore>,
    item_service: Arc<ItemService>,
    authorize: Arc<dyn AuthorizeService>,
    populator: Arc<VirtualMetadataPopulator>,
    metadata_service: Arc<RelationshipMetadataService>,
    places_indexing: Option<Arc<RelationshipPlacesIndexingService>>,
    settings: RelationshipSettings,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl RelationshipService {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        relationship_types: Arc<dyn RelationshipTypeStore>,
        item_service: Arc<ItemService>,
        authorize: Arc<dyn AuthorizeService>,
        populator: Arc<VirtualMetadataPopulator>,
        metadata_service: Arc<RelationshipMetadataService>,
        settings: RelationshipSettings,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Self {
            relationships,
            relationship_types,
            item_service,
            authorize,
            populator,
            metadata_service,
            places_indexing: None,
            settings,
            event_tx,
        }
    }

    /// Re-index relation places after every create and delete
    pub fn with_places_indexing(mut self, places_indexing: Arc<RelationshipPlacesIndexingService>) -> Self {
        self.places_indexing = Some(places_indexing);
        self
    }

    /// Subscribe to relationship change events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: DomainEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }

    //
    // CREATE
    //

    /// Validate, authorize, place and persist a new relationship
    ///
    /// # Errors
    ///
    /// - `InvalidRelationship` if an endpoint has the wrong entity type or
    ///   already holds the maximum number of relationships of this type;
    ///   nothing is persisted
    /// - `AuthorizationDenied` without WRITE on either endpoint
    pub async fn create(
        &self,
        context: &Context,
        new_relationship: NewRelationship,
    ) -> Result<Relationship, ServiceError> {
        let relationship = new_relationship.into_relationship();
        self.check_valid_to_create(&relationship).await?;
        self.check_write_on_either_item(context, &relationship).await?;

        let mut created = self
            .relationships
            .create_relationship(relationship)
            .await
            .map_err(ServiceError::from_store)?;
        self.update_place_in_relationship(context, &mut created).await?;
        let created = self.save(created).await?;

        self.update_items_in_relationship(context, &created).await?;
        self.index_places(context, &created).await?;

        debug!(
            "Created relationship {} ({} -> {}) at places {}/{}",
            created.id,
            created.left_item,
            created.right_item,
            created.left_place,
            created.right_place
        );
        self.emit_event(DomainEvent::RelationshipCreated(created.clone()));
        Ok(created)
    }

    /// Create a relationship from its parts
    #[allow(clippy::too_many_arguments)]
    pub async fn create_between(
        &self,
        context: &Context,
        left_item: Uuid,
        right_item: Uuid,
        relationship_type: RelationshipType,
        left_place: Option<i32>,
        right_place: Option<i32>,
        leftward_value: Option<String>,
        rightward_value: Option<String>,
    ) -> Result<Relationship, ServiceError> {
        let new_relationship = NewRelationship::new(relationship_type, left_item, right_item)
            .with_places(left_place, right_place)
            .with_name_variants(leftward_value, rightward_value);
        self.create(context, new_relationship).await
    }

    /// Assign this relationship's places and renumber its siblings
    ///
    /// The relationship itself is not saved; renumbered siblings are.
    pub async fn update_place_in_relationship(
        &self,
        context: &Context,
        relationship: &mut Relationship,
    ) -> Result<(), ServiceError> {
        let relationship_type = relationship.relationship_type.clone();
        let _bypass = context.turn_off_authorization();

        for side in [Side::Left, Side::Right] {
            let item = relationship.item(side);
            let mut siblings: Vec<Relationship> = self
                .relationships
                .find_relationships_by_item_and_type(item, &relationship_type, Some(side))
                .await
                .map_err(ServiceError::from_store)?
                .into_iter()
                .filter(|r| r.id != relationship.id)
                .collect();

            if !self.populator.is_use_for_place(&relationship_type, side) {
                let places: Vec<i32> = siblings.iter().map(|r| r.place(side)).collect();
                let order = PlaceOrderCalculator::renumbering_order(&places);
                for (place, index) in order.into_iter().enumerate() {
                    let sibling = &mut siblings[index];
                    if sibling.place(side) != place as i32 {
                        sibling.set_place(side, place as i32);
                        let saved = self.save(sibling.clone()).await?;
                        self.emit_event(DomainEvent::RelationshipUpdated(saved));
                    }
                }
                relationship.set_place(side, siblings.len() as i32);
            } else {
                let place = self
                    .handle_creation_places(relationship, side, &siblings)
                    .await?;
                relationship.set_place(side, place);
                self.update_item_by_id(context, item).await?;
            }
        }

        Ok(())
    }

    /// Place on a `use_for_place` side: the requested one, or after every
    /// existing relationship and real value of the bound fields
    async fn handle_creation_places(
        &self,
        relationship: &Relationship,
        side: Side,
        siblings: &[Relationship],
    ) -> Result<i32, ServiceError> {
        let requested = relationship.place(side);
        if requested != Relationship::APPEND_PLACE {
            return Ok(requested);
        }

        let item = self.item_service.get(relationship.item(side)).await?;
        let mut places: Vec<i32> = siblings.iter().map(|r| r.place(side)).collect();
        for key in self
            .populator
            .bound_fields(&relationship.relationship_type, side)
        {
            places.extend(
                self.item_service
                    .get_metadata_by_key(&item, key)?
                    .iter()
                    .map(|mv| mv.place),
            );
        }
        Ok(PlaceOrderCalculator::next_place(places))
    }

    /// Mark an item's metadata modified and save it
    pub async fn update_item(&self, context: &Context, mut item: Item) -> Result<Item, ServiceError> {
        item.set_metadata_modified();
        self.item_service.update(context, item).await
    }

    async fn update_item_by_id(&self, context: &Context, id: Uuid) -> Result<(), ServiceError> {
        match self.item_service.find(id).await? {
            Some(item) => {
                self.update_item(context, item).await?;
            }
            None => debug!("Skipping update of missing item {}", id),
        }
        Ok(())
    }

    //
    // VALIDATION
    //

    async fn check_valid_to_create(&self, relationship: &Relationship) -> Result<(), ServiceError> {
        let relationship_type = &relationship.relationship_type;

        for side in [Side::Left, Side::Right] {
            let item = self.item_service.get(relationship.item(side)).await?;
            let expected = &relationship_type.entity_type(side).label;
            if item.entity_type_label() != Some(expected.as_str()) {
                warn!(
                    "The relationship has been deemed invalid since the {:?} item's entity type {:?} does not match {}",
                    side,
                    item.entity_type_label(),
                    expected
                );
                self.log_relationship_type_details_for_error(relationship_type);
                return Err(ServiceError::invalid_relationship(format!(
                    "{:?} item {} is not of entity type {}",
                    side, item.id, expected
                )));
            }
        }

        for side in [Side::Left, Side::Right] {
            let Some(max) = relationship_type.max_cardinality(side) else {
                continue;
            };
            let count = self
                .relationships
                .find_relationships_by_item_and_type(
                    relationship.item(side),
                    relationship_type,
                    Some(side),
                )
                .await
                .map_err(ServiceError::from_store)?
                .iter()
                .filter(|r| r.id != relationship.id)
                .count();
            if count >= max as usize {
                warn!(
                    "The relationship has been deemed invalid since the {:?} item has more relationships than the {:?} max cardinality allows",
                    side, side
                );
                self.log_relationship_type_details_for_error(relationship_type);
                return Err(ServiceError::invalid_relationship(format!(
                    "{:?} max cardinality {} of {} reached",
                    side, max, relationship_type.leftward_type
                )));
            }
        }

        Ok(())
    }

    async fn check_valid_to_delete(&self, relationship: &Relationship) -> Result<Relationship, ServiceError> {
        if !relationship.is_persisted() {
            warn!("The relationship has been deemed invalid since the ID of the given relationship was not set");
            return Err(ServiceError::invalid_relationship("relationship has no id"));
        }

        let Some(stored) = self.find(relationship.id).await? else {
            warn!("The relationship has been deemed invalid since the relationship is not present in the store with the current ID");
            self.log_relationship_type_details_for_error(&relationship.relationship_type);
            return Err(ServiceError::invalid_relationship(format!(
                "relationship {} does not exist",
                relationship.id
            )));
        };

        let relationship_type = &stored.relationship_type;
        for side in [Side::Left, Side::Right] {
            let Some(min) = relationship_type.min_cardinality(side) else {
                continue;
            };
            let count = self
                .count_by_item_and_relationship_type(stored.item(side), relationship_type, side.is_left())
                .await?;
            if count <= min as usize {
                warn!(
                    "The relationship has been deemed invalid since the {:?} min cardinality constraint would be violated upon deletion",
                    side
                );
                self.log_relationship_type_details_for_error(relationship_type);
                return Err(ServiceError::invalid_relationship(format!(
                    "{:?} min cardinality {} of {} would be violated",
                    side, min, relationship_type.leftward_type
                )));
            }
        }

        Ok(stored)
    }

    fn log_relationship_type_details_for_error(&self, relationship_type: &RelationshipType) {
        warn!(
            "The relationshipType's ID is: {}, leftwardType: {}, rightwardType: {}, \
             leftType: {}, rightType: {}, leftMinCardinality: {:?}, leftMaxCardinality: {:?}, \
             rightMinCardinality: {:?}, rightMaxCardinality: {:?}",
            relationship_type.id,
            relationship_type.leftward_type,
            relationship_type.rightward_type,
            relationship_type.left_type.label,
            relationship_type.right_type.label,
            relationship_type.left_min_cardinality,
            relationship_type.left_max_cardinality,
            relationship_type.right_min_cardinality,
            relationship_type.right_max_cardinality
        );
    }

    async fn check_write_on_either_item(
        &self,
        context: &Context,
        relationship: &Relationship,
    ) -> Result<(), ServiceError> {
        for side in [Side::Left, Side::Right] {
            let item = self.item_service.get(relationship.item(side)).await?;
            if self
                .authorize
                .authorize_action_boolean(context, &item, Action::Write)
                .await
            {
                return Ok(());
            }
        }
        Err(ServiceError::authorization_denied(
            "You do not have write rights on this relationship's items",
        ))
    }

    //
    // QUERIES
    //

    pub async fn find(&self, id: i64) -> Result<Option<Relationship>, ServiceError> {
        self.relationships
            .get_relationship(id)
            .await
            .map_err(ServiceError::from_store)
    }

    pub async fn find_all(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Relationship>, ServiceError> {
        self.relationships
            .list_relationships(limit, offset)
            .await
            .map_err(ServiceError::from_store)
    }

    /// Relationships of an item, by leftward label then by place on the item's side
    ///
    /// With `exclude_tilted`, relationships whose type is tilted towards the
    /// opposite side are left out.
    pub async fn find_by_item(
        &self,
        item: Uuid,
        limit: Option<usize>,
        offset: usize,
        exclude_tilted: bool,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let relationships =
            relationship_queries::find_by_item(self.relationships.as_ref(), item, exclude_tilted)
                .await
                .map_err(ServiceError::from_store)?;
        Ok(relationship_queries::paginate(relationships, limit, offset))
    }

    /// Relationships of one type where `item` sits on the requested side
    pub async fn find_by_item_and_relationship_type(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        is_left: bool,
    ) -> Result<Vec<Relationship>, ServiceError> {
        self.find_by_item_and_relationship_type_paged(
            item,
            relationship_type,
            Some(Side::from_is_left(is_left)),
            None,
            0,
        )
        .await
    }

    /// Relationships of one type touching `item` on any side (or on `side`),
    /// ordered by id
    pub async fn find_by_item_and_relationship_type_paged(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        side: Option<Side>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let mut relationships = self
            .relationships
            .find_relationships_by_item_and_type(item, relationship_type, side)
            .await
            .map_err(ServiceError::from_store)?;
        relationships.sort_by_key(|r| r.id);
        Ok(relationship_queries::paginate(relationships, limit, offset))
    }

    pub async fn find_by_relationship_type(
        &self,
        relationship_type: &RelationshipType,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let mut relationships = self
            .relationships
            .find_relationships_by_type(relationship_type.id)
            .await
            .map_err(ServiceError::from_store)?;
        relationships.sort_by_key(|r| r.id);
        Ok(relationship_queries::paginate(relationships, limit, offset))
    }

    /// Relationships of every type with `type_name` as leftward or rightward label
    pub async fn find_by_type_name(
        &self,
        type_name: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let types = self
            .relationship_types
            .find_relationship_types_by_label(type_name)
            .await
            .map_err(ServiceError::from_store)?;

        let mut relationships = Vec::new();
        for relationship_type in &types {
            relationships.extend(
                self.relationships
                    .find_relationships_by_type(relationship_type.id)
                    .await
                    .map_err(ServiceError::from_store)?,
            );
        }
        relationships.sort_by_key(|r| r.id);
        Ok(relationship_queries::paginate(relationships, limit, offset))
    }

    /// `(other item, relationship id)` where `item` holds latest-version
    /// status on the requested side
    pub async fn find_by_latest_item_and_relationship_type(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        is_left: bool,
    ) -> Result<Vec<(Uuid, i64)>, ServiceError> {
        relationship_queries::find_by_latest_item_and_relationship_type(
            self.relationships.as_ref(),
            item,
            relationship_type,
            Side::from_is_left(is_left),
        )
        .await
        .map_err(ServiceError::from_store)
    }

    pub async fn count_total(&self) -> Result<usize, ServiceError> {
        self.relationships
            .count_relationships()
            .await
            .map_err(ServiceError::from_store)
    }

    pub async fn count_by_item(&self, item: Uuid) -> Result<usize, ServiceError> {
        Ok(self.find_by_item(item, None, 0, false).await?.len())
    }

    pub async fn count_by_relationship_type(
        &self,
        relationship_type: &RelationshipType,
    ) -> Result<usize, ServiceError> {
        Ok(self
            .find_by_relationship_type(relationship_type, None, 0)
            .await?
            .len())
    }

    pub async fn count_by_item_and_relationship_type(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        is_left: bool,
    ) -> Result<usize, ServiceError> {
        Ok(self
            .find_by_item_and_relationship_type(item, relationship_type, is_left)
            .await?
            .len())
    }

    pub async fn count_by_type_name(&self, type_name: &str) -> Result<usize, ServiceError> {
        Ok(self.find_by_type_name(type_name, None, 0).await?.len())
    }

    /// Next free left place over all relationships with `item` on the left
    pub async fn find_next_left_place_by_left_item(&self, item: Uuid) -> Result<i32, ServiceError> {
        self.find_next_place(item, Side::Left).await
    }

    /// Next free right place over all relationships with `item` on the right
    pub async fn find_next_right_place_by_right_item(&self, item: Uuid) -> Result<i32, ServiceError> {
        self.find_next_place(item, Side::Right).await
    }

    async fn find_next_place(&self, item: Uuid, side: Side) -> Result<i32, ServiceError> {
        let relationships = self
            .relationships
            .find_relationships_by_item(item)
            .await
            .map_err(ServiceError::from_store)?;
        Ok(PlaceOrderCalculator::next_place(
            relationships
                .iter()
                .filter(|r| r.item(side) == item)
                .map(|r| r.place(side)),
        ))
    }

    //
    // UPDATE
    //

    /// Save relationships that are still valid
    ///
    /// Each relationship needs WRITE on one endpoint. Relationships failing
    /// validation (cardinality counted without themselves) are skipped.
    /// Returns the saved relationships.
    pub async fn update(
        &self,
        context: &Context,
        relationships: Vec<Relationship>,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let mut saved = Vec::with_capacity(relationships.len());
        for relationship in relationships {
            self.check_write_on_either_item(context, &relationship)
                .await?;
            match self.check_valid_to_create(&relationship).await {
                Ok(()) => {
                    let relationship = self.save(relationship).await?;
                    self.emit_event(DomainEvent::RelationshipUpdated(relationship.clone()));
                    saved.push(relationship);
                }
                Err(ServiceError::InvalidRelationship(reason)) => {
                    debug!("Not saving relationship {}: {}", relationship.id, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(saved)
    }

    async fn save(&self, relationship: Relationship) -> Result<Relationship, ServiceError> {
        self.relationships
            .save_relationship(relationship)
            .await
            .map_err(ServiceError::from_store)
    }

    //
    // DELETE
    //

    /// Delete using the type's copy-to-left/right defaults
    pub async fn delete(&self, context: &Context, relationship: &Relationship) -> Result<(), ServiceError> {
        let relationship_type = &relationship.relationship_type;
        self.delete_with_copy(
            context,
            relationship,
            relationship_type.copy_to_left,
            relationship_type.copy_to_right,
        )
        .await
    }

    /// Delete a relationship, optionally materializing its projected values
    /// as real metadata on either endpoint first
    ///
    /// # Errors
    ///
    /// - `InvalidRelationship` if the relationship does not exist or either
    ///   side would drop to or below its min cardinality; nothing changes
    /// - `AuthorizationDenied` without WRITE on an item copied to, or on
    ///   both endpoints
    pub async fn delete_with_copy(
        &self,
        context: &Context,
        relationship: &Relationship,
        copy_to_left: bool,
        copy_to_right: bool,
    ) -> Result<(), ServiceError> {
        info!(
            "delete_relationship relationship_id={} copyMetadataValuesToLeftItem={} copyMetadataValuesToRightItem={}",
            relationship.id, copy_to_left, copy_to_right
        );
        let stored = self.check_valid_to_delete(relationship).await?;
        self.copy_to_item_permission_check(context, &stored, copy_to_left, copy_to_right)
            .await?;
        self.delete_relationship_and_copy_to_item(context, stored, copy_to_left, copy_to_right)
            .await
    }

    /// Delete without cardinality validation
    pub async fn force_delete(
        &self,
        context: &Context,
        relationship: &Relationship,
        copy_to_left: bool,
        copy_to_right: bool,
    ) -> Result<(), ServiceError> {
        info!(
            "delete_relationship relationship_id={} copyMetadataValuesToLeftItem={} copyMetadataValuesToRightItem={} force=true",
            relationship.id, copy_to_left, copy_to_right
        );
        let stored = self
            .find(relationship.id)
            .await?
            .ok_or_else(|| ServiceError::relationship_not_found(relationship.id))?;
        self.copy_to_item_permission_check(context, &stored, copy_to_left, copy_to_right)
            .await?;
        self.delete_relationship_and_copy_to_item(context, stored, copy_to_left, copy_to_right)
            .await
    }

    async fn copy_to_item_permission_check(
        &self,
        context: &Context,
        relationship: &Relationship,
        copy_to_left: bool,
        copy_to_right: bool,
    ) -> Result<(), ServiceError> {
        for (side, copy) in [(Side::Left, copy_to_left), (Side::Right, copy_to_right)] {
            if !copy {
                continue;
            }
            let item = self.item_service.get(relationship.item(side)).await?;
            if !self
                .authorize
                .authorize_action_boolean(context, &item, Action::Write)
                .await
            {
                return Err(ServiceError::authorization_denied(format!(
                    "no WRITE permission on {:?} item {} to copy metadata to",
                    side, item.id
                )));
            }
        }
        Ok(())
    }

    async fn delete_relationship_and_copy_to_item(
        &self,
        context: &Context,
        relationship: Relationship,
        copy_to_left: bool,
        copy_to_right: bool,
    ) -> Result<(), ServiceError> {
        self.copy_metadata_values(context, &relationship, copy_to_left, copy_to_right)
            .await?;
        self.check_write_on_either_item(context, &relationship)
            .await?;

        self.relationships
            .delete_relationship(relationship.id)
            .await
            .map_err(ServiceError::from_store)?;

        let mut removed = relationship.clone();
        self.update_place_in_relationship(context, &mut removed)
            .await?;
        self.update_items_in_relationship(context, &relationship)
            .await?;
        self.index_places(context, &relationship).await?;

        self.emit_event(DomainEvent::RelationshipDeleted(RemovedRelationship {
            id: relationship.id,
            relationship_type_id: relationship.relationship_type.id,
            left_item: relationship.left_item,
            right_item: relationship.right_item,
            copied_to_left: copy_to_left,
            copied_to_right: copy_to_right,
        }));
        Ok(())
    }

    /// Turn the relationship's projected values into real metadata
    async fn copy_metadata_values(
        &self,
        context: &Context,
        relationship: &Relationship,
        copy_to_left: bool,
        copy_to_right: bool,
    ) -> Result<(), ServiceError> {
        for (side, copy) in [(Side::Left, copy_to_left), (Side::Right, copy_to_right)] {
            if !copy {
                continue;
            }
            let mut item = self.item_service.get(relationship.item(side)).await?;
            let entity_type = self
                .metadata_service
                .get_entity_type_string_from_metadata(&item)
                .unwrap_or_default();
            let values = self
                .metadata_service
                .find_relationship_metadata_value_for_item_relationship(
                    &item,
                    &entity_type,
                    relationship,
                    true,
                )
                .await?;

            for value in values {
                self.item_service
                    .add_and_shift_right_metadata(
                        &mut item,
                        &value.field,
                        value.language.as_deref(),
                        &value.value,
                        None,
                        CONFIDENCE_UNSET,
                        value.place,
                    )
                    .await?;
            }
            self.item_service.update(context, item).await?;
        }
        Ok(())
    }

    //
    // RELATED ITEMS
    //

    /// Save both endpoints and the items whose virtual metadata derives from them
    ///
    /// Runs with authorization turned off. The traversal is bounded by
    /// `update_related_items_max` items and `update_related_items_max_depth` hops.
    pub async fn update_items_in_relationship(
        &self,
        context: &Context,
        relationship: &Relationship,
    ) -> Result<(), ServiceError> {
        let _bypass = context.turn_off_authorization();
        let relationship_type = &relationship.relationship_type;

        let mut items_to_update = vec![relationship.left_item, relationship.right_item];
        if self
            .populator
            .contains_virtual_metadata(&relationship_type.leftward_type)
        {
            self.find_modified_discovery_items_for_current_item(
                relationship.left_item,
                &mut items_to_update,
                0,
            )
            .await?;
        }
        if self
            .populator
            .contains_virtual_metadata(&relationship_type.rightward_type)
        {
            self.find_modified_discovery_items_for_current_item(
                relationship.right_item,
                &mut items_to_update,
                0,
            )
            .await?;
        }

        for item in items_to_update {
            match self.update_item_by_id(context, item).await {
                Ok(()) => {}
                Err(ServiceError::AuthorizationDenied(reason)) => {
                    error!("Authorization failure while authorization has been disabled: {}", reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Collect items that inherit virtual metadata from `item`
    fn find_modified_discovery_items_for_current_item<'a>(
        &'a self,
        item: Uuid,
        items_to_update: &'a mut Vec<Uuid>,
        current_depth: usize,
    ) -> TraversalFuture<'a> {
        Box::pin(async move {
            if items_to_update.len() >= self.settings.update_related_items_max {
                debug!(
                    "skipping related items of {} due to {} items to be updated",
                    item,
                    items_to_update.len()
                );
                return Ok(());
            }
            if current_depth >= self.settings.update_related_items_max_depth {
                debug!("skipping related items of {} due to {} depth", item, current_depth);
                return Ok(());
            }

            let Some(current) = self.item_service.find(item).await? else {
                return Ok(());
            };
            let Some(entity_type) = self.item_service.get_entity_type(&current).await? else {
                return Ok(());
            };
            let relationship_types = self
                .relationship_types
                .find_relationship_types_by_entity_type(&entity_type)
                .await
                .map_err(ServiceError::from_store)?;

            for relationship_type in &relationship_types {
                let side = Side::from_is_left(relationship_type.left_type.label == entity_type.label);
                // Items on the other side inherit through the label they see
                let inherited_label = relationship_type.label(side.opposite());
                if !self.populator.contains_virtual_metadata(inherited_label) {
                    debug!(
                        "skipping relationship type {} for item {} because no relevant virtual metadata was found",
                        relationship_type.id, item
                    );
                    continue;
                }

                let found = self
                    .relationships
                    .find_relationships_by_item_and_type(item, relationship_type, Some(side))
                    .await
                    .map_err(ServiceError::from_store)?;
                for relationship in found {
                    let next_item = relationship.item(side.opposite());
                    if !items_to_update.contains(&next_item) {
                        items_to_update.push(next_item);
                        self.find_modified_discovery_items_for_current_item(
                            next_item,
                            items_to_update,
                            current_depth + 1,
                        )
                        .await?;
                    }
                }
            }
            Ok(())
        })
    }

    async fn index_places(&self, context: &Context, relationship: &Relationship) -> Result<(), ServiceError> {
        if let Some(places_indexing) = &self.places_indexing {
            places_indexing
                .update_relation_references(context, relationship)
                .await?;
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ItemStore, MemoryStore};
    use crate::models::{EntityType, Tilted};
    use crate::services::authorize::PolicyAuthorizeService;

    fn author_type() -> RelationshipType {
        RelationshipType {
            id: 1,
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

    async fn create_test_service() -> (RelationshipService, MemoryStore) {
        let store = MemoryStore::new();
        store.create_entity_type("Publication").await.unwrap();
        store.create_entity_type("Person").await.unwrap();
        store.create_relationship_type(author_type()).await.unwrap();

        let authorize: Arc<dyn AuthorizeService> = Arc::new(PolicyAuthorizeService::new());
        let populator = Arc::new(VirtualMetadataPopulator::default());
        let item_service = Arc::new(ItemService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            authorize.clone(),
        ));
        let metadata_service = Arc::new(RelationshipMetadataService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            item_service.clone(),
            populator.clone(),
        ));
        let service = RelationshipService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            item_service,
            authorize,
            populator,
            metadata_service,
            RelationshipSettings::default(),
        );
        (service, store)
    }

    async fn create_item(store: &MemoryStore, entity_type: &str) -> Item {
        let mut item = Item::new();
        item.add_metadata("dspace.entity.type", entity_type).unwrap();
        store.create_item(item).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_closes_gaps_between_siblings() {
        let (service, store) = create_test_service().await;
        let publication = create_item(&store, "Publication").await;
        let context = Context::anonymous();
        let _bypass = context.turn_off_authorization();

        // Siblings written with gaps and out of creation order
        let mut existing = Vec::new();
        for place in [5, 2] {
            let person = create_item(&store, "Person").await;
            let relationship = NewRelationship::new(author_type(), publication.id, person.id)
                .with_places(Some(place), Some(0))
                .into_relationship();
            existing.push(store.create_relationship(relationship).await.unwrap());
        }

        let person = create_item(&store, "Person").await;
        let created = service
            .create(
                &context,
                NewRelationship::new(author_type(), publication.id, person.id),
            )
            .await
            .unwrap();

        assert_eq!(created.left_place, 2);
        let first = service.find(existing[0].id).await.unwrap().unwrap();
        let second = service.find(existing[1].id).await.unwrap().unwrap();
        assert_eq!(first.left_place, 1);
        assert_eq!(second.left_place, 0);
    }

    #[tokio::test]
    async fn test_update_place_does_not_save_the_relationship() {
        let (service, store) = create_test_service().await;
        let publication = create_item(&store, "Publication").await;
        let person = create_item(&store, "Person").await;
        let context = Context::anonymous();

        let mut relationship =
            NewRelationship::new(author_type(), publication.id, person.id).into_relationship();
        service
            .update_place_in_relationship(&context, &mut relationship)
            .await
            .unwrap();

        assert_eq!((relationship.left_place, relationship.right_place), (0, 0));
        assert_eq!(service.count_total().await.unwrap(), 0);
        assert!(!context.ignores_authorization());
    }

    #[tokio::test]
    async fn test_update_requires_write() {
        let (service, store) = create_test_service().await;
        let publication = create_item(&store, "Publication").await;
        let person = create_item(&store, "Person").await;
        let relationship = store
            .create_relationship(
                NewRelationship::new(author_type(), publication.id, person.id)
                    .with_places(Some(0), Some(0))
                    .into_relationship(),
            )
            .await
            .unwrap();

        let err = service
            .update(&Context::anonymous(), vec![relationship])
            .await
            .unwrap_err();

        assert!(err.is_authorization_denied());
    }
}
