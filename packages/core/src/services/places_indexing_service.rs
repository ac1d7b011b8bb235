//! Relationship Places Indexing Service
//!
//! After a relationship changes, rebuilds the `relation.<label>` index field
//! of every item whose ordered list of related items may have changed.
//!
//! # Single-direction types
//!
//! A type whose leftward label is listed in `placesOnlyLeft` only tracks
//! places on the left item (and symmetrically for `placesOnlyRight`). Items
//! on the untracked side then index each related item repeatedly, weighted
//! by its place on the tracked side, so that a search ordering on the field
//! favours the relationships the other item lists first.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error::ServiceError;
use super::indexing::IndexingService;
use crate::config::RelationshipSettings;
use crate::context::Context;
use crate::db::{PlaceOrderCalculator, RelationshipStore};
use crate::models::{Relationship, RelationshipType, Side, RELATION_SCHEMA};

pub struct RelationshipPlacesIndexingService {
    relationships: Arc<dyn RelationshipStore>,
    indexing: Arc<dyn IndexingService>,
    places_only_left: HashSet<String>,
    places_only_right: HashSet<String>,
}

impl RelationshipPlacesIndexingService {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        indexing: Arc<dyn IndexingService>,
        settings: &RelationshipSettings,
    ) -> Self {
        Self {
            relationships,
            indexing,
            places_only_left: settings.places_only_left.iter().cloned().collect(),
            places_only_right: settings.places_only_right.iter().cloned().collect(),
        }
    }

    /// Whether only `side` tracks places for this type
    pub fn single_direction_relationship(&self, side: Side, relationship_type: &RelationshipType) -> bool {
        let configured = match side {
            Side::Left => &self.places_only_left,
            Side::Right => &self.places_only_right,
        };
        configured.contains(&relationship_type.leftward_type)
    }

    /// Rebuild the index fields affected by a change to `relationship`
    pub async fn update_relation_references(
        &self,
        context: &Context,
        relationship: &Relationship,
    ) -> Result<(), ServiceError> {
        let relationship_type = &relationship.relationship_type;
        let mut left_items = vec![relationship.left_item];
        let mut right_items = vec![relationship.right_item];

        // Untracked-side neighbours are weighted by places on the tracked side
        if self.single_direction_relationship(Side::Left, relationship_type) {
            for sibling in self
                .siblings(relationship.left_item, relationship_type, Side::Left)
                .await?
            {
                push_unique(&mut right_items, sibling.right_item);
            }
        }
        if self.single_direction_relationship(Side::Right, relationship_type) {
            for sibling in self
                .siblings(relationship.right_item, relationship_type, Side::Right)
                .await?
            {
                push_unique(&mut left_items, sibling.left_item);
            }
        }

        debug!(
            "Reindexing {} left and {} right items for relationship {} (principal {:?})",
            left_items.len(),
            right_items.len(),
            relationship.id,
            context.principal()
        );

        for item in left_items {
            self.update_index(item, relationship_type, Side::Left).await?;
        }
        for item in right_items {
            self.update_index(item, relationship_type, Side::Right).await?;
        }
        Ok(())
    }

    async fn siblings(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        side: Side,
    ) -> Result<Vec<Relationship>, ServiceError> {
        let mut relationships = self
            .relationships
            .find_relationships_by_item_and_type(item, relationship_type, Some(side))
            .await
            .map_err(ServiceError::from_store)?;
        relationships.sort_by_key(|r| r.place(side));
        Ok(relationships)
    }

    async fn update_index(
        &self,
        item: Uuid,
        relationship_type: &RelationshipType,
        side: Side,
    ) -> Result<(), ServiceError> {
        let opposite = side.opposite();
        let weighted = self.single_direction_relationship(opposite, relationship_type);

        let mut values = Vec::new();
        for relationship in self.siblings(item, relationship_type, side).await? {
            let other_item = relationship.item(opposite);
            let copies = if weighted {
                let count = self
                    .siblings(other_item, relationship_type, opposite)
                    .await?
                    .len();
                PlaceOrderCalculator::weight(count, relationship.place(opposite))
            } else {
                1
            };
            values.extend(std::iter::repeat(other_item.to_string()).take(copies));
        }

        let field = format!("{}.{}", RELATION_SCHEMA, relationship_type.label(side));
        self.indexing
            .update_relation_for_item(item, &field, values)
            .await
            .map_err(ServiceError::from_store)
    }
}

fn push_unique(items: &mut Vec<Uuid>, item: Uuid) {
    if !items.contains(&item) {
        items.push(item);
    }
}
