//! Domain Events for the relationship services
//!
//! This module defines the domain events emitted when relationships or items
//! change. Events follow the observer pattern so that indexers, caches or
//! audit sinks can react to changes without coupling to the services.
//!
//! # Architecture
//!
//! Events are emitted using tokio's broadcast channel, allowing multiple
//! subscribers to receive notifications asynchronously. Sending never fails
//! the originating operation; with no subscribers the event is dropped.
//!
//! # Event Flow
//!
//! 1. A service completes a mutation (create, update, delete)
//! 2. The domain event is emitted via the broadcast channel
//! 3. All subscribers receive the event asynchronously

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Relationship;

/// Capacity of the broadcast channels carrying domain events
pub const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Summary of a removed relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedRelationship {
    pub id: i64,
    pub relationship_type_id: i64,
    pub left_item: Uuid,
    pub right_item: Uuid,
    pub copied_to_left: bool,
    pub copied_to_right: bool,
}

/// Domain events emitted by the relationship and item services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new relationship was created and placed
    RelationshipCreated(Relationship),

    /// An existing relationship was saved (places or name variants changed)
    RelationshipUpdated(Relationship),

    /// A relationship was deleted
    RelationshipDeleted(RemovedRelationship),

    /// An item was saved with its metadata marked modified
    ItemUpdated { id: Uuid },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::RelationshipCreated(_) => "relationship:created",
            DomainEvent::RelationshipUpdated(_) => "relationship:updated",
            DomainEvent::RelationshipDeleted(_) => "relationship:deleted",
            DomainEvent::ItemUpdated { .. } => "item:updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: the tag field is merged with the payload fields
    #[test]
    fn test_relationship_deleted_serialization_contract() {
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();
        let event = DomainEvent::RelationshipDeleted(RemovedRelationship {
            id: 12,
            relationship_type_id: 3,
            left_item: left,
            right_item: right,
            copied_to_left: true,
            copied_to_right: false,
        });

        let parsed = serde_json::to_value(&event).unwrap();

        assert_eq!(parsed.get("type").unwrap(), "relationshipDeleted");
        assert_eq!(parsed.get("id").unwrap(), 12);
        assert_eq!(parsed.get("relationshipTypeId").unwrap(), 3);
        assert_eq!(parsed.get("leftItem").unwrap(), &left.to_string());
        assert_eq!(parsed.get("copiedToLeft").unwrap(), true);
        assert_eq!(event.event_type(), "relationship:deleted");
    }

    #[test]
    fn test_item_updated_event_type() {
        let event = DomainEvent::ItemUpdated { id: Uuid::new_v4() };
        assert_eq!(event.event_type(), "item:updated");

        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed.get("type").unwrap(), "itemUpdated");
    }
}
