//! Relationship Instances
//!
//! A `Relationship` connects a left item to a right item under a
//! [`RelationshipType`]. Items are referenced by UUID only; all navigation
//! goes through the stores and services, never through mutual pointers.
//!
//! Each side carries a zero-based `place`: the relationship's position among
//! the same item's relationships with the same label on that side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::relationship_type::{RelationshipType, Side};

/// Prefix of the authority attached to every projected value
pub const VIRTUAL_AUTHORITY_PREFIX: &str = "virtual::";

/// Which endpoints of a relationship are the latest version of their item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatestVersionStatus {
    #[default]
    Both,
    LeftOnly,
    RightOnly,
}

impl LatestVersionStatus {
    /// Whether the item on `side` holds latest-version status
    pub fn is_latest_on(self, side: Side) -> bool {
        match (self, side) {
            (LatestVersionStatus::Both, _) => true,
            (LatestVersionStatus::LeftOnly, Side::Left) => true,
            (LatestVersionStatus::RightOnly, Side::Right) => true,
            _ => false,
        }
    }
}

/// A persisted edge between two items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Store-assigned identifier; 0 until persisted
    pub id: i64,
    pub relationship_type: RelationshipType,
    pub left_item: Uuid,
    pub right_item: Uuid,
    pub left_place: i32,
    pub right_place: i32,
    /// Name variant of the left item, displayed on the right item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leftward_value: Option<String>,
    /// Name variant of the right item, displayed on the left item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rightward_value: Option<String>,
    #[serde(default)]
    pub latest_version_status: LatestVersionStatus,
}

impl Relationship {
    pub const UNSAVED_ID: i64 = 0;

    /// Requested place meaning "after the existing relationships"
    pub const APPEND_PLACE: i32 = i32::MAX;

    pub fn is_persisted(&self) -> bool {
        self.id != Self::UNSAVED_ID
    }

    pub fn item(&self, side: Side) -> Uuid {
        match side {
            Side::Left => self.left_item,
            Side::Right => self.right_item,
        }
    }

    pub fn place(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.left_place,
            Side::Right => self.right_place,
        }
    }

    pub fn set_place(&mut self, side: Side, place: i32) {
        match side {
            Side::Left => self.left_place = place,
            Side::Right => self.right_place = place,
        }
    }

    /// Side occupied by `item`, preferring left for self-relationships
    pub fn side_of(&self, item: Uuid) -> Option<Side> {
        if self.left_item == item {
            Some(Side::Left)
        } else if self.right_item == item {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Name variant displayed on the item at `side` for the opposite item
    pub fn name_variant_seen_from(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.rightward_value.as_deref(),
            Side::Right => self.leftward_value.as_deref(),
        }
    }

    /// Authority string tying projected values back to a relationship
    pub fn virtual_authority(relationship_id: i64) -> String {
        format!("{}{}", VIRTUAL_AUTHORITY_PREFIX, relationship_id)
    }
}

/// Parameters for creating a relationship
///
/// A `None` place appends the relationship after the item's existing ones.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub relationship_type: RelationshipType,
    pub left_item: Uuid,
    pub right_item: Uuid,
    pub left_place: Option<i32>,
    pub right_place: Option<i32>,
    pub leftward_value: Option<String>,
    pub rightward_value: Option<String>,
    pub latest_version_status: LatestVersionStatus,
}

impl NewRelationship {
    pub fn new(relationship_type: RelationshipType, left_item: Uuid, right_item: Uuid) -> Self {
        Self {
            relationship_type,
            left_item,
            right_item,
            left_place: None,
            right_place: None,
            leftward_value: None,
            rightward_value: None,
            latest_version_status: LatestVersionStatus::Both,
        }
    }

    pub fn with_name_variants(
        mut self,
        leftward_value: Option<String>,
        rightward_value: Option<String>,
    ) -> Self {
        self.leftward_value = leftward_value;
        self.rightward_value = rightward_value;
        self
    }

    pub fn with_places(mut self, left_place: Option<i32>, right_place: Option<i32>) -> Self {
        self.left_place = left_place;
        self.right_place = right_place;
        self
    }

    pub fn with_latest_version_status(mut self, status: LatestVersionStatus) -> Self {
        self.latest_version_status = status;
        self
    }

    /// Unsaved relationship; unset places become [`Relationship::APPEND_PLACE`]
    pub fn into_relationship(self) -> Relationship {
        Relationship {
            id: Relationship::UNSAVED_ID,
            relationship_type: self.relationship_type,
            left_item: self.left_item,
            right_item: self.right_item,
            left_place: self.left_place.unwrap_or(Relationship::APPEND_PLACE),
            right_place: self.right_place.unwrap_or(Relationship::APPEND_PLACE),
            leftward_value: self.leftward_value,
            rightward_value: self.rightward_value,
            latest_version_status: self.latest_version_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_status_per_side() {
        assert!(LatestVersionStatus::Both.is_latest_on(Side::Left));
        assert!(LatestVersionStatus::Both.is_latest_on(Side::Right));
        assert!(LatestVersionStatus::LeftOnly.is_latest_on(Side::Left));
        assert!(!LatestVersionStatus::LeftOnly.is_latest_on(Side::Right));
        assert!(LatestVersionStatus::RightOnly.is_latest_on(Side::Right));
        assert!(!LatestVersionStatus::RightOnly.is_latest_on(Side::Left));
    }

    #[test]
    fn test_name_variant_comes_from_the_other_side() {
        let rt = crate::models::RelationshipType {
            id: 1,
            left_type: crate::models::EntityType::new(1, "Publication"),
            right_type: crate::models::EntityType::new(2, "Person"),
            leftward_type: "isAuthorOfPublication".to_string(),
            rightward_type: "isPublicationOfAuthor".to_string(),
            left_min_cardinality: None,
            left_max_cardinality: None,
            right_min_cardinality: None,
            right_max_cardinality: None,
            copy_to_left: false,
            copy_to_right: false,
            tilted: crate::models::Tilted::None,
        };
        let relationship = NewRelationship::new(rt, Uuid::new_v4(), Uuid::new_v4())
            .with_name_variants(None, Some("J. Smith".to_string()))
            .into_relationship();

        assert_eq!(relationship.name_variant_seen_from(Side::Left), Some("J. Smith"));
        assert_eq!(relationship.name_variant_seen_from(Side::Right), None);
        assert_eq!(relationship.left_place, Relationship::APPEND_PLACE);
    }

    #[test]
    fn test_virtual_authority() {
        assert_eq!(Relationship::virtual_authority(42), "virtual::42");
    }

    #[test]
    fn test_latest_status_wire_format() {
        let json = serde_json::to_value(LatestVersionStatus::LeftOnly).unwrap();
        assert_eq!(json, "LEFT_ONLY");
    }
}
