//! Entity Types and Relationship Types
//!
//! A `RelationshipType` declares that items of one entity type may be related
//! to items of another, e.g. Publication `isAuthorOfPublication` Person. The
//! leftward/rightward labels double as the element of the `relation.*`
//! metadata fields projected onto each side.
//!
//! ## Cardinality
//!
//! Each side carries optional min/max bounds on how many relationships of
//! this type an item on that side may hold. `None` is unbounded; a max of
//! `Some(0)` is also treated as unbounded.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// A named entity type such as "Publication" or "Person"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    pub id: i64,
    pub label: String,
}

impl EntityType {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Fan-out hint for relationship types with a very large side
///
/// A type tilted `Right` expects many right items per left item; the left
/// item then neither displays nor indexes those relationships.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tilted {
    #[default]
    None,
    Left,
    Right,
}

/// Side of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn from_is_left(is_left: bool) -> Self {
        if is_left {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn is_left(self) -> bool {
        self == Side::Left
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// An allowed edge type between two entity types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipType {
    pub id: i64,
    pub left_type: EntityType,
    pub right_type: EntityType,
    /// Label seen from the left item, e.g. "isAuthorOfPublication"
    pub leftward_type: String,
    /// Label seen from the right item, e.g. "isPublicationOfAuthor"
    pub rightward_type: String,
    #[serde(default)]
    pub left_min_cardinality: Option<u32>,
    #[serde(default)]
    pub left_max_cardinality: Option<u32>,
    #[serde(default)]
    pub right_min_cardinality: Option<u32>,
    #[serde(default)]
    pub right_max_cardinality: Option<u32>,
    /// Default for copying virtual metadata to the left item on delete
    #[serde(default)]
    pub copy_to_left: bool,
    /// Default for copying virtual metadata to the right item on delete
    #[serde(default)]
    pub copy_to_right: bool,
    #[serde(default)]
    pub tilted: Tilted,
}

impl RelationshipType {
    /// Label used for the given side
    pub fn label(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.leftward_type,
            Side::Right => &self.rightward_type,
        }
    }

    pub fn entity_type(&self, side: Side) -> &EntityType {
        match side {
            Side::Left => &self.left_type,
            Side::Right => &self.right_type,
        }
    }

    pub fn min_cardinality(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.left_min_cardinality,
            Side::Right => self.right_min_cardinality,
        }
    }

    /// Effective max cardinality; `Some(0)` collapses to unbounded
    pub fn max_cardinality(&self, side: Side) -> Option<u32> {
        let max = match side {
            Side::Left => self.left_max_cardinality,
            Side::Right => self.right_max_cardinality,
        };
        max.filter(|m| *m > 0)
    }

    /// Whether this type has the given label on the given side
    pub fn has_label(&self, side: Side, label: &str) -> bool {
        self.label(side) == label
    }

    /// Check internal consistency of the declared bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.leftward_type.trim().is_empty() || self.rightward_type.trim().is_empty() {
            return Err(ValidationError::InvalidRelationshipType(
                "leftward and rightward labels must not be empty".to_string(),
            ));
        }
        for side in [Side::Left, Side::Right] {
            if let (Some(min), Some(max)) = (self.min_cardinality(side), self.max_cardinality(side))
            {
                if min > max {
                    return Err(ValidationError::InvalidCardinality(format!(
                        "{:?} min cardinality {} exceeds max cardinality {} for '{}'",
                        side, min, max, self.leftward_type
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author_type() -> RelationshipType {
        RelationshipType {
            id: 1,
            left_type: EntityType::new(1, "Publication"),
            right_type: EntityType::new(2, "Person"),
            leftward_type: "isAuthorOfPublication".to_string(),
            rightward_type: "isPublicationOfAuthor".to_string(),
            left_min_cardinality: None,
            left_max_cardinality: Some(0),
            right_min_cardinality: Some(1),
            right_max_cardinality: Some(3),
            copy_to_left: false,
            copy_to_right: false,
            tilted: Tilted::None,
        }
    }

    #[test]
    fn test_zero_max_cardinality_is_unbounded() {
        let rt = author_type();
        assert_eq!(rt.max_cardinality(Side::Left), None);
        assert_eq!(rt.max_cardinality(Side::Right), Some(3));
    }

    #[test]
    fn test_side_accessors() {
        let rt = author_type();
        assert_eq!(rt.label(Side::Left), "isAuthorOfPublication");
        assert_eq!(rt.label(Side::Right), "isPublicationOfAuthor");
        assert_eq!(rt.entity_type(Side::Right).label, "Person");
        assert_eq!(Side::Left.opposite(), Side::Right);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut rt = author_type();
        assert!(rt.validate().is_ok());

        rt.right_min_cardinality = Some(5);
        assert!(rt.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let rt: RelationshipType = serde_json::from_value(serde_json::json!({
            "id": 7,
            "leftType": { "id": 1, "label": "JournalIssue" },
            "rightType": { "id": 2, "label": "JournalVolume" },
            "leftwardType": "isJournalVolumeOfIssue",
            "rightwardType": "isIssueOfJournalVolume"
        }))
        .unwrap();

        assert_eq!(rt.tilted, Tilted::None);
        assert!(rt.left_max_cardinality.is_none());
        assert!(!rt.copy_to_left);
    }
}
