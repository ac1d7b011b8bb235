//! Projected (virtual) metadata values
//!
//! These values look like [`MetadataValue`](super::MetadataValue)s but are
//! generated on demand from relationships. They are never persisted and carry
//! no identity beyond the request that produced them.

use serde::{Deserialize, Serialize};

use super::metadata::{MetadataField, MetadataValue, CONFIDENCE_UNSET};

/// Schema of the `relation.*` fields
pub const RELATION_SCHEMA: &str = "relation";

/// Qualifier of the discovery-only projection of latest-version relations
pub const LATEST_FOR_DISCOVERY: &str = "latestForDiscovery";

/// Confidence of every projected value
pub const CONFIDENCE_ACCEPTED: i32 = 600;

/// Place of values that are not ordered among their field
pub const UNORDERED_PLACE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipMetadataValue {
    pub field: MetadataField,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub authority: String,
    pub confidence: i32,
    pub place: i32,
    /// Whether this value takes part in the field's place ordering
    #[serde(default)]
    pub use_for_place: bool,
    pub relationship_id: i64,
}

impl RelationshipMetadataValue {
    pub fn new(
        field: MetadataField,
        value: impl Into<String>,
        relationship_id: i64,
        authority: impl Into<String>,
        place: i32,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            language: None,
            authority: authority.into(),
            confidence: CONFIDENCE_ACCEPTED,
            place,
            use_for_place: false,
            relationship_id,
        }
    }

    pub fn with_use_for_place(mut self, use_for_place: bool) -> Self {
        self.use_for_place = use_for_place;
        self
    }

    /// Convert into a plain value, dropping the virtual authority
    pub fn into_plain_value(self) -> MetadataValue {
        MetadataValue {
            field: self.field,
            value: self.value,
            language: self.language,
            authority: None,
            confidence: CONFIDENCE_UNSET,
            place: self.place,
        }
    }
}
