//! Virtual metadata bindings
//!
//! A relationship label (e.g. `isAuthorOfPublication`) can be bound to one or
//! more metadata fields that are computed from the item on the other end of
//! the relationship. The bindings are read-only configuration:
//!
//! ```json
//! {
//!   "isAuthorOfPublication": {
//!     "dc.contributor.author": {
//!       "type": "concatenate",
//!       "fields": ["person.familyName", "person.givenName"],
//!       "separator": ", ",
//!       "useForPlace": true,
//!       "populateWithNameVariant": true
//!     }
//!   }
//! }
//! ```
//!
//! Evaluation of a configuration against an item lives in
//! [`RelationshipMetadataService`](super::RelationshipMetadataService), since
//! `related` configurations follow further relationships.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{RelationshipType, Side};

/// Field key to configuration, for one relationship label
pub type VirtualFieldBindings = BTreeMap<String, VirtualMetadataConfiguration>;

/// Relationship label to its field bindings
pub type VirtualMetadataBindings = BTreeMap<String, VirtualFieldBindings>;

/// How a virtual field's values are derived from the related item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VirtualSource {
    /// All non-blank values of `fields` joined into a single value
    #[serde(rename_all = "camelCase")]
    Concatenate {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },

    /// Every non-blank value of `fields`, one projected value each
    Collected { fields: Vec<String> },

    /// Follow one more relationship labelled `relationship_type` from the
    /// related item and evaluate `configuration` on the item found there
    #[serde(rename_all = "camelCase")]
    Related {
        relationship_type: String,
        #[serde(default)]
        place: Option<i32>,
        configuration: Box<VirtualMetadataConfiguration>,
    },

    /// The related item's UUID
    UuidValue,
}

fn default_separator() -> String {
    ", ".to_string()
}

/// A configured virtual field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMetadataConfiguration {
    #[serde(flatten)]
    pub source: VirtualSource,

    /// Projected values take part in the field's place ordering
    #[serde(default)]
    pub use_for_place: bool,

    /// Prefer the relationship's stored name variant over computed values
    #[serde(default)]
    pub populate_with_name_variant: bool,
}

impl VirtualMetadataConfiguration {
    pub fn new(source: VirtualSource) -> Self {
        Self {
            source,
            use_for_place: false,
            populate_with_name_variant: false,
        }
    }

    pub fn concatenate<S: Into<String>>(fields: impl IntoIterator<Item = S>, separator: &str) -> Self {
        Self::new(VirtualSource::Concatenate {
            fields: fields.into_iter().map(Into::into).collect(),
            separator: separator.to_string(),
        })
    }

    pub fn collected<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::new(VirtualSource::Collected {
            fields: fields.into_iter().map(Into::into).collect(),
        })
    }

    pub fn related(
        relationship_type: impl Into<String>,
        place: Option<i32>,
        configuration: VirtualMetadataConfiguration,
    ) -> Self {
        Self::new(VirtualSource::Related {
            relationship_type: relationship_type.into(),
            place,
            configuration: Box::new(configuration),
        })
    }

    pub fn uuid_value() -> Self {
        Self::new(VirtualSource::UuidValue)
    }

    pub fn with_use_for_place(mut self, use_for_place: bool) -> Self {
        self.use_for_place = use_for_place;
        self
    }

    pub fn with_name_variant(mut self, populate_with_name_variant: bool) -> Self {
        self.populate_with_name_variant = populate_with_name_variant;
        self
    }
}

/// Read-only lookup over the configured bindings
#[derive(Debug, Clone, Default)]
pub struct VirtualMetadataPopulator {
    bindings: VirtualMetadataBindings,
}

impl VirtualMetadataPopulator {
    pub fn new(bindings: VirtualMetadataBindings) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &VirtualMetadataBindings {
        &self.bindings
    }

    /// Field bindings for a relationship label
    pub fn bindings_for(&self, label: &str) -> Option<&VirtualFieldBindings> {
        self.bindings.get(label)
    }

    /// Whether any field is bound for `label`
    pub fn contains_virtual_metadata(&self, label: &str) -> bool {
        self.bindings_for(label)
            .map(|fields| !fields.is_empty())
            .unwrap_or(false)
    }

    /// Whether the label used on `side` has a binding with `use_for_place`
    pub fn is_use_for_place(&self, relationship_type: &RelationshipType, side: Side) -> bool {
        self.bindings_for(relationship_type.label(side))
            .map(|fields| fields.values().any(|config| config.use_for_place))
            .unwrap_or(false)
    }

    /// Field keys bound for the label used on `side`
    pub fn bound_fields(&self, relationship_type: &RelationshipType, side: Side) -> Vec<&str> {
        self.bindings_for(relationship_type.label(side))
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
