//! Metadata Field and Value Types
//!
//! Items describe themselves through ordered metadata values. Each value is
//! bound to a field addressed as `schema.element[.qualifier]`, for example
//! `dc.contributor.author` or `person.familyName`.
//!
//! # Wildcards
//!
//! Lookups accept [`ANY`] (`*`) in place of a qualifier or language to match
//! every value regardless of that component. A `None` qualifier only matches
//! unqualified fields.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::ValidationError;

/// Wildcard accepted by metadata lookups for qualifier and language
pub const ANY: &str = "*";

/// Separator between schema, element and qualifier
pub const FIELD_SEPARATOR: char = '.';

/// Confidence recorded on values that carry no authority confidence
pub const CONFIDENCE_UNSET: i32 = -1;

// Field components are plain identifiers ("dc", "contributor", "familyName")
const FIELD_COMPONENT_PATTERN: &str = r"^[A-Za-z0-9_\-]+$";

fn field_component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FIELD_COMPONENT_PATTERN).expect("valid field component pattern"))
}

/// A metadata field: `schema.element[.qualifier]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataField {
    pub schema: String,
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl MetadataField {
    pub fn new(
        schema: impl Into<String>,
        element: impl Into<String>,
        qualifier: Option<&str>,
    ) -> Self {
        Self {
            schema: schema.into(),
            element: element.into(),
            qualifier: qualifier.map(str::to_string),
        }
    }

    /// Parse a dotted field key such as `dc.contributor.author`
    ///
    /// # Examples
    ///
    /// ```
    /// use relata_core::models::MetadataField;
    ///
    /// let field = MetadataField::parse("dc.contributor.author").unwrap();
    /// assert_eq!(field.schema, "dc");
    /// assert_eq!(field.qualifier.as_deref(), Some("author"));
    ///
    /// assert!(MetadataField::parse("dc").is_err());
    /// assert!(MetadataField::parse("dc..author").is_err());
    /// ```
    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = key.trim().split(FIELD_SEPARATOR).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(ValidationError::InvalidField(format!(
                "'{}' must have the form schema.element[.qualifier]",
                key
            )));
        }

        for part in &parts {
            if !field_component_regex().is_match(part) {
                return Err(ValidationError::InvalidField(format!(
                    "'{}' contains an empty or malformed component",
                    key
                )));
            }
        }

        Ok(Self::new(parts[0], parts[1], parts.get(2).copied()))
    }

    /// Whether this field matches a lookup triple
    ///
    /// `qualifier` of `Some("*")` matches any qualifier; `None` only matches
    /// unqualified fields.
    pub fn matches(&self, schema: &str, element: &str, qualifier: Option<&str>) -> bool {
        if self.schema != schema || self.element != element {
            return false;
        }
        match qualifier {
            Some(ANY) => true,
            Some(q) => self.qualifier.as_deref() == Some(q),
            None => self.qualifier.is_none(),
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}.{}", self.schema, self.element, qualifier),
            None => write!(f, "{}.{}", self.schema, self.element),
        }
    }
}

/// A persisted metadata value on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataValue {
    pub field: MetadataField,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: i32,
    /// Position among the item's values of the same field
    #[serde(default)]
    pub place: i32,
}

fn default_confidence() -> i32 {
    CONFIDENCE_UNSET
}

impl MetadataValue {
    pub fn new(field: MetadataField, value: impl Into<String>, place: i32) -> Self {
        Self {
            field,
            value: value.into(),
            language: None,
            authority: None,
            confidence: CONFIDENCE_UNSET,
            place,
        }
    }

    /// Whether the value's language matches a lookup language (`*` matches all)
    pub fn matches_language(&self, language: Option<&str>) -> bool {
        match language {
            Some(ANY) => true,
            Some(lang) => self.language.as_deref() == Some(lang),
            None => self.language.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_and_three_part_keys() {
        let field = MetadataField::parse("person.familyName").unwrap();
        assert_eq!(field.schema, "person");
        assert_eq!(field.element, "familyName");
        assert!(field.qualifier.is_none());
        assert_eq!(field.to_string(), "person.familyName");

        let field = MetadataField::parse("relation.isAuthorOfPublication.latestForDiscovery").unwrap();
        assert_eq!(field.qualifier.as_deref(), Some("latestForDiscovery"));
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert!(MetadataField::parse("").is_err());
        assert!(MetadataField::parse("dc").is_err());
        assert!(MetadataField::parse("dc.contributor.author.extra").is_err());
        assert!(MetadataField::parse(".contributor").is_err());
        assert!(MetadataField::parse("dc.contrib utor").is_err());
    }

    #[test]
    fn test_qualifier_matching() {
        let author = MetadataField::new("dc", "contributor", Some("author"));
        let plain = MetadataField::new("dc", "contributor", None);

        assert!(author.matches("dc", "contributor", Some("author")));
        assert!(author.matches("dc", "contributor", Some(ANY)));
        assert!(!author.matches("dc", "contributor", None));
        assert!(plain.matches("dc", "contributor", None));
        assert!(plain.matches("dc", "contributor", Some(ANY)));
        assert!(!plain.matches("dc", "title", Some(ANY)));
    }

    #[test]
    fn test_language_matching() {
        let mut value = MetadataValue::new(MetadataField::new("dc", "title", None), "Title", 0);
        assert!(value.matches_language(None));
        assert!(value.matches_language(Some(ANY)));
        assert!(!value.matches_language(Some("en")));

        value.language = Some("en".to_string());
        assert!(value.matches_language(Some("en")));
        assert!(!value.matches_language(None));
    }
}
