//! Item Service
//!
//! Reads and writes item metadata on behalf of the relationship services.
//! Only real (persisted) metadata is handled here; projected values come from
//! [`RelationshipMetadataService`](super::RelationshipMetadataService).

use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::authorize::{Action, AuthorizeService};
use super::error::ServiceError;
use crate::context::Context;
use crate::db::{
    DomainEvent, ItemStore, MetadataFieldStore, RelationshipTypeStore,
    DOMAIN_EVENT_CHANNEL_CAPACITY,
};
use crate::models::{EntityType, Item, MetadataField, MetadataValue, ValidationError, ANY};

pub struct ItemService {
    items: Arc<dyn ItemStore>,
    fields: Arc<dyn MetadataFieldStore>,
    relationship_types: Arc<dyn RelationshipTypeStore>,
    authorize: Arc<dyn AuthorizeService>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl ItemService {
    pub fn new(
        items: Arc<dyn ItemStore>,
        fields: Arc<dyn MetadataFieldStore>,
        relationship_types: Arc<dyn RelationshipTypeStore>,
        authorize: Arc<dyn AuthorizeService>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Self {
            items,
            fields,
            relationship_types,
            authorize,
            event_tx,
        }
    }

    /// Subscribe to item update events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: DomainEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Item>, ServiceError> {
        self.items
            .get_item(id)
            .await
            .map_err(ServiceError::from_store)
    }

    /// Like [`find`](Self::find) but a missing item is an error
    pub async fn get(&self, id: Uuid) -> Result<Item, ServiceError> {
        self.find(id)
            .await?
            .ok_or_else(|| ServiceError::item_not_found(id))
    }

    pub async fn create(&self, item: Item) -> Result<Item, ServiceError> {
        self.items
            .create_item(item)
            .await
            .map_err(ServiceError::from_store)
    }

    /// Real metadata matching a lookup, ordered by field then place
    ///
    /// `qualifier` and `language` accept [`ANY`]; `None` matches only values
    /// without a qualifier (or language).
    pub fn get_metadata(
        &self,
        item: &Item,
        schema: &str,
        element: &str,
        qualifier: Option<&str>,
        language: Option<&str>,
    ) -> Vec<MetadataValue> {
        let mut values: Vec<MetadataValue> = item
            .metadata
            .iter()
            .filter(|mv| mv.field.matches(schema, element, qualifier))
            .filter(|mv| mv.matches_language(language))
            .cloned()
            .collect();
        values.sort_by(|a, b| a.field.cmp(&b.field).then(a.place.cmp(&b.place)));
        values
    }

    /// Real metadata for a dotted key such as `dc.contributor.*`, any language
    pub fn get_metadata_by_key(
        &self,
        item: &Item,
        key: &str,
    ) -> Result<Vec<MetadataValue>, ValidationError> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            [schema, element] => Ok(self.get_metadata(item, schema, element, None, Some(ANY))),
            [schema, element, qualifier] => {
                Ok(self.get_metadata(item, schema, element, Some(*qualifier), Some(ANY)))
            }
            _ => Err(ValidationError::InvalidField(format!(
                "'{}' must have the form schema.element[.qualifier]",
                key
            ))),
        }
    }

    async fn ensure_registered(&self, field: &MetadataField) -> Result<(), ServiceError> {
        let found = self
            .fields
            .find_field(&field.schema, &field.element, field.qualifier.as_deref())
            .await
            .map_err(ServiceError::from_store)?;
        match found {
            Some(_) => Ok(()),
            None => Err(ValidationError::InvalidField(format!(
                "{} is not a registered metadata field",
                field
            ))
            .into()),
        }
    }

    /// Append a value after the field's existing values
    ///
    /// The change is in memory only until [`update`](Self::update) is called.
    pub async fn add_metadata(
        &self,
        item: &mut Item,
        field: &MetadataField,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: i32,
    ) -> Result<MetadataValue, ServiceError> {
        self.ensure_registered(field).await?;

        let mut metadata_value = MetadataValue::new(field.clone(), value, item.next_place_for(field));
        metadata_value.language = language.map(str::to_string);
        metadata_value.authority = authority.map(str::to_string);
        metadata_value.confidence = confidence;

        item.metadata.push(metadata_value.clone());
        item.set_metadata_modified();
        Ok(metadata_value)
    }

    /// Insert a value at position `index` of the field, shifting later values right
    ///
    /// The field's values are renumbered densely; an index past the end appends.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_and_shift_right_metadata(
        &self,
        item: &mut Item,
        field: &MetadataField,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: i32,
        index: i32,
    ) -> Result<(), ServiceError> {
        let inserted = self
            .add_metadata(item, field, language, value, authority, confidence)
            .await?;
        let inserted_at = item.metadata.len() - 1;

        let mut positions: Vec<usize> = item
            .metadata
            .iter()
            .enumerate()
            .filter(|(i, mv)| *i != inserted_at && &mv.field == field)
            .map(|(i, _)| i)
            .collect();
        positions.sort_by_key(|i| item.metadata[*i].place);

        let slot = usize::try_from(index).unwrap_or(0).min(positions.len());
        positions.insert(slot, inserted_at);

        for (place, position) in positions.into_iter().enumerate() {
            item.metadata[position].place = place as i32;
        }

        tracing::debug!(
            "Inserted {} value '{}' at place {} on item {}",
            field,
            inserted.value,
            slot,
            item.id
        );
        Ok(())
    }

    /// Persist an item and clear its metadata-modified flag
    ///
    /// Requires WRITE on the item unless authorization is turned off.
    pub async fn update(&self, context: &Context, mut item: Item) -> Result<Item, ServiceError> {
        if !self
            .authorize
            .authorize_action_boolean(context, &item, Action::Write)
            .await
        {
            return Err(ServiceError::authorization_denied(format!(
                "no WRITE permission on item {}",
                item.id
            )));
        }

        item.metadata_modified = false;
        item.modified_at = chrono::Utc::now();
        let saved = self
            .items
            .save_item(item)
            .await
            .map_err(ServiceError::from_store)?;

        self.emit_event(DomainEvent::ItemUpdated { id: saved.id });
        Ok(saved)
    }

    /// Entity type recorded in the item's `dspace.entity.type` metadata
    pub async fn get_entity_type(&self, item: &Item) -> Result<Option<EntityType>, ServiceError> {
        let Some(label) = item.entity_type_label() else {
            return Ok(None);
        };
        self.relationship_types
            .find_entity_type_by_label(label)
            .await
            .map_err(ServiceError::from_store)
    }
}
