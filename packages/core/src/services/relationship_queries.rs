//! Relationship lookups shared by the relationship services

use anyhow::Result;
use uuid::Uuid;

use crate::db::RelationshipStore;
use crate::models::{Relationship, RelationshipType, Side, Tilted};

/// Whether the type's tilt hides `relationship` from the item on `side`
pub(crate) fn is_hidden_by_tilt(relationship: &Relationship, side: Side) -> bool {
    matches!(
        (side, relationship.relationship_type.tilted),
        (Side::Left, Tilted::Right) | (Side::Right, Tilted::Left)
    )
}

/// Order by leftward label, then by the place on the item's side
pub(crate) fn sort_for_item(relationships: &mut [Relationship], item: Uuid) {
    relationships.sort_by(|a, b| {
        a.relationship_type
            .leftward_type
            .cmp(&b.relationship_type.leftward_type)
            .then_with(|| {
                let side = a.side_of(item).unwrap_or(Side::Left);
                a.place(side).cmp(&b.place(b.side_of(item).unwrap_or(side)))
            })
    });
}

/// Relationships of `item` in display order
pub(crate) async fn find_by_item(
    store: &dyn RelationshipStore,
    item: Uuid,
    exclude_tilted: bool,
) -> Result<Vec<Relationship>> {
    let mut relationships: Vec<Relationship> = store
        .find_relationships_by_item(item)
        .await?
        .into_iter()
        .filter(|r| {
            !exclude_tilted
                || r.side_of(item)
                    .map(|side| !is_hidden_by_tilt(r, side))
                    .unwrap_or(true)
        })
        .collect();
    sort_for_item(&mut relationships, item);
    Ok(relationships)
}

/// `(other item, relationship id)` for relationships where `item` sits on
/// `side` and holds latest-version status there
pub(crate) async fn find_by_latest_item_and_relationship_type(
    store: &dyn RelationshipStore,
    item: Uuid,
    relationship_type: &RelationshipType,
    side: Side,
) -> Result<Vec<(Uuid, i64)>> {
    let relationships = store
        .find_relationships_by_item_and_type(item, relationship_type, Some(side))
        .await?;
    Ok(relationships
        .into_iter()
        .filter(|r| r.latest_version_status.is_latest_on(side))
        .map(|r| (r.item(side.opposite()), r.id))
        .collect())
}

/// Apply `offset` and `limit` to an already ordered list
pub(crate) fn paginate<T>(values: Vec<T>, limit: Option<usize>, offset: usize) -> Vec<T> {
    values
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
