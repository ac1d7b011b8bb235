//! Search index collaborator
//!
//! The relationship services only ever overwrite whole `relation.*` fields of
//! an item's index document. [`MemoryIndex`] keeps those fields in memory.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Replace `field` of the item's document with `values`
    async fn update_relation_for_item(
        &self,
        item: Uuid,
        field: &str,
        values: Vec<String>,
    ) -> Result<()>;
}

/// In-memory index documents keyed by item
#[derive(Clone, Default)]
pub struct MemoryIndex {
    documents: Arc<RwLock<HashMap<Uuid, BTreeMap<String, Vec<String>>>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed values of one field, if the field was ever written
    pub async fn field(&self, item: Uuid, field: &str) -> Option<Vec<String>> {
        self.documents
            .read()
            .await
            .get(&item)
            .and_then(|document| document.get(field))
            .cloned()
    }

    pub async fn document(&self, item: Uuid) -> BTreeMap<String, Vec<String>> {
        self.documents
            .read()
            .await
            .get(&item)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IndexingService for MemoryIndex {
    async fn update_relation_for_item(
        &self,
        item: Uuid,
        field: &str,
        values: Vec<String>,
    ) -> Result<()> {
        self.documents
            .write()
            .await
            .entry(item)
            .or_default()
            .insert(field.to_string(), values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_overwrites_field() {
        let index = MemoryIndex::new();
        let item = Uuid::new_v4();

        index
            .update_relation_for_item(item, "relation.isAuthorOfPublication", vec!["a".into()])
            .await
            .unwrap();
        index
            .update_relation_for_item(item, "relation.isAuthorOfPublication", vec!["b".into()])
            .await
            .unwrap();

        assert_eq!(
            index.field(item, "relation.isAuthorOfPublication").await,
            Some(vec!["b".to_string()])
        );
        assert!(index.field(item, "relation.other").await.is_none());
        assert_eq!(index.document(item).await.len(), 1);
    }
}
