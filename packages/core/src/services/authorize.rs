//! Authorization collaborator
//!
//! Services ask an [`AuthorizeService`] whether the context's principal may
//! perform an action on an item. The bundled [`PolicyAuthorizeService`] keeps
//! an admin set and explicit per-item grants in memory.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::context::Context;
use crate::models::Item;

/// Actions that can be granted on an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
}

#[async_trait]
pub trait AuthorizeService: Send + Sync {
    /// Whether the context may perform `action` on `item`; never errors
    async fn authorize_action_boolean(&self, context: &Context, item: &Item, action: Action)
        -> bool;

    async fn is_admin(&self, context: &Context) -> bool;
}

/// In-memory policy table: admins may do anything, others need a grant
#[derive(Clone, Default)]
pub struct PolicyAuthorizeService {
    admins: Arc<RwLock<HashSet<Uuid>>>,
    grants: Arc<RwLock<HashMap<(Uuid, Uuid), HashSet<Action>>>>,
}

impl PolicyAuthorizeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_admin(&self, principal: Uuid) {
        self.admins.write().await.insert(principal);
    }

    /// Grant `action` on `item` to `principal`
    pub async fn grant(&self, principal: Uuid, item: Uuid, action: Action) {
        self.grants
            .write()
            .await
            .entry((principal, item))
            .or_default()
            .insert(action);
    }

    pub async fn revoke(&self, principal: Uuid, item: Uuid, action: Action) {
        if let Some(actions) = self.grants.write().await.get_mut(&(principal, item)) {
            actions.remove(&action);
        }
    }
}

#[async_trait]
impl AuthorizeService for PolicyAuthorizeService {
    async fn authorize_action_boolean(
        &self,
        context: &Context,
        item: &Item,
        action: Action,
    ) -> bool {
        if context.ignores_authorization() || self.is_admin(context).await {
            return true;
        }
        let Some(principal) = context.principal() else {
            return false;
        };
        self.grants
            .read()
            .await
            .get(&(principal, item.id))
            .map(|actions| actions.contains(&action))
            .unwrap_or(false)
    }

    async fn is_admin(&self, context: &Context) -> bool {
        match context.principal() {
            Some(principal) => self.admins.read().await.contains(&principal),
            None => false,
        }
    }
}
