//! Request context
//!
//! A `Context` is owned by the caller for the duration of one unit of work.
//! It names the acting principal and carries the authorization bypass used
//! by internal bookkeeping (re-indexing related items, copying metadata).
//!
//! ```rust
//! use relata_core::Context;
//!
//! let context = Context::anonymous();
//! {
//!     let _guard = context.turn_off_authorization();
//!     assert!(context.ignores_authorization());
//! }
//! assert!(!context.ignores_authorization());
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct Context {
    principal: Option<Uuid>,
    bypass_depth: AtomicU32,
}

impl Context {
    pub fn new(principal: Uuid) -> Self {
        Self {
            principal: Some(principal),
            bypass_depth: AtomicU32::new(0),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<Uuid> {
        self.principal
    }

    /// Disable authorization checks until the returned guard is dropped
    ///
    /// Guards nest; checks resume once every guard is gone.
    pub fn turn_off_authorization(&self) -> AuthorizationBypass<'_> {
        self.bypass_depth.fetch_add(1, Ordering::SeqCst);
        AuthorizationBypass { context: self }
    }

    pub fn ignores_authorization(&self) -> bool {
        self.bypass_depth.load(Ordering::SeqCst) > 0
    }
}

/// Restores authorization checks on drop
#[must_use = "authorization is restored as soon as the guard is dropped"]
pub struct AuthorizationBypass<'a> {
    context: &'a Context,
}

impl Drop for AuthorizationBypass<'_> {
    fn drop(&mut self) {
        self.context.bypass_depth.fetch_sub(1, Ordering::SeqCst);
    }
}
