//! Persistence Layer
//!
//! This module abstracts how items, relationship types and relationships are
//! stored:
//!
//! - Store traits that services depend on (`RelationshipStore`, ...)
//! - `MemoryStore`, the in-memory backend implementing all of them
//! - Dense place arithmetic shared by the services
//! - JSON fixtures for seeding a store
//! - Domain events broadcast after mutations
//!
//! # Architecture
//!
//! Services hold `Arc<dyn ...Store>` handles and never see the backend. The
//! caller owns transaction boundaries; stores apply each call immediately.

mod error;
pub mod events;
mod memory_store;
pub mod place_ordering;
pub mod seed;
mod store;

pub use error::DatabaseError;
pub use events::{DomainEvent, RemovedRelationship, DOMAIN_EVENT_CHANNEL_CAPACITY};
pub use memory_store::MemoryStore;
pub use place_ordering::PlaceOrderCalculator;
pub use seed::{SeedData, SeedItem, SeedRelationship};
pub use store::{ItemStore, MetadataFieldStore, RelationshipStore, RelationshipTypeStore};
