//! Business Services
//!
//! - `RelationshipService` - validation, places and persistence of relationships
//! - `RelationshipMetadataService` - projection of relationships into metadata values
//! - `RelationshipPlacesIndexingService` - `relation.*` search index maintenance
//! - `ItemService` - real item metadata and item persistence
//! - `ContentServices` - in-memory composition of all of the above
//!
//! Services coordinate between the store traits and callers, implementing the
//! relationship rules and orchestrating follow-up updates of related items.

pub mod authorize;
pub mod container;
pub mod error;
pub mod indexing;
pub mod item_service;
pub mod places_indexing_service;
mod relationship_queries;
pub mod relationship_metadata_service;
pub mod relationship_service;
pub mod virtual_metadata;

pub use authorize::{Action, AuthorizeService, PolicyAuthorizeService};
pub use container::ContentServices;
pub use error::ServiceError;
pub use indexing::{IndexingService, MemoryIndex};
pub use item_service::ItemService;
pub use places_indexing_service::RelationshipPlacesIndexingService;
pub use relationship_metadata_service::RelationshipMetadataService;
pub use relationship_service::RelationshipService;
pub use virtual_metadata::{
    VirtualFieldBindings, VirtualMetadataBindings, VirtualMetadataConfiguration,
    VirtualMetadataPopulator, VirtualSource,
};
