//! Durable event definitions.

pub mod fs;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{EventDefinition, EventLookup, NewEvent};

pub use self::fs::FsEventStore;

/// Persistence for event definitions.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store a new definition under a freshly generated id.
    async fn create(&self, event: NewEvent) -> StoreResult<EventDefinition>;

    /// Replace the record with the same id. Fails if it does not exist.
    async fn update(&self, event: EventDefinition) -> StoreResult<EventDefinition>;

    /// `None` when nothing matches.
    async fn get(&self, lookup: &EventLookup) -> StoreResult<Option<EventDefinition>>;

    /// Definitions in index insertion order. `offset` skips, `limit` caps;
    /// a zero or absent limit means no cap.
    async fn get_all(&self, limit: Option<usize>, offset: Option<usize>) -> StoreResult<Vec<EventDefinition>>;

    /// Returns the removed record, or `None` if it did not exist.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<EventDefinition>>;
}
