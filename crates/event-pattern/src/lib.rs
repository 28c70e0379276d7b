//! Named events published and listened to over pluggable channels.
//!
//! - [`channels`]: the [`EventChannel`] abstraction, the Redis pub/sub
//!   implementation, the registry and trigger sessions.
//! - [`store`]: durable event definitions mapping names to stable ids.
//! - [`manager`], [`emitter`], [`listener`]: the operations a host exposes.

pub mod channels;
pub mod context;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod manager;
pub mod store;
pub mod types;

pub use channels::{ChannelRegistry, EventChannel, TriggerSession};
pub use context::{CredentialSource, TriggerContext};
pub use error::{ChannelError, StoreError};
pub use manager::EventManager;
pub use store::{EventRepository, FsEventStore};
pub use types::{EventDefinition, EventLookup, ExecutionMode, NewEvent, Payload};
