use thiserror::Error;
use uuid::Uuid;

/// Errors raised by channels and the publish/trigger entry points.
///
/// Cleanup failures have no variant here: they are logged and discarded
/// where they happen and never reach the caller.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Missing or unknown channel name, missing event name.
    #[error("configuration error: {0}")]
    Config(String),

    /// The host context could not supply a usable credential.
    #[error("credential error: {0}")]
    Credential(String),

    /// Connect, liveness check, publish or subscribe failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel exists but has no working implementation yet.
    #[error("channel \"{0}\" is not implemented")]
    NotImplemented(&'static str),
}

impl ChannelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<::redis::RedisError> for ChannelError {
    fn from(e: ::redis::RedisError) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Errors raised by the event definition store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stored record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("event with id '{0}' not found")]
    NotFound(Uuid),
}

pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
