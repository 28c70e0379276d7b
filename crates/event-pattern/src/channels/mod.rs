//! Event channels: interchangeable transports for publishing and listening
//! to named events.

pub mod cleanup;
pub mod postgres;
pub mod redis;
pub mod registry;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::context::{CredentialSource, TriggerContext};
use crate::error::ChannelError;
use crate::types::Payload;

pub use self::postgres::PostgresChannel;
pub use self::redis::RedisChannel;
pub use self::registry::{ChannelOption, ChannelRegistry};
pub use self::session::{SessionControl, TriggerSession};

/// Prefix shared with every existing publisher and subscriber on the wire.
pub const EVENT_ADDRESS_PREFIX: &str = "n8n-event-pattern-";

/// Transport address for a logical event name.
pub fn event_address(event: &str) -> String {
    format!("{}{}", EVENT_ADDRESS_PREFIX, event)
}

/// Subscription pattern matching exactly the address of `event`.
///
/// Glob metacharacters in the event name are escaped, so `order.*` only
/// matches an event literally named `order.*`.
pub fn event_pattern(event: &str) -> String {
    let address = event_address(event);
    let mut pattern = String::with_capacity(address.len());
    for c in address.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

/// Reject event names that cannot form an address.
pub fn validate_event(event: &str) -> Result<(), ChannelError> {
    if event.trim().is_empty() {
        return Err(ChannelError::config("event name not set"));
    }
    Ok(())
}

/// A transport capable of publishing and listening to named events.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Stable identifier used for credential lookup and registry indexing.
    fn credential_name(&self) -> &'static str;

    /// Inactive channels are constructible but hidden from selection.
    fn is_inactive(&self) -> bool {
        false
    }

    /// Publish `payload` on `event`. Opens and releases its own connection.
    async fn publish(
        &self,
        event: &str,
        payload: &Payload,
        ctx: &dyn CredentialSource,
    ) -> Result<(), ChannelError>;

    /// Start listening on `event`, returning the live session.
    async fn trigger(
        &self,
        event: &str,
        ctx: Arc<dyn TriggerContext>,
    ) -> Result<TriggerSession, ChannelError>;
}

/// Resolve and decode the credential named `name` from the host context.
///
/// The decoded value is logged through its `Debug` implementation, so
/// credential types must redact their secrets there.
pub async fn resolve_credential<T, C>(name: &str, ctx: &C) -> Result<T, ChannelError>
where
    T: DeserializeOwned + std::fmt::Debug,
    C: CredentialSource + ?Sized,
{
    let raw = ctx.credentials(name).await?;
    let credential: T = serde_json::from_value(raw)
        .map_err(|e| ChannelError::Credential(format!("invalid {} credential: {}", name, e)))?;
    tracing::info!(credential = name, ?credential, "using credential");
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_address() {
        assert_eq!(
            event_address("whatsapp.message.created"),
            "n8n-event-pattern-whatsapp.message.created"
        );
    }

    #[test]
    fn test_event_pattern_escapes_glob_characters() {
        assert_eq!(event_pattern("order.created"), "n8n-event-pattern-order.created");
        assert_eq!(event_pattern("order.*"), r"n8n-event-pattern-order.\*");
        assert_eq!(event_pattern("a?b"), r"n8n-event-pattern-a\?b");
        assert_eq!(event_pattern("[x]"), r"n8n-event-pattern-\[x\]");
        assert_eq!(event_pattern(r"a\b"), r"n8n-event-pattern-a\\b");
    }

    #[test]
    fn test_validate_event() {
        assert!(validate_event("order.created").is_ok());
        assert!(matches!(validate_event(""), Err(ChannelError::Config(_))));
        assert!(matches!(validate_event("   "), Err(ChannelError::Config(_))));
    }
}
