//! Entry point for listening workflows.

use std::sync::Arc;

use crate::channels::{validate_event, ChannelRegistry, TriggerSession};
use crate::context::TriggerContext;
use crate::error::ChannelError;

/// Resolve the channel and start a trigger session on `event`.
pub async fn start(
    registry: &ChannelRegistry,
    channel: Option<&str>,
    event: &str,
    ctx: Arc<dyn TriggerContext>,
) -> Result<TriggerSession, ChannelError> {
    tracing::info!(event, "event listener trigger started");
    let channel = registry.resolve(channel)?;
    validate_event(event)?;
    channel.trigger(event, ctx).await
}
