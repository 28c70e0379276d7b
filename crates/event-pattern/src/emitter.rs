//! Batch publishing of workflow items onto an event.

use serde::Serialize;
use serde_json::Value;

use crate::channels::ChannelRegistry;
use crate::context::CredentialSource;
use crate::error::ChannelError;
use crate::types::Payload;

/// Outcome of publishing one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemResult {
    /// Published; the original item passes through.
    Passed(Value),
    /// Failed with `continue_on_fail` set.
    Failed { error: String },
}

/// Failure that aborted a batch.
#[derive(Debug, thiserror::Error)]
#[error("item {index}: {source}")]
pub struct BatchError {
    pub index: usize,
    #[source]
    pub source: ChannelError,
}

/// Publishes each item of a batch on one event through the selected channel.
pub struct EventEmitter<'a> {
    registry: &'a ChannelRegistry,
}

impl<'a> EventEmitter<'a> {
    pub fn new(registry: &'a ChannelRegistry) -> Self {
        Self { registry }
    }

    /// Publish `items` one by one, in order.
    ///
    /// On a failure the batch stops with the failing index, unless
    /// `continue_on_fail` is set, in which case the item is recorded as
    /// `{"error": ...}` and the rest still go out.
    pub async fn emit_batch(
        &self,
        channel: Option<&str>,
        event: &str,
        items: Vec<Value>,
        continue_on_fail: bool,
        ctx: &dyn CredentialSource,
    ) -> Result<Vec<ItemResult>, BatchError> {
        let mut results = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            match self.emit_one(channel, event, &item, ctx).await {
                Ok(()) => results.push(ItemResult::Passed(item)),
                Err(e) if continue_on_fail => {
                    tracing::warn!(index, event, error = %e, "publish failed, continuing");
                    results.push(ItemResult::Failed {
                        error: e.to_string(),
                    });
                }
                Err(source) => return Err(BatchError { index, source }),
            }
        }

        Ok(results)
    }

    async fn emit_one(
        &self,
        channel: Option<&str>,
        event: &str,
        item: &Value,
        ctx: &dyn CredentialSource,
    ) -> Result<(), ChannelError> {
        let channel = self.registry.resolve(channel)?;
        let payload = Payload::Json(item.clone());
        channel.publish(event, &payload, ctx).await
    }
}
