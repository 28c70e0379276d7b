use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChannelError;
use crate::types::ExecutionMode;

/// Resolves named credentials on behalf of a channel.
///
/// Implemented by the host runtime; channels never persist what they get.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the raw credential registered under `name`.
    async fn credentials(&self, name: &str) -> Result<Value, ChannelError>;
}

/// Host context for a listening workflow.
pub trait TriggerContext: CredentialSource {
    /// Execution mode declared by the host for this invocation.
    fn mode(&self) -> ExecutionMode;

    /// Emit sink. Must be fast: it is called inline for every message.
    fn emit(&self, data: Value);
}
