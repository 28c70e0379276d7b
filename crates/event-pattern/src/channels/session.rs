use async_trait::async_trait;

use crate::error::ChannelError;

/// Channel-specific half of a trigger session.
#[async_trait]
pub trait SessionControl: Send {
    /// Whether `manual_trigger` is meaningful for this session.
    fn supports_manual_trigger(&self) -> bool {
        false
    }

    /// Wait for exactly one message, deliver it, then return.
    async fn manual_trigger(&mut self) -> Result<(), ChannelError> {
        Err(ChannelError::config("manual trigger is not supported by this channel"))
    }

    /// Unsubscribe and release the connection. Must not fail or hang.
    async fn close(&mut self);
}

/// Live handle to an open subscription.
///
/// Hold it for as long as the workflow listens; call [`TriggerSession::close`]
/// when done. Closing twice is a no-op.
pub struct TriggerSession {
    control: Box<dyn SessionControl>,
    closed: bool,
}

impl TriggerSession {
    pub fn new(control: Box<dyn SessionControl>) -> Self {
        Self {
            control,
            closed: false,
        }
    }

    pub fn supports_manual_trigger(&self) -> bool {
        self.control.supports_manual_trigger()
    }

    /// Block until one message has been received and handed to the emit sink.
    pub async fn manual_trigger(&mut self) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::config("trigger session already closed"));
        }
        self.control.manual_trigger().await
    }

    /// Stop delivery and release the connection.
    pub async fn close(&mut self) {
        if self.closed {
            tracing::debug!("trigger session already closed");
            return;
        }
        self.closed = true;
        self.control.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl std::fmt::Debug for TriggerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerSession")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
