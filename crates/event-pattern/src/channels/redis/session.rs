use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt};
use tokio::task::JoinHandle;

use super::client::{MessageStream, Subscriber, SubscriberConnection};
use crate::channels::cleanup;
use crate::channels::session::SessionControl;
use crate::context::TriggerContext;
use crate::error::{ChannelError, ChannelResult};
use crate::types::envelope;

/// One open Redis subscriber connection bound to a single event pattern.
pub(super) struct RedisSession {
    connection: Box<dyn SubscriberConnection>,
    /// Taken by the reader task in continuous mode.
    messages: Option<MessageStream>,
    reader: Option<JoinHandle<()>>,
    pattern: String,
    ctx: Arc<dyn TriggerContext>,
    close_timeout: Duration,
}

impl RedisSession {
    pub(super) fn new(
        subscriber: Subscriber,
        pattern: String,
        ctx: Arc<dyn TriggerContext>,
        close_timeout: Duration,
    ) -> Self {
        Self {
            connection: subscriber.connection,
            messages: Some(subscriber.messages),
            reader: None,
            pattern,
            ctx,
            close_timeout,
        }
    }

    pub(super) async fn check_liveness(&mut self) -> ChannelResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|e| ChannelError::transport(format!("liveness check failed: {}", e)))
    }

    /// Subscribe and forward every message to the emit sink until closed.
    pub(super) async fn listen(&mut self) -> ChannelResult<()> {
        let mut messages = self
            .messages
            .take()
            .ok_or_else(|| ChannelError::transport("subscription stream already consumed"))?;
        self.connection.psubscribe(&self.pattern).await?;
        tracing::info!(pattern = %self.pattern, "subscribed");

        let ctx = self.ctx.clone();
        let pattern = self.pattern.clone();
        self.reader = Some(tokio::spawn(async move {
            while let Some(body) = messages.next().await {
                tracing::debug!(pattern = %pattern, bytes = body.len(), "delivering message");
                ctx.emit(envelope(&body));
            }
            tracing::info!(pattern = %pattern, "subscription stream ended");
        }));
        Ok(())
    }

    /// Drop messages already buffered on the stream without waiting for more.
    fn discard_buffered(&mut self) -> usize {
        let Some(messages) = self.messages.as_mut() else {
            return 0;
        };
        let mut discarded = 0;
        while let Some(Some(_)) = messages.next().now_or_never() {
            discarded += 1;
        }
        discarded
    }
}

#[async_trait]
impl SessionControl for RedisSession {
    fn supports_manual_trigger(&self) -> bool {
        true
    }

    /// Subscribe, deliver exactly one message, then unsubscribe again.
    ///
    /// The connection stays open until close; calling this again re-arms
    /// the subscription.
    async fn manual_trigger(&mut self) -> ChannelResult<()> {
        if self.reader.is_some() {
            return Err(ChannelError::config(
                "session is already listening continuously",
            ));
        }
        if self.messages.is_none() {
            return Err(ChannelError::transport("subscription stream already consumed"));
        }

        // Anything still queued predates this subscription.
        let stale = self.discard_buffered();
        if stale > 0 {
            tracing::debug!(pattern = %self.pattern, stale, "discarded stale messages");
        }

        self.connection.psubscribe(&self.pattern).await?;
        tracing::info!(pattern = %self.pattern, "waiting for one message");

        let next = match self.messages.as_mut() {
            Some(messages) => messages.next().await,
            None => None,
        };
        let Some(body) = next else {
            return Err(ChannelError::transport(
                "subscription closed before a message arrived",
            ));
        };
        self.ctx.emit(envelope(&body));

        cleanup::attempt(
            "punsubscribe",
            self.close_timeout,
            self.connection.punsubscribe(&self.pattern),
        )
        .await;
        // Messages that raced the unsubscribe are not delivered.
        let extra = self.discard_buffered();
        if extra > 0 {
            tracing::debug!(pattern = %self.pattern, extra, "discarded messages received after the first");
        }
        Ok(())
    }

    async fn close(&mut self) {
        tracing::info!(pattern = %self.pattern, "closing trigger session");

        cleanup::attempt(
            "punsubscribe",
            self.close_timeout,
            self.connection.punsubscribe(&self.pattern),
        )
        .await;

        if !cleanup::attempt("quit", self.close_timeout, self.connection.quit()).await {
            tracing::warn!(pattern = %self.pattern, "forcing subscriber connection teardown");
            self.connection.destroy();
        }

        if let Some(reader) = self.reader.take() {
            reader.abort();
            // Joined so no delivery can happen after close returns.
            let _ = reader.await;
        }
        self.messages = None;
    }
}

impl Drop for RedisSession {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
