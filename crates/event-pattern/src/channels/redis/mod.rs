//! Redis pub/sub channel.

pub mod client;
pub mod credential;
mod session;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use self::client::{
    MessageStream, PublisherConnection, RedisConnector, Subscriber, SubscriberConnection,
    TokioRedisConnector,
};
pub use self::credential::RedisCredential;
use self::session::RedisSession;
use super::cleanup::{self, DEFAULT_CLOSE_TIMEOUT};
use super::session::{SessionControl, TriggerSession};
use super::{event_address, event_pattern, resolve_credential, validate_event, EventChannel};
use crate::context::{CredentialSource, TriggerContext};
use crate::error::{ChannelError, ChannelResult};
use crate::types::{ExecutionMode, Payload};

/// Publishes and listens on `n8n-event-pattern-<event>` via Redis pub/sub.
///
/// Every operation opens its own connection: publish closes it before
/// returning, trigger keeps it for the lifetime of the session.
pub struct RedisChannel {
    connector: Arc<dyn RedisConnector>,
    close_timeout: Duration,
}

impl RedisChannel {
    pub const CREDENTIAL_NAME: &'static str = "redis";

    pub fn new(connector: Arc<dyn RedisConnector>) -> Self {
        Self {
            connector,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Bound for each graceful cleanup step before forcing teardown.
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub async fn credential<C>(&self, ctx: &C) -> ChannelResult<RedisCredential>
    where
        C: CredentialSource + ?Sized,
    {
        resolve_credential(Self::CREDENTIAL_NAME, ctx).await
    }

    async fn send(
        conn: &mut dyn PublisherConnection,
        address: &str,
        body: &str,
    ) -> ChannelResult<()> {
        conn.ping()
            .await
            .map_err(|e| ChannelError::transport(format!("liveness check failed: {}", e)))?;
        conn.publish(address, body).await
    }
}

impl Default for RedisChannel {
    fn default() -> Self {
        Self::new(Arc::new(TokioRedisConnector::default()))
    }
}

#[async_trait]
impl EventChannel for RedisChannel {
    fn credential_name(&self) -> &'static str {
        Self::CREDENTIAL_NAME
    }

    async fn publish(
        &self,
        event: &str,
        payload: &Payload,
        ctx: &dyn CredentialSource,
    ) -> Result<(), ChannelError> {
        validate_event(event)?;
        tracing::info!(event, "redis event channel publish started");

        let credential = self.credential(ctx).await?;
        let body = payload
            .to_wire()
            .map_err(|e| ChannelError::config(format!("payload cannot be serialised: {}", e)))?;
        let address = event_address(event);

        let mut conn = self.connector.publisher(&credential).await?;
        let result = Self::send(conn.as_mut(), &address, &body).await;

        if !cleanup::attempt("quit", self.close_timeout, conn.quit()).await {
            conn.destroy();
        }

        if let Err(e) = &result {
            tracing::warn!(event, error = %e, "redis publish failed");
        }
        result
    }

    async fn trigger(
        &self,
        event: &str,
        ctx: Arc<dyn TriggerContext>,
    ) -> Result<TriggerSession, ChannelError> {
        validate_event(event)?;
        let mode = ctx.mode();
        tracing::info!(event, mode = mode.as_str(), "redis event channel trigger started");

        let credential = self.credential(&*ctx).await?;
        let subscriber = self.connector.subscriber(&credential).await?;
        let mut session =
            RedisSession::new(subscriber, event_pattern(event), ctx, self.close_timeout);

        let armed = match mode {
            ExecutionMode::Trigger => match session.check_liveness().await {
                Ok(()) => session.listen().await,
                Err(e) => Err(e),
            },
            ExecutionMode::Manual => session.check_liveness().await,
        };

        if let Err(e) = armed {
            tracing::warn!(event, error = %e, "redis trigger failed, releasing connection");
            session.close().await;
            return Err(e);
        }

        Ok(TriggerSession::new(Box::new(session)))
    }
}
