//! Connection seam between the Redis channel and the `redis` crate.
//!
//! The channel only talks to the traits below, so tests can swap in an
//! in-memory double for [`TokioRedisConnector`].

use std::time::Duration;

use ::redis::aio::{MultiplexedConnection, PubSubSink};
use ::redis::AsyncCommands;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};

use super::credential::RedisCredential;
use crate::error::{ChannelError, ChannelResult};

/// Upper bound for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message bodies received by a subscriber, in transport order.
pub type MessageStream = BoxStream<'static, String>;

/// A connection used for one publish call.
#[async_trait]
pub trait PublisherConnection: Send {
    async fn ping(&mut self) -> ChannelResult<()>;
    async fn publish(&mut self, channel: &str, payload: &str) -> ChannelResult<()>;
    /// Graceful close.
    async fn quit(&mut self) -> ChannelResult<()>;
    /// Forced teardown. Never fails.
    fn destroy(&mut self);
}

/// Control half of a subscriber connection.
#[async_trait]
pub trait SubscriberConnection: Send {
    async fn ping(&mut self) -> ChannelResult<()>;
    async fn psubscribe(&mut self, pattern: &str) -> ChannelResult<()>;
    async fn punsubscribe(&mut self, pattern: &str) -> ChannelResult<()>;
    /// Graceful close.
    async fn quit(&mut self) -> ChannelResult<()>;
    /// Forced teardown. Never fails.
    fn destroy(&mut self);
}

/// An established subscriber: its control half plus the message stream.
pub struct Subscriber {
    pub connection: Box<dyn SubscriberConnection>,
    pub messages: MessageStream,
}

/// Opens connections from a credential.
#[async_trait]
pub trait RedisConnector: Send + Sync {
    async fn publisher(&self, credential: &RedisCredential) -> ChannelResult<Box<dyn PublisherConnection>>;
    async fn subscriber(&self, credential: &RedisCredential) -> ChannelResult<Subscriber>;
}

// ============================================================================
// redis crate implementation
// ============================================================================

/// Connector backed by the `redis` crate on the tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioRedisConnector {
    connect_timeout: Duration,
}

impl TokioRedisConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn client(credential: &RedisCredential) -> ChannelResult<::redis::Client> {
        let url = credential.connection_url()?;
        Ok(::redis::Client::open(url.as_str())?)
    }

    async fn bounded<T, F>(&self, fut: F) -> ChannelResult<T>
    where
        F: std::future::Future<Output = ::redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.connect_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ChannelError::transport(format!(
                "timed out connecting to redis after {}ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }
}

impl Default for TokioRedisConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl RedisConnector for TokioRedisConnector {
    async fn publisher(&self, credential: &RedisCredential) -> ChannelResult<Box<dyn PublisherConnection>> {
        let client = Self::client(credential)?;
        let conn = self.bounded(client.get_multiplexed_async_connection()).await?;
        Ok(Box::new(CommandConnection { conn: Some(conn) }))
    }

    async fn subscriber(&self, credential: &RedisCredential) -> ChannelResult<Subscriber> {
        let client = Self::client(credential)?;
        let pubsub = self.bounded(client.get_async_pubsub()).await?;
        let (sink, stream) = pubsub.split();

        let messages = stream
            .filter_map(|msg| {
                let body = match msg.get_payload::<String>() {
                    Ok(body) => Some(body),
                    Err(e) => {
                        tracing::warn!(channel = %msg.get_channel_name(), error = %e, "dropping undecodable message");
                        None
                    }
                };
                futures_util::future::ready(body)
            })
            .boxed();

        Ok(Subscriber {
            connection: Box::new(PubSubConnection {
                client,
                connector: self.clone(),
                sink: Some(sink),
            }),
            messages,
        })
    }
}

struct CommandConnection {
    conn: Option<MultiplexedConnection>,
}

impl CommandConnection {
    fn live(&mut self) -> ChannelResult<&mut MultiplexedConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| ChannelError::transport("connection already closed"))
    }
}

#[async_trait]
impl PublisherConnection for CommandConnection {
    async fn ping(&mut self) -> ChannelResult<()> {
        let _pong: String = ::redis::cmd("PING").query_async(self.live()?).await?;
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> ChannelResult<()> {
        let receivers: i64 = self.live()?.publish(channel, payload).await?;
        tracing::debug!(channel, receivers, "published message");
        Ok(())
    }

    async fn quit(&mut self) -> ChannelResult<()> {
        if let Some(mut conn) = self.conn.take() {
            let _: () = ::redis::cmd("QUIT").query_async(&mut conn).await?;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.conn = None;
    }
}

/// The pub/sub sink exposes no PING, so the liveness check goes out on a
/// short-lived command connection to the same server.
struct PubSubConnection {
    client: ::redis::Client,
    connector: TokioRedisConnector,
    sink: Option<PubSubSink>,
}

impl PubSubConnection {
    fn live(&mut self) -> ChannelResult<&mut PubSubSink> {
        self.sink
            .as_mut()
            .ok_or_else(|| ChannelError::transport("subscriber connection already closed"))
    }
}

#[async_trait]
impl SubscriberConnection for PubSubConnection {
    async fn ping(&mut self) -> ChannelResult<()> {
        self.live()?;
        let mut conn = self
            .connector
            .bounded(self.client.get_multiplexed_async_connection())
            .await?;
        let _pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn psubscribe(&mut self, pattern: &str) -> ChannelResult<()> {
        self.live()?.psubscribe(pattern).await?;
        Ok(())
    }

    async fn punsubscribe(&mut self, pattern: &str) -> ChannelResult<()> {
        // Nothing to unsubscribe from once the sink is gone.
        if let Some(sink) = self.sink.as_mut() {
            sink.punsubscribe(pattern).await?;
        }
        Ok(())
    }

    async fn quit(&mut self) -> ChannelResult<()> {
        // Dropping the sink closes the connection once the stream half is gone.
        self.sink = None;
        Ok(())
    }

    fn destroy(&mut self) {
        self.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> RedisCredential {
        // Nothing listens on port 1.
        RedisCredential::new("127.0.0.1", 1)
    }

    #[tokio::test]
    async fn test_publisher_connect_failure_is_transport_error() {
        let connector = TokioRedisConnector::new(Duration::from_secs(2));
        let err = connector.publisher(&unreachable()).await.err();
        assert!(matches!(err, Some(ChannelError::Transport(_))));
    }

    #[tokio::test]
    async fn test_subscriber_connect_failure_is_transport_error() {
        let connector = TokioRedisConnector::new(Duration::from_secs(2));
        let err = connector.subscriber(&unreachable()).await.err();
        assert!(matches!(err, Some(ChannelError::Transport(_))));
    }
}
