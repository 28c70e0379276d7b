//! In-memory stand-ins for the Redis transport and the host context.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use event_pattern::channels::redis::{
    PublisherConnection, RedisConnector, RedisCredential, Subscriber, SubscriberConnection,
};
use event_pattern::{ChannelError, CredentialSource, ExecutionMode, TriggerContext};
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Which steps of the fake transport should fail.
#[derive(Debug, Default, Clone)]
pub struct Failures {
    pub connect: bool,
    pub ping: bool,
    pub publish: bool,
    pub psubscribe: bool,
    pub quit: bool,
    pub hang_quit: bool,
}

/// A tiny pub/sub broker that records every call made against it.
#[derive(Default)]
pub struct MockBroker {
    calls: Mutex<Vec<String>>,
    subscriptions: Mutex<Vec<(u64, String, mpsc::UnboundedSender<String>)>>,
    failures: Mutex<Failures>,
    next_id: AtomicU64,
}

impl MockBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, update: impl FnOnce(&mut Failures)) {
        update(&mut self.failures.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn failures(&self) -> Failures {
        self.failures.lock().unwrap().clone()
    }

    fn deliver(&self, channel: &str, payload: &str) {
        for (_, pattern, tx) in self.subscriptions.lock().unwrap().iter() {
            if glob_match(pattern.as_bytes(), channel.as_bytes()) {
                let _ = tx.send(payload.to_string());
            }
        }
    }

    fn drop_subscriptions(&self, id: u64) {
        self.subscriptions.lock().unwrap().retain(|(owner, _, _)| *owner != id);
    }
}

/// PSUBSCRIBE pattern matching: `*`, `?`, `[...]` classes and backslash escapes.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|skip| glob_match(rest, &text[skip..])),
        Some((b'?', rest)) => !text.is_empty() && glob_match(rest, &text[1..]),
        Some((b'[', rest)) => {
            let Some(end) = rest.iter().position(|&b| b == b']') else {
                return false;
            };
            let Some((&c, tail)) = text.split_first() else {
                return false;
            };
            let (negate, class) = match rest[..end].split_first() {
                Some((b'^', class)) => (true, class),
                _ => (false, &rest[..end]),
            };
            let mut hit = false;
            let mut i = 0;
            while i < class.len() {
                if i + 2 < class.len() && class[i + 1] == b'-' {
                    hit |= class[i] <= c && c <= class[i + 2];
                    i += 3;
                } else {
                    hit |= class[i] == c;
                    i += 1;
                }
            }
            hit != negate && glob_match(&rest[end + 1..], tail)
        }
        Some((b'\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match(&rest[1..], &text[1..])
        }
        Some((&b, rest)) => text.first() == Some(&b) && glob_match(rest, &text[1..]),
    }
}

pub struct MockConnector(pub Arc<MockBroker>);

#[async_trait]
impl RedisConnector for MockConnector {
    async fn publisher(
        &self,
        _credential: &RedisCredential,
    ) -> Result<Box<dyn PublisherConnection>, ChannelError> {
        self.0.record("publisher.connect");
        if self.0.failures().connect {
            return Err(ChannelError::transport("connection refused"));
        }
        Ok(Box::new(MockPublisher {
            broker: self.0.clone(),
        }))
    }

    async fn subscriber(&self, _credential: &RedisCredential) -> Result<Subscriber, ChannelError> {
        self.0.record("subscriber.connect");
        if self.0.failures().connect {
            return Err(ChannelError::transport("connection refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let messages = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        })
        .boxed();
        Ok(Subscriber {
            connection: Box::new(MockSubscriber {
                broker: self.0.clone(),
                id: self.0.next_id.fetch_add(1, Ordering::SeqCst),
                tx,
            }),
            messages,
        })
    }
}

struct MockPublisher {
    broker: Arc<MockBroker>,
}

#[async_trait]
impl PublisherConnection for MockPublisher {
    async fn ping(&mut self) -> Result<(), ChannelError> {
        self.broker.record("publisher.ping");
        if self.broker.failures().ping {
            return Err(ChannelError::transport("no PONG"));
        }
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), ChannelError> {
        self.broker.record(format!("publish {} {}", channel, payload));
        if self.broker.failures().publish {
            return Err(ChannelError::transport("publish rejected"));
        }
        self.broker.deliver(channel, payload);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), ChannelError> {
        self.broker.record("publisher.quit");
        let failures = self.broker.failures();
        if failures.hang_quit {
            std::future::pending::<()>().await;
        }
        if failures.quit {
            return Err(ChannelError::transport("socket closed"));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.broker.record("publisher.destroy");
    }
}

struct MockSubscriber {
    broker: Arc<MockBroker>,
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl SubscriberConnection for MockSubscriber {
    async fn ping(&mut self) -> Result<(), ChannelError> {
        self.broker.record("subscriber.ping");
        if self.broker.failures().ping {
            return Err(ChannelError::transport("no PONG"));
        }
        Ok(())
    }

    async fn psubscribe(&mut self, pattern: &str) -> Result<(), ChannelError> {
        self.broker.record(format!("psubscribe {}", pattern));
        if self.broker.failures().psubscribe {
            return Err(ChannelError::transport("psubscribe rejected"));
        }
        self.broker
            .subscriptions
            .lock()
            .unwrap()
            .push((self.id, pattern.to_string(), self.tx.clone()));
        Ok(())
    }

    async fn punsubscribe(&mut self, pattern: &str) -> Result<(), ChannelError> {
        self.broker.record(format!("punsubscribe {}", pattern));
        self.broker.drop_subscriptions(self.id);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), ChannelError> {
        self.broker.record("subscriber.quit");
        let failures = self.broker.failures();
        if failures.hang_quit {
            std::future::pending::<()>().await;
        }
        if failures.quit {
            return Err(ChannelError::transport("socket closed"));
        }
        self.broker.drop_subscriptions(self.id);
        Ok(())
    }

    fn destroy(&mut self) {
        self.broker.record("subscriber.destroy");
        self.broker.drop_subscriptions(self.id);
    }
}

/// Host context that serves one redis credential and forwards emits to a channel.
pub struct RecordingContext {
    mode: ExecutionMode,
    credential: Option<Value>,
    emitted: mpsc::UnboundedSender<Value>,
}

impl RecordingContext {
    pub fn new(mode: ExecutionMode) -> (Arc<Self>, mpsc::UnboundedReceiver<Value>) {
        Self::with_credential(mode, Some(local_credential()))
    }

    pub fn with_credential(
        mode: ExecutionMode,
        credential: Option<Value>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Value>) {
        let (emitted, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                mode,
                credential,
                emitted,
            }),
            rx,
        )
    }
}

#[async_trait]
impl CredentialSource for RecordingContext {
    async fn credentials(&self, name: &str) -> Result<Value, ChannelError> {
        self.credential
            .clone()
            .ok_or_else(|| ChannelError::Credential(format!("no credential named {}", name)))
    }
}

impl TriggerContext for RecordingContext {
    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    fn emit(&self, data: Value) {
        let _ = self.emitted.send(data);
    }
}

pub fn local_credential() -> Value {
    json!({"host": "localhost", "port": 6379, "ssl": false, "database": 0})
}
