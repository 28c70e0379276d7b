use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context};
use event_pattern::emitter::{EventEmitter, ItemResult};
use event_pattern::{listener, ChannelRegistry, TriggerSession, EventLookup, EventManager, ExecutionMode, Payload};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Settings;
use crate::context::CliContext;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Channel from the command line, then config, then the registry default.
pub fn pick_channel(registry: &ChannelRegistry, flag: Option<String>, settings: &Settings) -> Option<String> {
    flag.or_else(|| settings.channel.clone()).or_else(|| {
        registry
            .default_channel()
            .map(|channel| channel.credential_name().to_string())
    })
}

pub async fn publish(
    registry: &ChannelRegistry,
    settings: &Settings,
    channel: Option<String>,
    event: &str,
    payloads: Vec<String>,
    raw: bool,
    continue_on_fail: bool,
) -> anyhow::Result<()> {
    let channel = pick_channel(registry, channel, settings);
    let ctx = CliContext::new(settings.credentials.clone(), ExecutionMode::Trigger);

    // Raw payloads go out verbatim, one publish per payload.
    if raw {
        let channel = registry.resolve(channel.as_deref())?;
        for payload in &payloads {
            channel.publish(event, &Payload::from(payload.as_str()), &ctx).await?;
        }
        tracing::info!(event, count = payloads.len(), "published raw payloads");
        return Ok(());
    }

    let items = payloads
        .iter()
        .map(|payload| {
            serde_json::from_str::<Value>(payload).with_context(|| format!("payload is not valid JSON: {}", payload))
        })
        .collect::<anyhow::Result<Vec<Value>>>()?;

    let results = EventEmitter::new(registry)
        .emit_batch(channel.as_deref(), event, items, continue_on_fail, &ctx)
        .await?;
    let failed = results
        .iter()
        .filter(|r| matches!(r, ItemResult::Failed { .. }))
        .count();
    tracing::info!(event, published = results.len() - failed, failed, "publish finished");
    print_json(&results)
}

pub async fn listen(
    registry: &ChannelRegistry,
    settings: &Settings,
    channel: Option<String>,
    event: &str,
    once: bool,
) -> anyhow::Result<()> {
    let channel = pick_channel(registry, channel, settings);
    let mode = if once { ExecutionMode::Manual } else { ExecutionMode::Trigger };
    let ctx = Arc::new(CliContext::new(settings.credentials.clone(), mode));

    let mut session = listener::start(registry, channel.as_deref(), event, ctx).await?;
    if once {
        tracing::info!(event, "waiting for one event, press Ctrl-C to stop");
    } else {
        tracing::info!(event, "listening, press Ctrl-C to stop");
    }
    run_session(&mut session, once, tokio::signal::ctrl_c()).await
}

/// Wait for one event (`once`) or until `shutdown` resolves, then close the
/// session either way.
async fn run_session<F>(session: &mut TriggerSession, once: bool, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let outcome = if once {
        tokio::select! {
            triggered = session.manual_trigger() => triggered.map_err(anyhow::Error::from),
            interrupted = shutdown => interrupted.map_err(anyhow::Error::from),
        }
    } else {
        shutdown.await.map_err(anyhow::Error::from)
    };

    session.close().await;
    outcome
}

pub fn channels(registry: &ChannelRegistry) -> anyhow::Result<()> {
    print_json(&registry.options())
}

pub async fn create_event(manager: &EventManager, name: &str, description: Option<String>) -> anyhow::Result<()> {
    print_json(&manager.create(name, description).await?)
}

pub async fn get_event(manager: &EventManager, id: Option<Uuid>, name: Option<String>) -> anyhow::Result<()> {
    let lookup = match (id, name) {
        (Some(id), _) => EventLookup::Id(id),
        (None, Some(name)) => EventLookup::Name(name),
        (None, None) => bail!("either --id or --name is required"),
    };
    match manager.get(&lookup).await? {
        Some(event) => print_json(&event),
        None => bail!("event not found"),
    }
}

pub async fn list_events(manager: &EventManager, limit: Option<usize>, offset: Option<usize>) -> anyhow::Result<()> {
    print_json(&manager.get_all(limit, offset).await?)
}

pub async fn update_event(manager: &EventManager, name: &str, description: Option<String>) -> anyhow::Result<()> {
    print_json(&manager.update_by_name(name, description).await?)
}

pub async fn delete_event(manager: &EventManager, name: &str) -> anyhow::Result<()> {
    print_json(&manager.delete_by_name(name).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_pattern::channels::cleanup::DEFAULT_CLOSE_TIMEOUT;
    use event_pattern::channels::redis::TokioRedisConnector;
    use event_pattern::channels::SessionControl;
    use event_pattern::FsEventStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn registry() -> ChannelRegistry {
        ChannelRegistry::with_builtin(Arc::new(TokioRedisConnector::default()), DEFAULT_CLOSE_TIMEOUT)
    }

    /// Session whose manual trigger never sees a message.
    struct Idle {
        closed: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl SessionControl for Idle {
        fn supports_manual_trigger(&self) -> bool {
            true
        }

        async fn manual_trigger(&mut self) -> Result<(), event_pattern::ChannelError> {
            std::future::pending().await
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_interrupted_once_still_closes_session() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut session = TriggerSession::new(Box::new(Idle { closed: closed.clone() }));

        run_session(&mut session, true, async { Ok(()) }).await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_continuous_listen_closes_on_shutdown() {
        let closed = Arc::new(AtomicBool::new(false));
        let mut session = TriggerSession::new(Box::new(Idle { closed: closed.clone() }));

        run_session(&mut session, false, async { Ok(()) }).await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pick_channel_precedence() {
        let registry = registry();
        let mut settings = Settings::default();

        assert_eq!(pick_channel(&registry, None, &settings).as_deref(), Some("redis"));

        settings.channel = Some("postgres".into());
        assert_eq!(pick_channel(&registry, None, &settings).as_deref(), Some("postgres"));

        assert_eq!(
            pick_channel(&registry, Some("kafka".into()), &settings).as_deref(),
            Some("kafka")
        );
    }

    #[tokio::test]
    async fn test_event_commands() {
        let dir = tempfile::tempdir().unwrap();
        let manager = EventManager::new(Arc::new(FsEventStore::new(dir.path())));

        create_event(&manager, "order.created", Some("first".into())).await.unwrap();
        get_event(&manager, None, Some("order.created".into())).await.unwrap();
        update_event(&manager, "order.created", Some("second".into())).await.unwrap();
        list_events(&manager, None, None).await.unwrap();
        delete_event(&manager, "order.created").await.unwrap();

        assert!(get_event(&manager, None, Some("order.created".into())).await.is_err());
        assert!(get_event(&manager, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_without_credentials_fails() {
        let registry = registry();
        let settings = Settings::default();

        let err = publish(&registry, &settings, None, "order.created", vec!["{}".into()], false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("credential"));

        let err = publish(&registry, &settings, None, "order.created", vec!["not json".into()], false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
