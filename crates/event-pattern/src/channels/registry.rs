use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::redis::RedisConnector;
use super::{EventChannel, PostgresChannel, RedisChannel};
use crate::error::ChannelError;

/// A selectable channel as shown to whoever configures the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOption {
    pub name: String,
    pub value: String,
}

/// The set of known channels, in registration order.
///
/// Constructed once by the process entry point and passed to whatever
/// publishes or listens.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<Arc<dyn EventChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in channel, Redis reached through `connector`.
    pub fn with_builtin(connector: Arc<dyn RedisConnector>, close_timeout: Duration) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PostgresChannel::new()));
        registry.register(Arc::new(
            RedisChannel::new(connector).with_close_timeout(close_timeout),
        ));
        registry
    }

    /// Add a channel. A later channel with the same name replaces the earlier
    /// one in place, keeping its position.
    pub fn register(&mut self, channel: Arc<dyn EventChannel>) {
        let name = channel.credential_name();
        match self
            .channels
            .iter_mut()
            .find(|existing| existing.credential_name() == name)
        {
            Some(slot) => *slot = channel,
            None => self.channels.push(channel),
        }
    }

    /// Channels ready for use, in registration order.
    pub fn active_channels(&self) -> Vec<Arc<dyn EventChannel>> {
        self.channels
            .iter()
            .filter(|channel| !channel.is_inactive())
            .cloned()
            .collect()
    }

    /// First active channel in registration order.
    pub fn default_channel(&self) -> Option<Arc<dyn EventChannel>> {
        self.channels
            .iter()
            .find(|channel| !channel.is_inactive())
            .cloned()
    }

    pub fn credential_names(&self) -> Vec<&'static str> {
        self.channels
            .iter()
            .filter(|channel| !channel.is_inactive())
            .map(|channel| channel.credential_name())
            .collect()
    }

    /// Display options for the active channels.
    pub fn options(&self) -> Vec<ChannelOption> {
        self.credential_names()
            .into_iter()
            .map(|value| ChannelOption {
                name: capitalize(value),
                value: value.to_string(),
            })
            .collect()
    }

    /// Look up an active channel by name.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn EventChannel>, ChannelError> {
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ChannelError::config("channel not set")),
        };

        self.channels
            .iter()
            .find(|channel| channel.credential_name() == name && !channel.is_inactive())
            .cloned()
            .ok_or_else(|| ChannelError::config(format!("channel \"{}\" not found", name)))
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.channels.iter().map(|c| c.credential_name()).collect();
        f.debug_struct("ChannelRegistry").field("channels", &names).finish()
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
