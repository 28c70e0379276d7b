use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Base directory of the event definition store
    #[serde(default = "default_events_dir")]
    pub events_dir: PathBuf,
    /// Channel used when none is given on the command line
    #[serde(default)]
    pub channel: Option<String>,
    /// Credentials by name, e.g. `credentials.redis.host`
    #[serde(default)]
    pub credentials: HashMap<String, Value>,
    #[serde(default = "default_close_timeout")]
    pub close_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_events_dir() -> PathBuf {
    PathBuf::from(event_pattern::store::fs::DEFAULT_BASE_DIR)
}

fn default_close_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            events_dir: default_events_dir(),
            channel: None,
            credentials: HashMap::new(),
            close_timeout_secs: default_close_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with defaults
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (not tracked by git)
            .add_source(File::with_name("config/local").required(false))
            // e.g. EVENT_PATTERN_CREDENTIALS__REDIS__HOST=localhost
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// `EVENT_PATTERN_` prefix, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix("EVENT_PATTERN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
