use std::collections::HashMap;

use async_trait::async_trait;
use event_pattern::{ChannelError, CredentialSource, ExecutionMode, TriggerContext};
use serde_json::Value;

/// Host context backed by configured credentials; deliveries go to stdout.
pub struct CliContext {
    credentials: HashMap<String, Value>,
    mode: ExecutionMode,
}

impl CliContext {
    pub fn new(credentials: HashMap<String, Value>, mode: ExecutionMode) -> Self {
        Self { credentials, mode }
    }
}

#[async_trait]
impl CredentialSource for CliContext {
    async fn credentials(&self, name: &str) -> Result<Value, ChannelError> {
        self.credentials.get(name).cloned().ok_or_else(|| {
            ChannelError::Credential(format!(
                "credential \"{}\" not configured (set credentials.{} in config or EVENT_PATTERN_CREDENTIALS__{}__HOST)",
                name,
                name,
                name.to_uppercase()
            ))
        })
    }
}

impl TriggerContext for CliContext {
    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    fn emit(&self, data: Value) {
        println!("{}", data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_credentials_lookup() {
        let mut credentials = HashMap::new();
        credentials.insert("redis".to_string(), json!({"host": "localhost", "port": 6379}));
        let ctx = CliContext::new(credentials, ExecutionMode::Trigger);

        assert_eq!(ctx.credentials("redis").await.unwrap()["port"], 6379);
        assert!(matches!(
            ctx.credentials("postgres").await,
            Err(ChannelError::Credential(_))
        ));
        assert_eq!(ctx.mode(), ExecutionMode::Trigger);
    }
}
