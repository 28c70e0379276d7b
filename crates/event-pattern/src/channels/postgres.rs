use std::sync::Arc;

use async_trait::async_trait;

use super::session::TriggerSession;
use super::EventChannel;
use crate::context::{CredentialSource, TriggerContext};
use crate::error::ChannelError;
use crate::types::Payload;

/// Postgres LISTEN/NOTIFY channel. Registered but inactive.
#[derive(Debug, Default, Clone)]
pub struct PostgresChannel;

impl PostgresChannel {
    pub const CREDENTIAL_NAME: &'static str = "postgres";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventChannel for PostgresChannel {
    fn credential_name(&self) -> &'static str {
        Self::CREDENTIAL_NAME
    }

    fn is_inactive(&self) -> bool {
        true
    }

    async fn publish(
        &self,
        _event: &str,
        _payload: &Payload,
        _ctx: &dyn CredentialSource,
    ) -> Result<(), ChannelError> {
        Err(ChannelError::NotImplemented(Self::CREDENTIAL_NAME))
    }

    async fn trigger(
        &self,
        _event: &str,
        _ctx: Arc<dyn TriggerContext>,
    ) -> Result<TriggerSession, ChannelError> {
        Err(ChannelError::NotImplemented(Self::CREDENTIAL_NAME))
    }
}
