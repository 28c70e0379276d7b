//! Management operations over stored event definitions.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::EventRepository;
use crate::types::{EventDefinition, EventLookup, NewEvent};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("event '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

/// `(name, id)` pair for pickers listing known events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOption {
    pub name: String,
    pub value: String,
}

/// Create, read, update and delete event definitions.
///
/// Only the description of an existing definition can change; its name and
/// id are fixed once created.
#[derive(Clone)]
pub struct EventManager {
    repo: Arc<dyn EventRepository>,
}

impl EventManager {
    pub fn new(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str, description: Option<String>) -> Result<EventDefinition> {
        let name = validate_name(name)?;
        Ok(self.repo.create(NewEvent::new(name, non_empty(description))).await?)
    }

    pub async fn get(&self, lookup: &EventLookup) -> Result<Option<EventDefinition>> {
        Ok(self.repo.get(lookup).await?)
    }

    pub async fn get_all(&self, limit: Option<usize>, offset: Option<usize>) -> Result<Vec<EventDefinition>> {
        Ok(self.repo.get_all(limit, offset).await?)
    }

    /// Change the description of the definition with `id`.
    pub async fn update(&self, id: Uuid, description: Option<String>) -> Result<EventDefinition> {
        let existing = self
            .repo
            .get(&EventLookup::Id(id))
            .await?
            .ok_or_else(|| ManagerError::NotFound(id.to_string()))?;
        self.replace_description(existing, description).await
    }

    pub async fn update_by_name(&self, name: &str, description: Option<String>) -> Result<EventDefinition> {
        let existing = self.require_by_name(name).await?;
        self.replace_description(existing, description).await
    }

    /// `None` if nothing with `id` exists.
    pub async fn delete(&self, id: Uuid) -> Result<Option<EventDefinition>> {
        Ok(self.repo.delete(id).await?)
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<EventDefinition> {
        let existing = self.require_by_name(name).await?;
        self.repo
            .delete(existing.id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(existing.id.to_string()))
    }

    /// Every stored event as a picker option. Storage failures yield an
    /// empty list.
    pub async fn list_options(&self) -> Vec<EventOption> {
        match self.repo.get_all(None, None).await {
            Ok(events) => events
                .into_iter()
                .map(|e| EventOption {
                    name: e.name,
                    value: e.id.to_string(),
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list events");
                Vec::new()
            }
        }
    }

    async fn require_by_name(&self, name: &str) -> Result<EventDefinition> {
        let name = validate_name(name)?;
        self.repo
            .get(&EventLookup::name(name))
            .await?
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))
    }

    async fn replace_description(
        &self,
        existing: EventDefinition,
        description: Option<String>,
    ) -> Result<EventDefinition> {
        let updated = EventDefinition {
            description: non_empty(description),
            ..existing
        };
        Ok(self.repo.update(updated).await?)
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ManagerError::Config("event name is required".into()));
    }
    if name.contains(|c: char| c == '/' || c == '\\') || name == "." || name == ".." {
        return Err(ManagerError::Config(format!(
            "event name '{}' cannot contain path separators",
            name
        )));
    }
    Ok(name)
}

fn non_empty(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.is_empty())
}
