use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use uuid::Uuid;

use super::EventRepository;
use crate::error::{StoreError, StoreResult};
use crate::types::{EventDefinition, EventLookup, NewEvent};

pub const DEFAULT_BASE_DIR: &str = ".events";
const INDEX_FILE: &str = "index.json";
const EVENTS_DIR: &str = "events";

/// Event definitions kept as JSON files under a base directory:
///
/// ```text
/// <base>/index.json          {"<id>": "<name>", ...} in insertion order
/// <base>/events/<name>.json  {"id": ..., "name": ..., "description": ...}
/// ```
///
/// Names are not unique at this layer: creating a second record with an
/// existing name overwrites the content file while both ids stay in the
/// index. There is no locking; concurrent writers must serialise themselves.
#[derive(Debug, Clone)]
pub struct FsEventStore {
    base: PathBuf,
}

impl FsEventStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn index_path(&self) -> PathBuf {
        self.base.join(INDEX_FILE)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.base.join(EVENTS_DIR).join(format!("{}.json", name))
    }

    /// Load the id -> name index, creating an empty one if missing.
    async fn load_index(&self) -> StoreResult<Map<String, Value>> {
        match fs::read_to_string(self.index_path()).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let index = Map::new();
                self.save_index(&index).await?;
                Ok(index)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_index(&self, index: &Map<String, Value>) -> StoreResult<()> {
        fs::create_dir_all(&self.base).await?;
        fs::write(self.index_path(), serde_json::to_string_pretty(index)?).await?;
        Ok(())
    }

    fn name_of(index: &Map<String, Value>, id: &str) -> Option<String> {
        index.get(id).and_then(Value::as_str).map(str::to_string)
    }

    async fn read_record(&self, name: &str) -> StoreResult<Option<EventDefinition>> {
        match fs::read_to_string(self.record_path(name)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the index entry and the content record.
    async fn upsert(&self, event: &EventDefinition) -> StoreResult<()> {
        let mut index = self.load_index().await?;
        index.insert(event.id.to_string(), Value::String(event.name.clone()));
        self.save_index(&index).await?;

        fs::create_dir_all(self.base.join(EVENTS_DIR)).await?;
        fs::write(
            self.record_path(&event.name),
            serde_json::to_string_pretty(event)?,
        )
        .await?;
        Ok(())
    }
}

impl Default for FsEventStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}

#[async_trait]
impl EventRepository for FsEventStore {
    async fn create(&self, event: NewEvent) -> StoreResult<EventDefinition> {
        let created = EventDefinition {
            id: Uuid::new_v4(),
            name: event.name,
            description: event.description,
        };
        self.upsert(&created).await?;
        tracing::info!(id = %created.id, name = %created.name, "created event definition");
        Ok(created)
    }

    async fn update(&self, event: EventDefinition) -> StoreResult<EventDefinition> {
        let lookup = EventLookup::Id(event.id);
        if self.get(&lookup).await?.is_none() {
            return Err(StoreError::NotFound(event.id));
        }
        self.delete(event.id).await?;
        self.upsert(&event).await?;
        tracing::info!(id = %event.id, name = %event.name, "updated event definition");
        Ok(event)
    }

    async fn get(&self, lookup: &EventLookup) -> StoreResult<Option<EventDefinition>> {
        let name = match lookup {
            EventLookup::Name(name) => Some(name.clone()),
            EventLookup::Id(id) => Self::name_of(&self.load_index().await?, &id.to_string()),
        };
        match name {
            Some(name) if !name.is_empty() => self.read_record(&name).await,
            _ => Ok(None),
        }
    }

    async fn get_all(&self, limit: Option<usize>, offset: Option<usize>) -> StoreResult<Vec<EventDefinition>> {
        let index = self.load_index().await?;
        let start = offset.unwrap_or(0);
        let take = match limit {
            Some(limit) if limit > 0 => limit,
            _ => usize::MAX,
        };

        let mut events = Vec::new();
        for name in index.values().skip(start).take(take).filter_map(Value::as_str) {
            if let Some(event) = self.read_record(name).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<EventDefinition>> {
        let Some(event) = self.get(&EventLookup::Id(id)).await? else {
            return Ok(None);
        };

        match fs::remove_file(self.record_path(&event.name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut index = self.load_index().await?;
        index.shift_remove(&id.to_string());
        self.save_index(&index).await?;

        tracing::info!(id = %id, name = %event.name, "deleted event definition");
        Ok(Some(event))
    }
}
