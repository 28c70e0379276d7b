use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored event definition.
///
/// `name` is the routing key used on the wire; `id` is assigned once at
/// creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Input for creating a new event definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewEvent {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

/// How to address a stored event definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLookup {
    Id(Uuid),
    Name(String),
}

impl EventLookup {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

/// Data handed to `publish`.
///
/// Text is sent verbatim; JSON is serialised to its compact text form, which
/// is also the form parsed back on receipt.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Json(value) => serde_json::to_string(value),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Execution mode declared by the host for a trigger invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Long-lived listening workflow: subscribe eagerly, deliver everything.
    #[default]
    Trigger,
    /// Interactive test run: subscribe only when the manual trigger fires.
    Manual,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Trigger => "trigger",
            ExecutionMode::Manual => "manual",
        }
    }
}

/// Wrap a received message body in the envelope handed to the emit sink.
///
/// Bodies that are not valid JSON are delivered as a JSON string.
pub fn envelope(body: &str) -> Value {
    let event = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "received non-JSON message body, delivering as string");
            Value::String(body.to_string())
        }
    };
    serde_json::json!({ "event": event })
}
