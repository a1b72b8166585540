//! Job domain types: identity, wire payload and reserved jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use ulid::Ulid;

/// The argument bundle carried by a job.
pub type Args = serde_json::Map<String, Value>;

/// Unique identifier for a job.
///
/// Fresh ids are ULIDs, but any string read off the wire is accepted so
/// payloads written by other producers still decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// The id as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building, encoding or decoding payloads.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Encoding error: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("Job arguments must be an object or null, got {0}")]
    ArgumentShape(&'static str),
}

/// Check that job arguments are a single map (or absent).
pub fn validate_args(args: Value) -> Result<Option<Args>, PayloadError> {
    match args {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::Bool(_) => Err(PayloadError::ArgumentShape("bool")),
        Value::Number(_) => Err(PayloadError::ArgumentShape("number")),
        Value::String(_) => Err(PayloadError::ArgumentShape("string")),
        Value::Array(_) => Err(PayloadError::ArgumentShape("array")),
    }
}

/// The serialised unit of work stored in a queue list.
///
/// On the wire this is `{"class", "args": [bundle], "id", "queue_time"}`
/// where `queue_time` is a fractional Unix timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WirePayload", try_from = "WirePayload")]
pub struct Payload {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Type of work (used for routing to handlers).
    pub class: String,
    /// Argument bundle, if any.
    pub args: Option<Args>,
    /// When the job was created.
    pub queued_at: DateTime<Utc>,
}

impl Payload {
    /// Create a payload with a fresh id, validating the argument shape.
    pub fn new(class: impl Into<String>, args: Value) -> Result<Self, PayloadError> {
        Ok(Self::with_id(JobId::new(), class, validate_args(args)?))
    }

    /// Create a payload with an explicit id.
    pub fn with_id(id: JobId, class: impl Into<String>, args: Option<Args>) -> Self {
        Self {
            id,
            class: class.into(),
            args,
            queued_at: Utc::now(),
        }
    }

    /// Serialise to the JSON wire format.
    pub fn encode(&self) -> Result<String, PayloadError> {
        serde_json::to_string(self).map_err(PayloadError::Encoding)
    }

    /// Parse the JSON wire format.
    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        serde_json::from_str(raw).map_err(|e| PayloadError::Malformed(e.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct WirePayload {
    class: String,
    #[serde(default)]
    args: Vec<Value>,
    id: JobId,
    #[serde(default)]
    queue_time: f64,
}

impl From<Payload> for WirePayload {
    fn from(payload: Payload) -> Self {
        let bundle = payload.args.map_or(Value::Null, Value::Object);
        Self {
            class: payload.class,
            args: vec![bundle],
            id: payload.id,
            queue_time: payload.queued_at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

impl TryFrom<WirePayload> for Payload {
    type Error = PayloadError;

    fn try_from(wire: WirePayload) -> Result<Self, Self::Error> {
        let args = match wire.args.into_iter().next() {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(PayloadError::Malformed(format!(
                    "args bundle must be an object, got {other}"
                )));
            }
        };

        if !wire.queue_time.is_finite() {
            return Err(PayloadError::Malformed("queue_time is not finite".into()));
        }
        let micros = (wire.queue_time * 1_000_000.0).round() as i64;
        let queued_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| PayloadError::Malformed(format!("queue_time out of range: {}", wire.queue_time)))?;

        Ok(Self {
            id: wire.id,
            class: wire.class,
            args,
            queued_at,
        })
    }
}

/// A reserved job: a payload plus the queue it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// The queue this job was reserved from.
    pub queue: String,
    pub payload: Payload,
}

impl Job {
    /// Attach the name of the queue a payload was reserved from.
    pub fn new(queue: impl Into<String>, payload: Payload) -> Self {
        Self {
            queue: queue.into(),
            payload,
        }
    }

    /// The job's id.
    pub fn id(&self) -> &JobId {
        &self.payload.id
    }

    /// The job class, which selects its handler.
    pub fn class(&self) -> &str {
        &self.payload.class
    }

    /// The argument bundle, if the job was created with one.
    pub fn args(&self) -> Option<&Args> {
        self.payload.args.as_ref()
    }
}
