//! Telemetry record shapes. Records are immutable once appended.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::NodeKind;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Records that carry an append timestamp.
pub trait Timestamped {
    fn timestamp_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO => Self::Info,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::TRACE => Self::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_ms: i64,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            level,
            message: message.into(),
            data: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionEntry {
    pub timestamp_ms: i64,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl EmissionEntry {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            event_id: event_id.into(),
            emitter_id: None,
            payload: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use]
    pub fn from_emitter(mut self, emitter_id: impl Into<String>) -> Self {
        self.emitter_id = Some(emitter_id.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub timestamp_ms: i64,
    pub source_id: String,
    pub source_kind: NodeKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ErrorEntry {
    pub fn new(source_id: impl Into<String>, source_kind: NodeKind, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            source_id: source_id.into(),
            source_kind,
            message: message.into(),
            stack: None,
            data: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Kind of node a run record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunNodeKind {
    Task,
    Hook,
}

impl From<RunNodeKind> for NodeKind {
    fn from(kind: RunNodeKind) -> Self {
        match kind {
            RunNodeKind::Task => NodeKind::Task,
            RunNodeKind::Hook => NodeKind::Hook,
        }
    }
}

/// One completed task or hook execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub timestamp_ms: i64,
    pub node_id: String,
    pub node_kind: RunNodeKind,
    pub duration_ms: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl RunRecord {
    /// A successful run of `node_id`.
    pub fn ok(node_id: impl Into<String>, node_kind: RunNodeKind, duration_ms: u64) -> Self {
        Self {
            timestamp_ms: now_ms(),
            node_id: node_id.into(),
            node_kind,
            duration_ms,
            ok: true,
            error: None,
            parent_id: None,
            root_id: None,
            correlation_id: None,
        }
    }

    /// A failed run of `node_id`.
    pub fn failed(
        node_id: impl Into<String>,
        node_kind: RunNodeKind,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::ok(node_id, node_kind, duration_ms)
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

macro_rules! impl_timestamped {
    ($($ty:ty),*) => {
        $(
            impl Timestamped for $ty {
                fn timestamp_ms(&self) -> i64 {
                    self.timestamp_ms
                }
            }
        )*
    };
}

impl_timestamped!(LogEntry, EmissionEntry, ErrorEntry, RunRecord);
