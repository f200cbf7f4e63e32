//! Tracing layer feeding the log buffer.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use super::Telemetry;
use super::records::{LogEntry, LogLevel};

/// Copies every tracing event into [`Telemetry`] as a [`LogEntry`].
///
/// The `message` field becomes the entry message, a `correlation_id` field
/// becomes the correlation id, and all other fields land in `data`.
///
/// ```rust,ignore
/// use tracing_subscriber::prelude::*;
///
/// let telemetry = Arc::new(Telemetry::default());
/// tracing_subscriber::registry()
///     .with(TelemetryLayer::new(Arc::clone(&telemetry)))
///     .init();
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryLayer {
    telemetry: Arc<Telemetry>,
}

impl TelemetryLayer {
    pub fn new(telemetry: Arc<Telemetry>) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for TelemetryLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut data = visitor.fields;
        data.insert("target".to_string(), Value::String(metadata.target().to_string()));

        let entry = LogEntry {
            timestamp_ms: super::now_ms(),
            level: LogLevel::from(metadata.level()),
            message: visitor
                .message
                .unwrap_or_else(|| metadata.name().to_string()),
            data: Some(Value::Object(data)),
            correlation_id: visitor.correlation_id,
        };
        self.telemetry.record_log(entry);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    correlation_id: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => {
                self.message = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
            }
            "correlation_id" => {
                self.correlation_id = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                });
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{LogFilter, Query};
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_become_log_entries() {
        let telemetry = Arc::new(Telemetry::default());
        let subscriber =
            tracing_subscriber::registry().with(TelemetryLayer::new(Arc::clone(&telemetry)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(task_id = "app.tasks.a", attempts = 3, correlation_id = "c-9", "Retrying task");
            tracing::info!("Plain message");
        });

        let logs = telemetry.logs(&Query::<LogFilter>::default());
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].level, LogLevel::Warn);
        assert_eq!(logs[0].message, "Retrying task");
        assert_eq!(logs[0].correlation_id.as_deref(), Some("c-9"));
        let data = logs[0].data.as_ref().unwrap();
        assert_eq!(data["task_id"], Value::String("app.tasks.a".to_string()));
        assert_eq!(data["attempts"], Value::from(3));
        assert!(data.get("correlation_id").is_none());
        assert_eq!(logs[1].message, "Plain message");
    }
}
