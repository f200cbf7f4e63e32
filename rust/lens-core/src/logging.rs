//! Structured logging utilities.
//!
//! Subscriber setup plus an operation timer used around snapshot builds,
//! index builds and durable extraction.

use std::sync::Arc;
use std::time::Instant;

use tracing::Subscriber;
use tracing_subscriber::filter::{Filtered, LevelFilter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};
use crate::telemetry::{Telemetry, TelemetryLayer};

/// Console filter: `RUST_LOG` if set, else this crate and durable-lens at
/// the configured level.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lens_core={level},durable_lens={level}",
            level = config.level
        ))
    })
}

/// Capture filter: the configured level for every target, host crates included.
fn capture_filter(config: &LoggingConfig) -> LevelFilter {
    config.level.parse().unwrap_or(LevelFilter::INFO)
}

fn capture_layer<S>(
    config: &LoggingConfig,
    telemetry: Option<Arc<Telemetry>>,
) -> Option<Filtered<TelemetryLayer, LevelFilter, S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    telemetry.map(|t| TelemetryLayer::new(t).with_filter(capture_filter(config)))
}

/// Install the global tracing subscriber.
///
/// When `telemetry` is given, every tracing event at or above the configured
/// level is also copied into its log buffer, whatever its target. The console
/// filter only narrows what is printed. Returns `false` if a global subscriber
/// was already installed.
pub fn init_tracing(config: &LoggingConfig, telemetry: Option<Arc<Telemetry>>) -> bool {
    let registry = tracing_subscriber::registry().with(capture_layer(config, telemetry));

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(env_filter(config)),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_filter(env_filter(config)))
            .try_init(),
    };
    result.is_ok()
}

/// Operation timer for measuring and logging execution duration.
///
/// ```rust,ignore
/// let timer = OpTimer::new("snapshot", "build");
/// // ... perform operation ...
/// timer.finish();
/// ```
#[derive(Debug)]
pub struct OpTimer {
    /// Component being timed (e.g., "snapshot", "introspector").
    component: &'static str,
    /// Operation being performed (e.g., "build", "populate_tunnels").
    operation: &'static str,
    start: Instant,
}

impl OpTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        tracing::debug!(component, operation, "Operation started");

        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the timer started.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Finishes the timer and logs the duration.
    pub fn finish(self) {
        tracing::info!(
            component = self.component,
            operation = self.operation,
            duration_ms = self.elapsed_ms(),
            "Operation completed"
        );
    }

    /// Finishes the timer with a count of produced items.
    pub fn finish_with_count(self, what: &'static str, count: usize) {
        tracing::info!(
            component = self.component,
            operation = self.operation,
            duration_ms = self.elapsed_ms(),
            count,
            what,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_timer_creation() {
        let timer = OpTimer::new("snapshot", "build");
        assert_eq!(timer.component, "snapshot");
        assert_eq!(timer.operation, "build");
        timer.finish();
    }

    #[test]
    fn test_host_events_reach_telemetry() {
        let config = LoggingConfig::default();
        let telemetry = Arc::new(Telemetry::default());
        let subscriber = tracing_subscriber::registry()
            .with(capture_layer(&config, Some(Arc::clone(&telemetry))))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(EnvFilter::new("lens_core=info")),
            );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "checkout_app::orders", "Order placed");
            tracing::debug!(target: "checkout_app::orders", "Cart details");
        });

        let logs = telemetry.logs(&crate::telemetry::Query::default());
        let messages: Vec<&str> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["Order placed"]);
    }

    #[test]
    fn test_capture_level_falls_back_to_info() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(capture_filter(&config), LevelFilter::INFO);
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(capture_filter(&config), LevelFilter::DEBUG);
    }

    #[test]
    fn test_op_timer_finish_with_count() {
        let timer = OpTimer::new("introspector", "build");
        timer.finish_with_count("diagnostics", 3);
    }
}
