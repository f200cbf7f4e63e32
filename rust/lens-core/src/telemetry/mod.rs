//! Live telemetry: four bounded buffers for logs, emissions, errors and runs.

pub mod buffer;
pub mod filters;
pub mod layer;
pub mod records;

pub use buffer::{Query, RingBuffer, Sequenced};
pub use filters::{EmissionFilter, ErrorFilter, LogFilter, RecordFilter, RunFilter};
pub use layer::TelemetryLayer;
pub use records::{
    EmissionEntry, ErrorEntry, LogEntry, LogLevel, RunNodeKind, RunRecord, Timestamped, now_ms,
};

use crate::config::TelemetryConfig;

/// The telemetry hub shared by the host runtime and query consumers.
#[derive(Debug)]
pub struct Telemetry {
    logs: RingBuffer<LogEntry>,
    emissions: RingBuffer<EmissionEntry>,
    errors: RingBuffer<ErrorEntry>,
    runs: RingBuffer<RunRecord>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(&TelemetryConfig::default())
    }
}

impl Telemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            logs: RingBuffer::with_capacity(config.max_logs),
            emissions: RingBuffer::with_capacity(config.max_emissions),
            errors: RingBuffer::with_capacity(config.max_errors),
            runs: RingBuffer::with_capacity(config.max_runs),
        }
    }

    pub fn record_log(&self, entry: LogEntry) -> u64 {
        self.logs.append(entry)
    }

    pub fn record_emission(&self, entry: EmissionEntry) -> u64 {
        self.emissions.append(entry)
    }

    pub fn record_error(&self, entry: ErrorEntry) -> u64 {
        self.errors.append(entry)
    }

    pub fn record_run(&self, record: RunRecord) -> u64 {
        self.runs.append(record)
    }

    pub fn logs(&self, query: &Query<LogFilter>) -> Vec<LogEntry> {
        self.logs.query(query)
    }

    pub fn emissions(&self, query: &Query<EmissionFilter>) -> Vec<EmissionEntry> {
        self.emissions.query(query)
    }

    pub fn errors(&self, query: &Query<ErrorFilter>) -> Vec<ErrorEntry> {
        self.errors.query(query)
    }

    pub fn runs(&self, query: &Query<RunFilter>) -> Vec<RunRecord> {
        self.runs.query(query)
    }

    /// Direct buffer access, for sequence-aware reads.
    pub fn log_buffer(&self) -> &RingBuffer<LogEntry> {
        &self.logs
    }

    pub fn emission_buffer(&self) -> &RingBuffer<EmissionEntry> {
        &self.emissions
    }

    pub fn error_buffer(&self) -> &RingBuffer<ErrorEntry> {
        &self.errors
    }

    pub fn run_buffer(&self) -> &RingBuffer<RunRecord> {
        &self.runs
    }

    /// Empty every buffer.
    ///
    /// Logs before clearing: with a [`TelemetryLayer`] installed, the event
    /// itself lands in the log buffer and is dropped with the rest.
    pub fn clear(&self) {
        let pending =
            self.logs.len() + self.emissions.len() + self.errors.len() + self.runs.len();
        tracing::debug!(pending, "Clearing telemetry buffers");
        self.logs.clear();
        self.emissions.clear();
        self.errors.clear();
        self.runs.clear();
    }
}
