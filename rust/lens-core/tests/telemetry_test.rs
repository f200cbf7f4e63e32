//! Ring buffer cursors, eviction and filters.

use lens_core::model::NodeKind;
use lens_core::telemetry::{
    EmissionEntry, EmissionFilter, ErrorEntry, ErrorFilter, LogEntry, LogFilter, LogLevel, Query,
    RingBuffer, RunFilter, RunNodeKind, RunRecord,
};
use lens_core::Telemetry;
use lens_core::config::TelemetryConfig;
use proptest::prelude::*;

fn log_at(timestamp_ms: i64, message: &str) -> LogEntry {
    LogEntry::new(LogLevel::Info, message).at(timestamp_ms)
}

proptest! {
    /// Polling with the max timestamp already seen neither repeats a record
    /// nor misses one appended with a later timestamp.
    #[test]
    fn prop_timestamp_cursor_is_exactly_once(
        first in prop::collection::vec(0i64..1_000, 0..40),
        gaps in prop::collection::vec(1i64..50, 0..40),
    ) {
        let buffer = RingBuffer::with_capacity(first.len() + gaps.len() + 1);
        let mut first = first;
        first.sort_unstable();
        for (i, t) in first.iter().enumerate() {
            buffer.append(log_at(*t, &format!("first-{i}")));
        }

        let seen = buffer.query_sequenced(&Query::<()>::default());
        let cursor = seen.iter().map(|e| e.record.timestamp_ms).max().unwrap_or(-1);

        let mut t = cursor;
        for (i, gap) in gaps.iter().enumerate() {
            t += gap;
            buffer.append(log_at(t, &format!("second-{i}")));
        }

        let next = buffer.query_sequenced(&Query::<()>::default().after_timestamp(cursor));
        prop_assert_eq!(next.len(), gaps.len());
        for entry in &next {
            prop_assert!(seen.iter().all(|s| s.sequence != entry.sequence));
            prop_assert!(entry.record.message.starts_with("second-"));
        }
    }

    /// The sequence cursor is exact even when timestamps collide.
    #[test]
    fn prop_sequence_cursor_with_equal_timestamps(
        before in 0usize..30,
        after in 0usize..30,
    ) {
        let buffer = RingBuffer::with_capacity(before + after + 1);
        for _ in 0..before {
            buffer.append(log_at(7, "old"));
        }
        let cursor = buffer
            .query_sequenced(&Query::<()>::default())
            .last()
            .map_or(0, |e| e.sequence);
        for _ in 0..after {
            buffer.append(log_at(7, "new"));
        }

        let next = buffer.query(&Query::<()>::default().after_sequence(cursor));
        prop_assert_eq!(next.len(), after);
        prop_assert!(next.iter().all(|e| e.message == "new"));
    }

    /// Length never exceeds capacity, and the survivors are the newest.
    #[test]
    fn prop_fifo_eviction(capacity in 1usize..20, count in 0usize..60) {
        let buffer = RingBuffer::with_capacity(capacity);
        for i in 0..count {
            buffer.append(log_at(i64::try_from(i).unwrap(), &i.to_string()));
        }
        let kept = buffer.query(&Query::<()>::default());
        prop_assert_eq!(kept.len(), count.min(capacity));
        let expected: Vec<String> = (count.saturating_sub(capacity)..count)
            .map(|i| i.to_string())
            .collect();
        let actual: Vec<String> = kept.into_iter().map(|e| e.message).collect();
        prop_assert_eq!(actual, expected);
    }
}

#[test]
fn test_last_keeps_most_recent_matches() {
    let buffer = RingBuffer::with_capacity(10);
    for t in 1..=5 {
        buffer.append(log_at(t, &format!("m{t}")));
    }
    let last_two: Vec<String> = buffer
        .query(&Query::<()>::default().after_timestamp(1).last(2))
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(last_two, vec!["m4", "m5"]);
}

#[test]
fn test_filters_or_within_and_across_fields() {
    let telemetry = Telemetry::new(&TelemetryConfig::default());
    telemetry.record_log(LogEntry::new(LogLevel::Warn, "disk almost full").with_correlation_id("a"));
    telemetry.record_log(LogEntry::new(LogLevel::Error, "disk full").with_correlation_id("b"));
    telemetry.record_log(LogEntry::new(LogLevel::Info, "disk ok"));

    let warn_or_error = LogFilter {
        levels: Some(vec![LogLevel::Warn, LogLevel::Error]),
        ..LogFilter::default()
    };
    assert_eq!(telemetry.logs(&Query::default().filter(warn_or_error)).len(), 2);

    let error_with_b = LogFilter {
        levels: Some(vec![LogLevel::Warn, LogLevel::Error]),
        correlation_ids: Some(vec!["b".to_string()]),
        ..LogFilter::default()
    };
    let logs = telemetry.logs(&Query::default().filter(error_with_b));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "disk full");

    let substring = LogFilter {
        message_includes: Some("almost".to_string()),
        ..LogFilter::default()
    };
    assert_eq!(telemetry.logs(&Query::default().filter(substring)).len(), 1);
}

#[test]
fn test_emission_error_and_run_filters() {
    let telemetry = Telemetry::default();
    telemetry.record_emission(EmissionEntry::new("e1").from_emitter("t1"));
    telemetry.record_emission(EmissionEntry::new("e2"));
    telemetry.record_error(ErrorEntry::new("t1", NodeKind::Task, "boom"));
    telemetry.record_error(ErrorEntry::new("r1", NodeKind::Resource, "init failed"));
    telemetry.record_run(RunRecord::ok("t1", RunNodeKind::Task, 3));
    telemetry.record_run(RunRecord::failed("h1", RunNodeKind::Hook, 9, "nope"));

    let by_emitter = EmissionFilter {
        emitter_ids: Some(vec!["t1".to_string()]),
        ..EmissionFilter::default()
    };
    let emissions = telemetry.emissions(&Query::default().filter(by_emitter));
    assert_eq!(emissions.len(), 1);
    assert_eq!(emissions[0].event_id, "e1");

    let resource_errors = ErrorFilter {
        source_kinds: Some(vec![NodeKind::Resource]),
        ..ErrorFilter::default()
    };
    assert_eq!(telemetry.errors(&Query::default().filter(resource_errors))[0].source_id, "r1");

    let failed = RunFilter {
        ok: Some(false),
        ..RunFilter::default()
    };
    let runs = telemetry.runs(&Query::default().filter(failed));
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].node_kind, RunNodeKind::Hook);

    telemetry.clear();
    assert!(telemetry.runs(&Query::default()).is_empty());
    assert!(telemetry.logs(&Query::default()).is_empty());
}
