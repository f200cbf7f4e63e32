//! Record filters.
//!
//! Every field is optional. Values inside one field are alternatives (OR);
//! set fields must all hold (AND). An empty list constrains nothing.

use serde::{Deserialize, Serialize};

use super::records::{EmissionEntry, ErrorEntry, LogEntry, LogLevel, RunNodeKind, RunRecord};
use crate::model::NodeKind;

/// Predicate over one record type.
pub trait RecordFilter<T> {
    fn matches(&self, record: &T) -> bool;
}

/// No filtering at all.
impl<T> RecordFilter<T> for () {
    fn matches(&self, _record: &T) -> bool {
        true
    }
}

fn any_of<V: PartialEq>(allowed: Option<&Vec<V>>, value: &V) -> bool {
    match allowed {
        Some(values) if !values.is_empty() => values.contains(value),
        _ => true,
    }
}

fn any_of_optional(allowed: Option<&Vec<String>>, value: Option<&String>) -> bool {
    match (allowed, value) {
        (Some(values), _) if values.is_empty() => true,
        (Some(values), Some(value)) => values.contains(value),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn includes(needle: Option<&String>, haystack: &str) -> bool {
    needle.is_none_or(|n| haystack.contains(n.as_str()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogFilter {
    pub levels: Option<Vec<LogLevel>>,
    pub message_includes: Option<String>,
    pub correlation_ids: Option<Vec<String>>,
}

impl RecordFilter<LogEntry> for LogFilter {
    fn matches(&self, record: &LogEntry) -> bool {
        any_of(self.levels.as_ref(), &record.level)
            && includes(self.message_includes.as_ref(), &record.message)
            && any_of_optional(self.correlation_ids.as_ref(), record.correlation_id.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmissionFilter {
    pub event_ids: Option<Vec<String>>,
    pub emitter_ids: Option<Vec<String>>,
    pub correlation_ids: Option<Vec<String>>,
}

impl RecordFilter<EmissionEntry> for EmissionFilter {
    fn matches(&self, record: &EmissionEntry) -> bool {
        any_of(self.event_ids.as_ref(), &record.event_id)
            && any_of_optional(self.emitter_ids.as_ref(), record.emitter_id.as_ref())
            && any_of_optional(self.correlation_ids.as_ref(), record.correlation_id.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorFilter {
    pub source_ids: Option<Vec<String>>,
    pub source_kinds: Option<Vec<NodeKind>>,
    pub message_includes: Option<String>,
    pub correlation_ids: Option<Vec<String>>,
}

impl RecordFilter<ErrorEntry> for ErrorFilter {
    fn matches(&self, record: &ErrorEntry) -> bool {
        any_of(self.source_ids.as_ref(), &record.source_id)
            && any_of(self.source_kinds.as_ref(), &record.source_kind)
            && includes(self.message_includes.as_ref(), &record.message)
            && any_of_optional(self.correlation_ids.as_ref(), record.correlation_id.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunFilter {
    pub node_ids: Option<Vec<String>>,
    pub node_kinds: Option<Vec<RunNodeKind>>,
    pub ok: Option<bool>,
    pub parent_ids: Option<Vec<String>>,
    pub root_ids: Option<Vec<String>>,
    pub correlation_ids: Option<Vec<String>>,
}

impl RecordFilter<RunRecord> for RunFilter {
    fn matches(&self, record: &RunRecord) -> bool {
        any_of(self.node_ids.as_ref(), &record.node_id)
            && any_of(self.node_kinds.as_ref(), &record.node_kind)
            && self.ok.is_none_or(|ok| ok == record.ok)
            && any_of_optional(self.parent_ids.as_ref(), record.parent_id.as_ref())
            && any_of_optional(self.root_ids.as_ref(), record.root_id.as_ref())
            && any_of_optional(self.correlation_ids.as_ref(), record.correlation_id.as_ref())
    }
}
