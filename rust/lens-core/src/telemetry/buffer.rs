//! Bounded FIFO buffer with cursor queries.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::filters::RecordFilter;
use super::records::Timestamped;

/// A stored record with its append sequence number.
///
/// Sequence numbers start at 1, grow by one per append and survive
/// eviction, so gaps reveal dropped records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequenced<T> {
    pub sequence: u64,
    #[serde(flatten)]
    pub record: T,
}

/// Query over one buffer.
///
/// Cursors are strict: `after_timestamp: t` returns only records with
/// `timestamp_ms > t`. Records sharing a millisecond are ordered by
/// sequence; use `after_sequence` to resume between them exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query<F> {
    pub after_timestamp: Option<i64>,
    pub after_sequence: Option<u64>,
    pub filter: Option<F>,
    /// Keep at most this many of the most recent matches.
    pub last: Option<usize>,
}

impl<F> Default for Query<F> {
    fn default() -> Self {
        Self {
            after_timestamp: None,
            after_sequence: None,
            filter: None,
            last: None,
        }
    }
}

impl<F> Query<F> {
    #[must_use]
    pub fn after_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.after_timestamp = Some(timestamp_ms);
        self
    }

    #[must_use]
    pub fn after_sequence(mut self, sequence: u64) -> Self {
        self.after_sequence = Some(sequence);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: F) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn last(mut self, count: usize) -> Self {
        self.last = Some(count);
        self
    }
}

#[derive(Debug)]
struct Inner<T> {
    entries: VecDeque<Sequenced<T>>,
    next_sequence: u64,
}

/// Fixed-capacity, append-only ring buffer.
///
/// Appends evict from the front once full; queries copy matching records
/// out under the lock, so readers never see a partially evicted buffer.
#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
}

impl<T: Clone + Timestamped> RingBuffer<T> {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                next_sequence: 1,
            }),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full. Returns its sequence.
    pub fn append(&self, record: T) -> u64 {
        let mut inner = self.inner.lock();
        // No tracing in here: the log buffer is itself fed by a tracing layer.
        while inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.push_back(Sequenced { sequence, record });
        sequence
    }

    /// Matching records, oldest first, with their sequence numbers.
    pub fn query_sequenced<F: RecordFilter<T>>(&self, query: &Query<F>) -> Vec<Sequenced<T>> {
        let inner = self.inner.lock();
        let mut result: Vec<_> = inner
            .entries
            .iter()
            .filter(|e| query.after_timestamp.is_none_or(|t| e.record.timestamp_ms() > t))
            .filter(|e| query.after_sequence.is_none_or(|s| e.sequence > s))
            .filter(|e| query.filter.as_ref().is_none_or(|f| f.matches(&e.record)))
            .cloned()
            .collect();
        drop(inner);

        if let Some(last) = query.last {
            let skip = result.len().saturating_sub(last);
            result.drain(..skip);
        }
        result
    }

    /// Matching records, oldest first.
    pub fn query<F: RecordFilter<T>>(&self, query: &Query<F>) -> Vec<T> {
        self.query_sequenced(query)
            .into_iter()
            .map(|e| e.record)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every record. Sequence numbers keep counting.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let cleared = inner.entries.len();
        inner.entries.clear();
        cleared
    }
}
