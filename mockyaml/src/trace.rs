//! Fixed-capacity trace ring buffer, recording every request's outcome for
//! the admin `/__admin/trace` endpoint.
//!
//! Insertion happens after the response is written, so a single mutex over
//! the ring is acceptable — it never sits on the latency-critical path.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::evaluator::TraceCandidate;

/// A single recorded request outcome.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Wall-clock time the request was recorded, RFC3339.
    pub timestamp: String,
    /// Request method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// The matched scenario id, if any.
    pub matched_id: Option<String>,
    /// Whether the matched scenario was rate-limited away.
    pub rate_limited: bool,
    /// Per-candidate evaluation trace.
    pub candidates: Vec<TraceCandidate>,
}

/// A bounded, mutex-guarded ring of the most recent [`Entry`] values.
pub struct TraceRing {
    capacity: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl TraceRing {
    /// Creates a ring holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends an entry, evicting the oldest if the ring is full.
    pub fn push(&self, entry: Entry) {
        let mut entries = self.entries.lock().expect("trace ring mutex poisoned");
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the last `n` entries, newest last.
    pub fn last(&self, n: usize) -> Vec<Entry> {
        let entries = self.entries.lock().expect("trace ring mutex poisoned");
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str) -> Entry {
        Entry {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            method: method.to_string(),
            path: "/x".to_string(),
            matched_id: None,
            rate_limited: false,
            candidates: Vec::new(),
        }
    }

    #[test]
    fn evicts_oldest_once_full() {
        let ring = TraceRing::new(2);
        ring.push(entry("A"));
        ring.push(entry("B"));
        ring.push(entry("C"));
        let last = ring.last(10);
        assert_eq!(
            last.iter().map(|e| e.method.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );
    }

    #[test]
    fn last_n_returns_newest_last() {
        let ring = TraceRing::new(10);
        for m in ["A", "B", "C"] {
            ring.push(entry(m));
        }
        let last = ring.last(2);
        assert_eq!(
            last.iter().map(|e| e.method.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );
    }
}
