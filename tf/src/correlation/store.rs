//! Correlation store
//!
//! Owned exclusively by one loader instance and driven from its message
//! loop, so every operation here is plain sequential code - no locking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use taskmodel::TaskResource;

use super::entry::DataState;
use super::trace;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Overdue sub-requests re-sent this pass.
    pub retried: usize,
    /// Entries evicted for exceeding the TTL.
    pub evicted: usize,
}

/// In-memory map from correlation ID to in-flight query state.
#[derive(Debug)]
pub struct CorrelationStore {
    entries: HashMap<String, DataState>,
    entry_ttl: Duration,
    retry_window: Duration,
}

impl CorrelationStore {
    pub fn new(entry_ttl: Duration, retry_window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            entry_ttl,
            retry_window,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a freshly scattered entry. If every dispatch already failed
    /// there is nothing left to await, so the entry is delivered at once
    /// instead of being stored - this is the only scatter-time settlement.
    pub fn commit(&mut self, entry: DataState) {
        if entry.is_done() {
            entry.finalize();
            return;
        }
        self.entries.insert(entry.correlation_id().to_string(), entry);
    }

    /// Fold one sub-response into its entry. The entry key is derived from
    /// the trace ID; when the fold settles the last pending sub-request the
    /// entry is removed and its result delivered, in that single transition.
    pub fn resolve(&mut self, trace_id: &str, data: Option<TaskResource>) {
        let Some(key) = trace::correlation_key(trace_id) else {
            warn!(%trace_id, "State was not found: trace ID carries no parent");
            return;
        };
        let Some(entry) = self.entries.get_mut(key) else {
            warn!(state_id = %key, "State was not found");
            return;
        };

        entry.resolve(trace_id, data);
        if entry.is_done() {
            // The transition into the empty pending set is the one and only
            // finalization trigger.
            if let Some(done) = self.entries.remove(key) {
                done.finalize();
            }
        }
    }

    /// One maintenance pass: evict entries past the TTL (delivering whatever
    /// partial result they accumulated), and re-send pending sub-requests
    /// that are past their response deadline but still inside the retry
    /// window. Entries past the window but under the TTL are left alone.
    pub fn sweep(&mut self, now: Instant) -> SweepReport {
        let mut retried = 0;
        let mut expired: Vec<String> = Vec::new();

        for (key, entry) in &self.entries {
            if now > entry.created_at() + self.entry_ttl {
                warn!(state_id = %key, "Cleaning up state");
                expired.push(key.clone());
                continue;
            }

            let window_end = entry.created_at() + self.retry_window;
            for request in entry.pending_requests() {
                let deadline = entry.created_at() + request.max_response_time();
                if now < window_end && now > deadline {
                    request.resend();
                    retried += 1;
                }
            }
        }

        let evicted = expired.len();
        // Removal is deferred past the scan so the map is never mutated
        // while iterated.
        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                entry.finalize();
            }
        }

        if evicted > 0 {
            debug!(evicted, "Sweep evicted expired state");
        }
        SweepReport { retried, evicted }
    }
}
