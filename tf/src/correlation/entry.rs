//! Per-query correlation entry

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use taskmodel::{TaskResource, TaskResponse};

/// Per-id failure surfaced to the caller when a sub-request could not be
/// handed to any worker. Sibling ids in the same query are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot load Task data for id \"{id}\"")]
pub struct LoadError {
    pub id: i32,
}

/// One per-id outcome in a finalized reply.
pub type ItemResult = Result<TaskResponse, LoadError>;

/// Where a finalized (or, for feeds, each incremental) result goes.
///
/// Batch targets receive the complete ordered list once; feed targets
/// receive one item per resolved id as soon as it resolves, and see their
/// channel close when the entry is finalized or evicted.
pub enum DeliveryTarget {
    Batch(oneshot::Sender<Vec<ItemResult>>),
    Feed(mpsc::Sender<ItemResult>),
}

impl fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryTarget::Batch(_) => f.write_str("DeliveryTarget::Batch"),
            DeliveryTarget::Feed(_) => f.write_str("DeliveryTarget::Feed"),
        }
    }
}

/// A sub-request awaiting its response.
///
/// `max_response_time` is measured from entry creation; `resend` re-issues
/// the original sub-request to the same worker reference. Replaced
/// wholesale if ever updated, never mutated.
pub struct RetryableRequest {
    max_response_time: Duration,
    resend: Box<dyn Fn() + Send>,
}

impl RetryableRequest {
    pub fn new(max_response_time: Duration, resend: impl Fn() + Send + 'static) -> Self {
        Self {
            max_response_time,
            resend: Box::new(resend),
        }
    }

    pub fn max_response_time(&self) -> Duration {
        self.max_response_time
    }

    /// Re-issue the original sub-request. Sends a message only; it never
    /// touches the pending map, so a retry cannot duplicate bookkeeping.
    pub fn resend(&self) {
        (self.resend)()
    }
}

impl fmt::Debug for RetryableRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryableRequest")
            .field("max_response_time", &self.max_response_time)
            .finish_non_exhaustive()
    }
}

/// Correlation state for one client query.
///
/// Result slots are positional, one per requested id in request order, so
/// the finalized batch reflects the caller's ordering no matter how
/// sub-responses arrive.
#[derive(Debug)]
pub struct DataState {
    target: DeliveryTarget,
    correlation_id: String,
    created_at: Instant,
    keys: Vec<i32>,
    pending: HashMap<String, RetryableRequest>,
    positions: HashMap<String, usize>,
    slots: Vec<Option<ItemResult>>,
}

impl DataState {
    pub fn new(target: DeliveryTarget, correlation_id: String, keys: Vec<i32>) -> Self {
        let slots = vec![None; keys.len()];
        Self {
            target,
            correlation_id,
            created_at: Instant::now(),
            keys,
            pending: HashMap::new(),
            positions: HashMap::new(),
            slots,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &RetryableRequest> {
        self.pending.values()
    }

    /// Register a sub-request so its response (or retry) can be matched up.
    pub fn expect_response(&mut self, sub_id: String, slot: usize, request: RetryableRequest) {
        self.positions.insert(sub_id.clone(), slot);
        self.pending.insert(sub_id, request);
    }

    /// Record a dispatch that failed outright. The slot carries the per-id
    /// error; no response is awaited for it.
    pub fn fail_slot(&mut self, slot: usize, error: LoadError) {
        self.emit_to_feed(Err(error.clone()));
        self.slots[slot] = Some(Err(error));
    }

    /// Fold one sub-response in. A `sub_id` that is not pending (duplicate
    /// or late reply after a retry already settled it) is a silent no-op.
    pub fn resolve(&mut self, sub_id: &str, data: Option<TaskResource>) {
        if self.pending.remove(sub_id).is_none() {
            return;
        }
        debug!(waiting = self.pending.len(), "Request processing");

        let Some(&slot) = self.positions.get(sub_id) else {
            return;
        };
        let key = self.keys[slot];
        let item = match data {
            Some(resource) => TaskResponse::found(key, resource),
            None => TaskResponse::absent(key),
        };
        self.emit_to_feed(Ok(item.clone()));
        if item.task.is_some() {
            self.slots[slot] = Some(Ok(item));
        }
    }

    /// True once every pending sub-request is settled.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deliver the aggregated result and consume the entry.
    ///
    /// Batch targets get the full list in request-key order, with
    /// never-resolved slots delivered as absent. Feed targets already saw
    /// each item; dropping the sender ends the sequence.
    pub fn finalize(self) {
        debug!(
            elapsed_ms = self.created_at.elapsed().as_millis() as u64,
            correlation_id = %self.correlation_id,
            "Done. Sending result"
        );
        match self.target {
            DeliveryTarget::Batch(tx) => {
                let results = self
                    .keys
                    .iter()
                    .zip(self.slots)
                    .map(|(&key, slot)| slot.unwrap_or_else(|| Ok(TaskResponse::absent(key))))
                    .collect();
                if tx.send(results).is_err() {
                    debug!(correlation_id = %self.correlation_id, "Batch caller went away before delivery");
                }
            }
            DeliveryTarget::Feed(_) => {}
        }
    }

    fn emit_to_feed(&self, item: ItemResult) {
        if let DeliveryTarget::Feed(tx) = &self.target {
            match tx.try_send(item) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(correlation_id = %self.correlation_id, "Feed consumer lagging; dropping item");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(correlation_id = %self.correlation_id, "Feed consumer went away");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmodel::{StatusResource, TaskResource};

    fn resource(id: i32) -> TaskResource {
        TaskResource {
            id,
            name: format!("Test {id}"),
            status: Some(StatusResource {
                code: "DONE".to_string(),
                description: "Done".to_string(),
            }),
        }
    }

    fn noop_request() -> RetryableRequest {
        RetryableRequest::new(Duration::from_millis(100), || {})
    }

    #[test]
    fn test_resolve_removes_pending_and_fills_slot() {
        let (tx, mut rx) = oneshot::channel();
        let mut entry = DataState::new(DeliveryTarget::Batch(tx), "parent".to_string(), vec![7]);
        entry.expect_response("parent=>a".to_string(), 0, noop_request());

        assert!(!entry.is_done());
        entry.resolve("parent=>a", Some(resource(7)));
        assert!(entry.is_done());

        entry.finalize();
        let results = rx.try_recv().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().task.as_ref().unwrap().id, 7);
    }

    #[test]
    fn test_empty_response_counts_as_resolved_without_result() {
        let (tx, mut rx) = oneshot::channel();
        let mut entry = DataState::new(DeliveryTarget::Batch(tx), "parent".to_string(), vec![2]);
        entry.expect_response("parent=>a".to_string(), 0, noop_request());

        entry.resolve("parent=>a", None);
        assert!(entry.is_done());

        entry.finalize();
        let results = rx.try_recv().unwrap();
        assert_eq!(results[0], Ok(TaskResponse::absent(2)));
    }

    #[test]
    fn test_duplicate_resolve_is_noop() {
        let (tx, mut rx) = oneshot::channel();
        let mut entry = DataState::new(DeliveryTarget::Batch(tx), "parent".to_string(), vec![1]);
        entry.expect_response("parent=>a".to_string(), 0, noop_request());

        entry.resolve("parent=>a", Some(resource(1)));
        // Late duplicate after a retry: must not clobber the stored result.
        entry.resolve("parent=>a", None);

        entry.finalize();
        let results = rx.try_recv().unwrap();
        assert!(results[0].as_ref().unwrap().task.is_some());
    }

    #[test]
    fn test_batch_order_follows_keys_not_arrival() {
        let (tx, mut rx) = oneshot::channel();
        let mut entry = DataState::new(DeliveryTarget::Batch(tx), "p".to_string(), vec![1, 2, 3]);
        entry.expect_response("p=>a".to_string(), 0, noop_request());
        entry.expect_response("p=>b".to_string(), 1, noop_request());
        entry.expect_response("p=>c".to_string(), 2, noop_request());

        // Arrival order reversed relative to the request.
        entry.resolve("p=>c", Some(resource(3)));
        entry.resolve("p=>b", None);
        entry.resolve("p=>a", Some(resource(1)));

        entry.finalize();
        let results = rx.try_recv().unwrap();
        let keys: Vec<i32> = results.iter().map(|r| r.as_ref().unwrap().key).collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert!(results[1].as_ref().unwrap().task.is_none());
    }

    #[test]
    fn test_failed_slot_is_isolated() {
        let (tx, mut rx) = oneshot::channel();
        let mut entry = DataState::new(DeliveryTarget::Batch(tx), "p".to_string(), vec![1, 2]);
        entry.fail_slot(0, LoadError { id: 1 });
        entry.expect_response("p=>b".to_string(), 1, noop_request());

        entry.resolve("p=>b", Some(resource(2)));

        entry.finalize();
        let results = rx.try_recv().unwrap();
        assert_eq!(results[0], Err(LoadError { id: 1 }));
        assert!(results[1].as_ref().unwrap().task.is_some());
    }

    #[tokio::test]
    async fn test_feed_emits_items_as_they_resolve() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut entry = DataState::new(DeliveryTarget::Feed(tx), "p".to_string(), vec![5, 6]);
        entry.expect_response("p=>a".to_string(), 0, noop_request());
        entry.expect_response("p=>b".to_string(), 1, noop_request());

        entry.resolve("p=>b", None);
        let first = rx.try_recv().unwrap();
        assert_eq!(first, Ok(TaskResponse::absent(6)));

        entry.resolve("p=>a", Some(resource(5)));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.unwrap().key, 5);

        // Finalizing drops the sender and ends the sequence.
        entry.finalize();
        assert!(rx.recv().await.is_none());
    }
}
