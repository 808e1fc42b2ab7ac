//! Data loader task implementation
//!
//! One loader instance is a single-threaded, message-ordered loop: queries,
//! sub-responses, and sweep ticks all arrive through the same `select!` and
//! are processed to completion one at a time, so the correlation store
//! needs no locking. Several instances run side by side behind a
//! smallest-mailbox pool; they share nothing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::correlation::{
    CorrelationStore, DataState, DeliveryTarget, LoadError, RetryableRequest, trace,
};
use crate::worker::{LookupJob, Router};

use super::config::LoaderConfig;
use super::messages::{LoaderMessage, TaskDataRequest};

/// Scatter-gather loader actor.
pub struct DataLoader {
    config: LoaderConfig,
    tx: mpsc::Sender<LoaderMessage>,
    rx: mpsc::Receiver<LoaderMessage>,
    router: Arc<dyn Router>,
    store: CorrelationStore,
}

impl DataLoader {
    pub fn new(config: LoaderConfig, router: Arc<dyn Router>) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let store = CorrelationStore::new(config.entry_ttl(), config.retry_window());
        Self {
            config,
            tx,
            rx,
            router,
            store,
        }
    }

    /// Sender feeding this instance's inbox.
    pub fn sender(&self) -> mpsc::Sender<LoaderMessage> {
        self.tx.clone()
    }

    /// Run until shutdown. The sweep timer lives in the same loop as the
    /// inbox, so a tick can never race a fold on the store.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(self.config.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("DataLoader started");
        loop {
            tokio::select! {
                _ = tick.tick() => self.handle(LoaderMessage::Tick),
                msg = self.rx.recv() => match msg {
                    None | Some(LoaderMessage::Shutdown) => break,
                    Some(msg) => self.handle(msg),
                }
            }
        }
        info!("DataLoader stopped");
    }

    fn handle(&mut self, msg: LoaderMessage) {
        match msg {
            LoaderMessage::Query {
                ids,
                attributes,
                target,
            } => self.process_query(ids, attributes, target),

            LoaderMessage::Loaded(response) => {
                debug!(trace_id = %response.trace_id, "DataLoader.processTaskDataResponse");
                self.store.resolve(&response.trace_id, Some(response.entity.into()));
            }

            LoaderMessage::Missing(response) => {
                debug!(trace_id = %response.trace_id, "DataLoader.processEmptyResponse");
                self.store.resolve(&response.trace_id, None);
            }

            LoaderMessage::Tick => {
                let report = self.store.sweep(Instant::now());
                if report.retried > 0 {
                    info!(resent = report.retried, "checkForRetries: re-sent overdue sub-requests");
                }
            }

            // The run loop breaks on Shutdown before dispatching here.
            LoaderMessage::Shutdown => {}
        }
    }

    /// Scatter one query: a child trace per id, dispatched immediately and
    /// then registered for retry. Registration follows dispatch on purpose -
    /// the sweep timer only ever triggers additional sends, never the first.
    fn process_query(&mut self, ids: Vec<i32>, attributes: BTreeSet<String>, target: DeliveryTarget) {
        let correlation_id = trace::new_trace_id();
        debug!(%correlation_id, ids = ids.len(), "DataLoader.processQuery");

        let mut entry = DataState::new(target, correlation_id.clone(), ids.clone());
        for (slot, id) in ids.into_iter().enumerate() {
            let trace_id = trace::derive_child(&correlation_id);
            let request = TaskDataRequest {
                trace_id: trace_id.clone(),
                id,
                attributes: attributes.clone(),
            };

            let Some(worker) = self.router.route() else {
                warn!(id, "No worker routee available");
                entry.fail_slot(slot, LoadError { id });
                continue;
            };

            let job = LookupJob {
                request,
                reply_to: self.tx.clone(),
            };
            if worker.try_deliver(job.clone()).is_err() {
                warn!(id, "Worker mailbox rejected the sub-request");
                entry.fail_slot(slot, LoadError { id });
                continue;
            }

            // The resend stays bound to the exact worker that got the
            // first dispatch.
            let resend = move || {
                if worker.try_deliver(job.clone()).is_err() {
                    warn!("Worker mailbox rejected a retry");
                }
            };
            entry.expect_response(
                trace_id,
                slot,
                RetryableRequest::new(self.config.max_response_time(), resend),
            );
        }

        self.store.commit(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::ItemResult;
    use crate::repo::TaskRepo;
    use crate::worker::spawn_lookup_pool;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn test_config() -> LoaderConfig {
        LoaderConfig {
            tick_interval_ms: 20,
            max_response_time_ms: 10,
            retry_window_ms: 200,
            entry_ttl_ms: 400,
            channel_buffer: 64,
            feed_buffer: 16,
        }
    }

    async fn query(
        sender: &mpsc::Sender<LoaderMessage>,
        ids: Vec<i32>,
    ) -> oneshot::Receiver<Vec<ItemResult>> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(LoaderMessage::Query {
                ids,
                attributes: BTreeSet::new(),
                target: DeliveryTarget::Batch(tx),
            })
            .await
            .unwrap();
        rx
    }

    #[tokio::test]
    async fn test_scatter_gather_round_trip() {
        let (pool, _workers) = spawn_lookup_pool(2, Arc::new(TaskRepo::with_ids([1, 3])), 16);
        let loader = DataLoader::new(test_config(), Arc::new(pool));
        let sender = loader.sender();
        tokio::spawn(loader.run());

        let rx = query(&sender, vec![1, 2, 3]).await;
        let results = rx.await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().task.as_ref().unwrap().id, 1);
        assert!(results[1].as_ref().unwrap().task.is_none());
        assert_eq!(results[2].as_ref().unwrap().task.as_ref().unwrap().id, 3);

        sender.send(LoaderMessage::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_resends_until_a_worker_answers() {
        // A hand-rolled worker that swallows the first job and answers the
        // second, so only a retry can complete the query.
        let (job_tx, mut job_rx) = mpsc::channel::<LookupJob>(16);
        tokio::spawn(async move {
            let first = job_rx.recv().await.unwrap();
            drop(first);
            let second = job_rx.recv().await.unwrap();
            let reply = LoaderMessage::Missing(crate::loader::EmptyResponse {
                trace_id: second.request.trace_id.clone(),
            });
            second.reply_to.send(reply).await.unwrap();
        });

        let pool = crate::worker::LeastLoaded::new(vec![crate::worker::Mailbox::new(job_tx)]);
        let loader = DataLoader::new(test_config(), Arc::new(pool));
        let sender = loader.sender();
        tokio::spawn(loader.run());

        let rx = query(&sender, vec![5]).await;
        let results = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("retry should complete the query")
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].as_ref().unwrap().task.is_none());

        sender.send(LoaderMessage::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_ttl_eviction_delivers_partial_result() {
        // A worker that never answers: the TTL sweep must still settle the
        // caller with an all-absent batch.
        let (job_tx, mut job_rx) = mpsc::channel::<LookupJob>(16);
        tokio::spawn(async move { while job_rx.recv().await.is_some() {} });

        let pool = crate::worker::LeastLoaded::new(vec![crate::worker::Mailbox::new(job_tx)]);
        let loader = DataLoader::new(test_config(), Arc::new(pool));
        let sender = loader.sender();
        tokio::spawn(loader.run());

        let rx = query(&sender, vec![7, 8]).await;
        let results = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("eviction should settle the caller")
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.as_ref().unwrap().task.is_none()));

        sender.send(LoaderMessage::Shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_worker_mailbox_surfaces_per_id_errors() {
        let (job_tx, job_rx) = mpsc::channel::<LookupJob>(16);
        drop(job_rx);

        let pool = crate::worker::LeastLoaded::new(vec![crate::worker::Mailbox::new(job_tx)]);
        let loader = DataLoader::new(test_config(), Arc::new(pool));
        let sender = loader.sender();
        tokio::spawn(loader.run());

        let rx = query(&sender, vec![1, 2]).await;
        let results = rx.await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(LoadError { id: 1 }));
        assert_eq!(results[1], Err(LoadError { id: 2 }));

        sender.send(LoaderMessage::Shutdown).await.unwrap();
    }
}
