//! LoaderHandle - client interface to the loader pool

use std::collections::BTreeSet;

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::correlation::{DeliveryTarget, ItemResult};
use crate::worker::LeastLoaded;

use super::messages::LoaderMessage;

/// Handle for issuing queries against the loader pool.
///
/// Cloneable; every query is routed to the instance with the smallest
/// inbox. All operations are async and non-blocking for feeds; batch
/// callers block on the returned receiver only.
#[derive(Clone)]
pub struct LoaderHandle {
    pool: LeastLoaded<LoaderMessage>,
    feed_buffer: usize,
}

impl LoaderHandle {
    pub fn new(pool: LeastLoaded<LoaderMessage>, feed_buffer: usize) -> Self {
        Self { pool, feed_buffer }
    }

    /// Issue a batch query. The receiver resolves once with the complete
    /// list, ordered like `ids`.
    pub async fn query_batch(
        &self,
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
    ) -> Result<oneshot::Receiver<Vec<ItemResult>>> {
        debug!(ids = ids.len(), "LoaderHandle::query_batch: called");
        let (tx, rx) = oneshot::channel();
        self.send_query(ids, attributes, DeliveryTarget::Batch(tx)).await?;
        Ok(rx)
    }

    /// Issue a feed query. Each id's result arrives on the receiver as soon
    /// as it resolves; the channel closes when the query is settled.
    pub async fn query_feed(
        &self,
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
    ) -> Result<mpsc::Receiver<ItemResult>> {
        debug!(ids = ids.len(), "LoaderHandle::query_feed: called");
        let (tx, rx) = mpsc::channel(self.feed_buffer);
        self.send_query(ids, attributes, DeliveryTarget::Feed(tx)).await?;
        Ok(rx)
    }

    /// Stop every loader instance in the pool. A member that already went
    /// away is skipped; the rest still get their shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        debug!("LoaderHandle::shutdown: called");
        for member in self.pool.members() {
            if member.deliver(LoaderMessage::Shutdown).await.is_err() {
                debug!("LoaderHandle::shutdown: member already stopped");
            }
        }
        Ok(())
    }

    async fn send_query(
        &self,
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
        target: DeliveryTarget,
    ) -> Result<()> {
        let loader = self.pool.select().ok_or_else(|| eyre!("Loader pool is empty"))?;
        loader
            .deliver(LoaderMessage::Query {
                ids,
                attributes,
                target,
            })
            .await
            .map_err(|_| eyre!("Loader channel closed"))?;
        Ok(())
    }
}
