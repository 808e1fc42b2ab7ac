//! Task fetch boundary
//!
//! What the (out-of-scope) query layer calls: a bulk fetch that waits for
//! the whole ordered batch, and a feed that surfaces each id's result as it
//! lands. Both ride the same loader machinery underneath.

use std::collections::BTreeSet;
use std::ops::Range;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::correlation::ItemResult;
use crate::loader::LoaderHandle;

/// Id range the continuous demo feed serves.
pub const DEMO_FEED_RANGE: Range<i32> = 50..60;

/// Whole-request failures. Per-id failures travel inside the items instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Loader pool unavailable")]
    Unavailable,
}

/// Fetch surface over the loader pool.
#[derive(Clone)]
pub struct TaskFetcher {
    loaders: LoaderHandle,
    request_timeout: Duration,
}

impl TaskFetcher {
    pub fn new(loaders: LoaderHandle, request_timeout: Duration) -> Self {
        Self {
            loaders,
            request_timeout,
        }
    }

    /// Fetch a batch and wait for the complete result, ordered like `ids`.
    ///
    /// The timeout is purely caller-side: an abandoned query keeps its
    /// correlation entry until the sweep reclaims it.
    pub async fn fetch_batch(
        &self,
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
    ) -> Result<Vec<ItemResult>, FetchError> {
        debug!(ids = ids.len(), "TaskFetcher::fetch_batch: called");
        let rx = self
            .loaders
            .query_batch(ids, attributes)
            .await
            .map_err(|error| {
                warn!(%error, "TaskFetcher::fetch_batch: loader unavailable");
                FetchError::Unavailable
            })?;

        match tokio::time::timeout(self.request_timeout, rx).await {
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
            Ok(Err(_)) => Err(FetchError::Unavailable),
            Ok(Ok(results)) => Ok(results),
        }
    }

    /// Open a feed over the given ids; items arrive as they resolve and the
    /// channel closes once the query is settled or evicted.
    pub async fn feed(
        &self,
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
    ) -> Result<mpsc::Receiver<ItemResult>, FetchError> {
        debug!(ids = ids.len(), "TaskFetcher::feed: called");
        self.loaders.query_feed(ids, attributes).await.map_err(|error| {
            warn!(%error, "TaskFetcher::feed: loader unavailable");
            FetchError::Unavailable
        })
    }

    /// The continuous demo feed over the fixed id range.
    pub async fn demo_feed(
        &self,
        attributes: BTreeSet<String>,
    ) -> Result<mpsc::Receiver<ItemResult>, FetchError> {
        self.feed(DEMO_FEED_RANGE.collect(), attributes).await
    }
}
