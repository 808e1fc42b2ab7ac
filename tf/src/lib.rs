//! TaskFan - scatter-gather task lookup engine
//!
//! TaskFan answers batched task queries by fanning each query out across a
//! pool of lookup workers, correlating the replies by hierarchical trace
//! ID, retrying sub-requests that miss their response deadline, and
//! evicting state that outlives its TTL. A node can also join a cluster of
//! peers bootstrapped from environment-provided seed addresses.
//!
//! # Core Concepts
//!
//! - **Message-only actors**: loaders and workers are independent tokio
//!   tasks with one inbox each; nothing shares mutable state
//! - **Correlation by trace ID**: every sub-request carries a child of its
//!   query's trace ID, so replies find their entry without an index
//! - **Sweep, don't block**: a fixed 300 ms tick resends the overdue and
//!   evicts the expired; callers never hold the engine up
//!
//! # Modules
//!
//! - [`correlation`] - per-query state, trace IDs, retry/TTL sweep
//! - [`loader`] - the scatter-gather actor and its pool handle
//! - [`worker`] - lookup workers, smallest-mailbox pool, routing policies
//! - [`cluster`] - seed bootstrap, membership registry, health surface
//! - [`fetcher`] - batch and feed boundary for callers
//! - [`config`] - configuration types and loading
//! - [`daemon`] - explicit wiring and the foreground run loop

pub mod cli;
pub mod cluster;
pub mod config;
pub mod correlation;
pub mod daemon;
pub mod fetcher;
pub mod loader;
pub mod repo;
pub mod worker;

// Re-export commonly used types
pub use cluster::{
    BootstrapError, Cluster, Health, HealthCheck, HealthStatus, Member, MemberStatus, PeerAddress,
    cluster_roles, collect_seed_nodes, schedule_join,
};
pub use config::{ClusterConfig, Config, FetchConfig, PoolsConfig};
pub use correlation::{
    CorrelationStore, DataState, DeliveryTarget, ItemResult, LoadError, RetryableRequest, SweepReport,
};
pub use daemon::Engine;
pub use fetcher::{DEMO_FEED_RANGE, FetchError, TaskFetcher};
pub use loader::{
    DataLoader, EmptyResponse, LoaderConfig, LoaderHandle, LoaderMessage, TaskDataRequest,
    TaskDataResponse,
};
pub use repo::TaskRepo;
pub use worker::{LeastLoaded, LookupJob, Mailbox, RoundRobinGroup, Router, TaskWorker, spawn_lookup_pool};
