//! Daemon wiring and foreground run loop
//!
//! Everything is built with plain constructors, leaf-first: repo, worker
//! pool, router, loader pool, cluster, health. No component looks anything
//! up at runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cluster::{Cluster, HealthCheck, cluster_roles, collect_seed_nodes, schedule_join};
use crate::config::Config;
use crate::fetcher::TaskFetcher;
use crate::loader::{DataLoader, LoaderHandle};
use crate::repo::TaskRepo;
use crate::worker::{LeastLoaded, Mailbox, Router, spawn_lookup_pool};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// A fully wired engine.
pub struct Engine {
    pub fetcher: TaskFetcher,
    pub loaders: LoaderHandle,
    pub cluster: Arc<Cluster>,
    pub health: HealthCheck,
    loader_tasks: Vec<JoinHandle<()>>,
    worker_tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Stop the loaders, then wait for workers to drain. Worker inboxes
    /// close on their own once the last loader (and with it the router)
    /// is gone.
    pub async fn shutdown(self) {
        self.cluster.mark_terminated();
        if let Err(error) = self.loaders.shutdown().await {
            warn!(%error, "Loader pool already stopped");
        }
        for task in self.loader_tasks {
            let _ = task.await;
        }
        drop(self.fetcher);
        drop(self.loaders);
        for task in self.worker_tasks {
            let _ = task.await;
        }
        info!("Engine stopped");
    }
}

/// Wire the engine from configuration and a snapshot of the environment.
/// Malformed seed configuration is fatal here, before anything clusters.
pub fn build(config: &Config, env: &HashMap<String, String>) -> Result<Engine> {
    let roles = cluster_roles(env);
    let seeds = collect_seed_nodes(env).context("Seed configuration is invalid")?;
    let pools = config.pools.clone().with_env_overrides(env);

    let cluster = Arc::new(Cluster::new(config.cluster.local_address(), roles));

    let repo = Arc::new(TaskRepo::default());
    let (worker_pool, worker_tasks) =
        spawn_lookup_pool(pools.task_pool_size, repo, pools.mailbox_capacity);
    let router: Arc<dyn Router> = Arc::new(worker_pool);

    let mut mailboxes = Vec::with_capacity(pools.data_loader_pool_size);
    let mut loader_tasks = Vec::with_capacity(pools.data_loader_pool_size);
    for _ in 0..pools.data_loader_pool_size {
        let loader = DataLoader::new(config.loader.clone(), Arc::clone(&router));
        mailboxes.push(Mailbox::new(loader.sender()));
        loader_tasks.push(tokio::spawn(loader.run()));
    }
    let loaders = LoaderHandle::new(LeastLoaded::new(mailboxes), config.loader.feed_buffer);
    let fetcher = TaskFetcher::new(loaders.clone(), config.fetch.request_timeout());

    // Detached on purpose: the join fires once after its delay.
    let _join = schedule_join(Arc::clone(&cluster), seeds, config.cluster.join_delay());
    let health = HealthCheck::new(Arc::clone(&cluster));

    info!(
        loaders = pools.data_loader_pool_size,
        workers = pools.task_pool_size,
        "Engine wired"
    );
    Ok(Engine {
        fetcher,
        loaders,
        cluster,
        health,
        loader_tasks,
        worker_tasks,
    })
}

/// Run the daemon in the foreground until the shutdown signal arrives.
pub async fn run(config: &Config) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let engine = build(config, &env)?;
    info!("TaskFan daemon started");

    let mut health_tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = health_tick.tick() => {
                let health = engine.health.health();
                info!(status = %health.status, size = health.cluster_size, "Cluster health");
            }
        }
    }

    engine.shutdown().await;
    info!("TaskFan daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_applies_env_pool_overrides() {
        let env: HashMap<String, String> =
            [("DATA_LOADER_POOL_SIZE".to_string(), "2".to_string())]
                .into_iter()
                .collect();

        let engine = build(&Config::default(), &env).unwrap();
        assert_eq!(engine.loader_tasks.len(), 2);
        assert_eq!(engine.worker_tasks.len(), 4);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_fails_fast_on_malformed_seed() {
        let env: HashMap<String, String> = [(
            "SEED_NODES_PROGRAMMATICALLY_0".to_string(),
            "not-a-valid-seed".to_string(),
        )]
        .into_iter()
        .collect();

        assert!(build(&Config::default(), &env).is_err());
    }
}
