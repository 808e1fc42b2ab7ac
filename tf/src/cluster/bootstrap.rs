//! Cluster bootstrap from process environment
//!
//! Seed descriptors arrive as indexed environment variables
//! (`SEED_NODES_PROGRAMMATICALLY_0`, `_1`, ...) in the form
//! `PROTOCOL://SYSTEM@HOST:PORT`. Malformed syntax is a configuration
//! error and fatal; a host that does not resolve is merely dropped. The
//! actual join call runs once, after a configurable delay, so the local
//! node can finish starting first.

use std::collections::{BTreeSet, HashMap};
use std::net::ToSocketAddrs;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::membership::{Cluster, PeerAddress};

pub const SEED_NODES_ENV_PREFIX: &str = "SEED_NODES_PROGRAMMATICALLY";
pub const CLUSTER_ROLES_ENV_PREFIX: &str = "CLUSTER_ROLES";
pub const DEFAULT_CLUSTER_ROLE: &str = "v1";

static SEED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)://(.*)@(.*):(.*)$").expect("seed pattern is valid"));

/// Fatal seed configuration problems. Anything here means the process must
/// not start clustering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("Seed {index} requires a full PROTOCOL://SYSTEM@HOST:PORT address, got \"{value}\"")]
    MalformedSeed { index: usize, value: String },

    #[error("Seed {index} has an invalid port \"{port}\"")]
    InvalidPort { index: usize, port: String },
}

/// Enumerate seed variables until the first gap, parse each strictly, and
/// keep the resolvable ones. Parsing failures are fatal; resolution
/// failures are not.
pub fn collect_seed_nodes(env: &HashMap<String, String>) -> Result<Vec<PeerAddress>, BootstrapError> {
    let mut available = Vec::new();
    let mut index = 0;

    while let Some(seed) = env.get(&format!("{SEED_NODES_ENV_PREFIX}_{index}")) {
        let captures = SEED_PATTERN
            .captures(seed)
            .ok_or_else(|| BootstrapError::MalformedSeed {
                index,
                value: seed.clone(),
            })?;

        let host = captures[3].to_string();
        let port: u16 = captures[4].parse().map_err(|_| BootstrapError::InvalidPort {
            index,
            port: captures[4].to_string(),
        })?;

        if is_host_resolvable(&host, port) {
            available.push(PeerAddress::new(&captures[1], &captures[2], host, port));
        }
        index += 1;
    }

    Ok(available)
}

/// Roles this node advertises, from `CLUSTER_ROLES_0, _1, ...`; a single
/// well-known default when none are configured.
pub fn cluster_roles(env: &HashMap<String, String>) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    let mut index = 0;
    while let Some(role) = env.get(&format!("{CLUSTER_ROLES_ENV_PREFIX}_{index}")) {
        roles.insert(role.clone());
        index += 1;
    }
    if roles.is_empty() {
        roles.insert(DEFAULT_CLUSTER_ROLE.to_string());
    }
    roles
}

/// Schedule the one-shot join. An empty seed set leaves the node
/// standalone; that is logged, never raised.
pub fn schedule_join(cluster: Arc<Cluster>, seeds: Vec<PeerAddress>, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if seeds.is_empty() {
            error!("NO seeds available, cannot join the cluster. Working in standalone mode");
        } else {
            info!(count = seeds.len(), "Joining cluster via seed nodes");
            cluster.join_seed_nodes(seeds);
        }
    })
}

fn is_host_resolvable(host: &str, port: u16) -> bool {
    match (host, port).to_socket_addrs() {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(e) => {
            debug!(%host, error = %e, "Seed host did not resolve");
            false
        }
    }
}
