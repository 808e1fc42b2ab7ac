//! Cluster health surface

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::membership::Cluster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Up,
    Down,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Up => f.write_str("UP"),
            HealthStatus::Down => f.write_str("DOWN"),
        }
    }
}

/// Point-in-time health report for the ops layer.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: HealthStatus,
    #[serde(rename = "cluster-size")]
    pub cluster_size: usize,
    /// Member address -> membership status, stringly for display.
    pub members: BTreeMap<String, String>,
}

/// Reports cluster size, per-member status, and whether this node is still
/// up (it goes down once the shutdown signal has been observed).
#[derive(Debug, Clone)]
pub struct HealthCheck {
    cluster: Arc<Cluster>,
}

impl HealthCheck {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    pub fn health(&self) -> Health {
        let members: BTreeMap<String, String> = self
            .cluster
            .members()
            .into_iter()
            .map(|m| (m.address.to_string(), m.status.to_string()))
            .collect();

        let status = if self.cluster.is_terminated() {
            HealthStatus::Down
        } else {
            HealthStatus::Up
        };

        Health {
            status,
            cluster_size: members.len(),
            members,
        }
    }
}
