//! Cluster bootstrap, membership, and health
//!
//! Seeds and roles come from indexed environment variables; the join itself
//! is a delayed one-shot so the local node finishes starting first. A node
//! with no usable seeds runs standalone.

mod bootstrap;
mod health;
mod membership;

pub use bootstrap::{
    BootstrapError, CLUSTER_ROLES_ENV_PREFIX, DEFAULT_CLUSTER_ROLE, SEED_NODES_ENV_PREFIX,
    cluster_roles, collect_seed_nodes, schedule_join,
};
pub use health::{Health, HealthCheck, HealthStatus};
pub use membership::{Cluster, Member, MemberStatus, PeerAddress};
