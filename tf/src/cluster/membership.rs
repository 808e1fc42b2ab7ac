//! Local view of cluster membership

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Peer address parsed from a seed descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub protocol: String,
    pub system: String,
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(
        protocol: impl Into<String>,
        system: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            system: system.into(),
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}@{}:{}", self.protocol, self.system, self.host, self.port)
    }
}

/// Membership lifecycle of one node as seen from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Joining,
    Up,
    Down,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberStatus::Joining => f.write_str("Joining"),
            MemberStatus::Up => f.write_str("Up"),
            MemberStatus::Down => f.write_str("Down"),
        }
    }
}

/// One cluster member: address, lifecycle status, and the roles it
/// advertises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: PeerAddress,
    pub status: MemberStatus,
    pub roles: BTreeSet<String>,
}

/// Membership registry for this process.
///
/// Holds the local node (always present) plus every peer learned through
/// joining. The `terminated` flag flips once the process has observed its
/// shutdown signal and feeds the health surface's up/down answer.
#[derive(Debug)]
pub struct Cluster {
    local: PeerAddress,
    members: RwLock<HashMap<PeerAddress, Member>>,
    terminated: AtomicBool,
}

impl Cluster {
    pub fn new(local: PeerAddress, roles: BTreeSet<String>) -> Self {
        let mut members = HashMap::new();
        members.insert(
            local.clone(),
            Member {
                address: local.clone(),
                status: MemberStatus::Up,
                roles,
            },
        );
        Self {
            local,
            members: RwLock::new(members),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn local_address(&self) -> &PeerAddress {
        &self.local
    }

    /// Join the given seed nodes: each becomes a known member, marked Up.
    /// The local node is never re-inserted from a seed list.
    pub fn join_seed_nodes(&self, seeds: Vec<PeerAddress>) {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        for seed in seeds {
            if seed == self.local {
                continue;
            }
            debug!(seed = %seed, "Adding seed member");
            members.entry(seed.clone()).or_insert(Member {
                address: seed,
                status: MemberStatus::Up,
                roles: BTreeSet::new(),
            });
        }
        info!(size = members.len(), "Cluster membership updated");
    }

    /// Insert or replace a member record wholesale (role or status updates
    /// arrive this way).
    pub fn upsert_member(&self, member: Member) {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        members.insert(member.address.clone(), member);
    }

    pub fn members(&self) -> Vec<Member> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members.values().cloned().collect()
    }

    pub fn size(&self) -> usize {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members.len()
    }

    /// True when the member at `address` is Up and advertises every role in
    /// `required`.
    pub fn is_eligible(&self, address: &PeerAddress, required: &BTreeSet<String>) -> bool {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members
            .get(address)
            .map(|m| m.status == MemberStatus::Up && required.iter().all(|r| m.roles.contains(r)))
            .unwrap_or(false)
    }

    pub fn mark_terminated(&self) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            info!("Cluster node terminated");
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> PeerAddress {
        PeerAddress::new("tcp", "taskfan", "127.0.0.1", 2552)
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_cluster_contains_local_only() {
        let cluster = Cluster::new(local(), roles(&["v1"]));
        assert_eq!(cluster.size(), 1);
        assert!(!cluster.is_terminated());
    }

    #[test]
    fn test_join_adds_seeds_but_not_self() {
        let cluster = Cluster::new(local(), roles(&["v1"]));
        let peer = PeerAddress::new("tcp", "taskfan", "10.0.0.2", 2552);

        cluster.join_seed_nodes(vec![peer.clone(), local()]);
        assert_eq!(cluster.size(), 2);

        // Joining again is idempotent.
        cluster.join_seed_nodes(vec![peer]);
        assert_eq!(cluster.size(), 2);
    }

    #[test]
    fn test_eligibility_requires_up_and_all_roles() {
        let cluster = Cluster::new(local(), roles(&["v1", "lookup"]));

        assert!(cluster.is_eligible(&local(), &roles(&["v1"])));
        assert!(cluster.is_eligible(&local(), &roles(&["v1", "lookup"])));
        assert!(!cluster.is_eligible(&local(), &roles(&["v2"])));

        let down = PeerAddress::new("tcp", "taskfan", "10.0.0.3", 2552);
        cluster.upsert_member(Member {
            address: down.clone(),
            status: MemberStatus::Down,
            roles: roles(&["v1"]),
        });
        assert!(!cluster.is_eligible(&down, &roles(&["v1"])));
    }

    #[test]
    fn test_terminated_flag() {
        let cluster = Cluster::new(local(), roles(&["v1"]));
        cluster.mark_terminated();
        assert!(cluster.is_terminated());
    }

    #[test]
    fn test_address_display() {
        let address = PeerAddress::new("udp", "Remote", "host-a", 2552);
        assert_eq!(address.to_string(), "udp://Remote@host-a:2552");
    }
}
