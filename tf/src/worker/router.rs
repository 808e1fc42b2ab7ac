//! Routing policies over worker mailboxes
//!
//! Chosen at wiring time, not runtime: a loader is handed one policy and
//! keeps it. Policies only pick a mailbox; they carry no lookup logic.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cluster::{Cluster, PeerAddress};

use super::lookup::LookupJob;
use super::pool::{LeastLoaded, Mailbox};

/// Picks the worker mailbox a sub-request goes to. `None` when no routee
/// is currently eligible.
pub trait Router: Send + Sync {
    fn route(&self) -> Option<Mailbox<LookupJob>>;
}

/// In-process policy: the pool member with the smallest mailbox wins.
impl Router for LeastLoaded<LookupJob> {
    fn route(&self) -> Option<Mailbox<LookupJob>> {
        self.select().cloned()
    }
}

/// Cluster policy: rotate over one routee per member node, restricted to
/// nodes that are Up and advertise every required role.
pub struct RoundRobinGroup {
    cluster: Arc<Cluster>,
    required_roles: BTreeSet<String>,
    routees: Vec<(PeerAddress, Mailbox<LookupJob>)>,
    cursor: AtomicUsize,
}

impl RoundRobinGroup {
    pub fn new(cluster: Arc<Cluster>, required_roles: BTreeSet<String>) -> Self {
        Self {
            cluster,
            required_roles,
            routees: Vec::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Register the mailbox reaching the worker hosted on `node`.
    pub fn register(&mut self, node: PeerAddress, mailbox: Mailbox<LookupJob>) {
        self.routees.push((node, mailbox));
    }

    pub fn len(&self) -> usize {
        self.routees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routees.is_empty()
    }
}

impl Router for RoundRobinGroup {
    fn route(&self) -> Option<Mailbox<LookupJob>> {
        let eligible: Vec<&Mailbox<LookupJob>> = self
            .routees
            .iter()
            .filter(|(node, _)| self.cluster.is_eligible(node, &self.required_roles))
            .map(|(_, mailbox)| mailbox)
            .collect();

        if eligible.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % eligible.len();
        Some(eligible[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Member, MemberStatus};
    use tokio::sync::mpsc;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn node(host: &str) -> PeerAddress {
        PeerAddress::new("tcp", "taskfan", host, 2552)
    }

    fn member(host: &str, status: MemberStatus, role_names: &[&str]) -> Member {
        Member {
            address: node(host),
            status,
            roles: roles(role_names),
        }
    }

    fn group_with_two_nodes() -> (RoundRobinGroup, mpsc::Receiver<LookupJob>, mpsc::Receiver<LookupJob>) {
        let cluster = Arc::new(Cluster::new(node("127.0.0.1"), roles(&["v1"])));
        cluster.upsert_member(member("10.0.0.2", MemberStatus::Up, &["v1"]));
        cluster.upsert_member(member("10.0.0.3", MemberStatus::Up, &["v1"]));

        let (tx_a, rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);

        let mut group = RoundRobinGroup::new(cluster, roles(&["v1"]));
        group.register(node("10.0.0.2"), Mailbox::new(tx_a));
        group.register(node("10.0.0.3"), Mailbox::new(tx_b));
        (group, rx_a, rx_b)
    }

    fn job(id: i32) -> (LookupJob, mpsc::Receiver<crate::loader::LoaderMessage>) {
        let (reply_tx, reply_rx) = mpsc::channel(1);
        let job = LookupJob {
            request: crate::loader::TaskDataRequest {
                trace_id: format!("p=>{id}"),
                id,
                attributes: BTreeSet::new(),
            },
            reply_to: reply_tx,
        };
        (job, reply_rx)
    }

    #[test]
    fn test_round_robin_rotates_over_eligible_nodes() {
        let (group, mut rx_a, mut rx_b) = group_with_two_nodes();

        for id in 0..4 {
            let (job, _reply_rx) = job(id);
            group.route().unwrap().try_deliver(job).unwrap();
        }

        // Two routees: four routed jobs land two on each.
        let mut count_a = 0;
        while rx_a.try_recv().is_ok() {
            count_a += 1;
        }
        let mut count_b = 0;
        while rx_b.try_recv().is_ok() {
            count_b += 1;
        }
        assert_eq!((count_a, count_b), (2, 2));
    }

    #[test]
    fn test_route_skips_nodes_missing_roles() {
        let cluster = Arc::new(Cluster::new(node("127.0.0.1"), roles(&["v1"])));
        cluster.upsert_member(member("10.0.0.2", MemberStatus::Up, &["v2"]));

        let (tx, _rx) = mpsc::channel(4);
        let mut group = RoundRobinGroup::new(cluster, roles(&["v1"]));
        group.register(node("10.0.0.2"), Mailbox::new(tx));

        assert!(group.route().is_none());
    }

    #[test]
    fn test_route_skips_down_nodes() {
        let cluster = Arc::new(Cluster::new(node("127.0.0.1"), roles(&["v1"])));
        cluster.upsert_member(member("10.0.0.2", MemberStatus::Down, &["v1"]));

        let (tx, _rx) = mpsc::channel(4);
        let mut group = RoundRobinGroup::new(cluster, roles(&["v1"]));
        group.register(node("10.0.0.2"), Mailbox::new(tx));

        assert!(group.route().is_none());
    }

    #[test]
    fn test_route_skips_unregistered_cluster_members() {
        // A member the cluster knows but no routee reaches is simply not a
        // candidate.
        let cluster = Arc::new(Cluster::new(node("127.0.0.1"), roles(&["v1"])));
        cluster.upsert_member(member("10.0.0.9", MemberStatus::Up, &["v1"]));

        let group = RoundRobinGroup::new(cluster, roles(&["v1"]));
        assert!(group.route().is_none());
    }
}
