//! Lookup workers, pooling, and routing
//!
//! Workers are stateless: each receives a sub-request and answers from the
//! backing store, with absence as a normal reply. Routing policies decide
//! which worker mailbox a sub-request lands in:
//! - [`LeastLoaded`] - smallest mailbox within this process
//! - [`RoundRobinGroup`] - rotation across cluster members filtered by role

mod lookup;
mod pool;
mod router;

pub use lookup::{LookupJob, TaskWorker, spawn_lookup_pool};
pub use pool::{LeastLoaded, Mailbox};
pub use router::{RoundRobinGroup, Router};
