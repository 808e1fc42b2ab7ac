//! Request correlation state
//!
//! One [`DataState`] entry per in-flight client query. Sub-requests fan out
//! under hierarchical trace IDs; responses fold back into the entry until
//! every pending sub-request is settled, at which point the aggregated reply
//! goes to the entry's delivery target and the entry is removed. A periodic
//! sweep resends overdue sub-requests and evicts entries past their TTL.

mod entry;
mod store;
pub mod trace;

pub use entry::{DataState, DeliveryTarget, ItemResult, LoadError, RetryableRequest};
pub use store::{CorrelationStore, SweepReport};
