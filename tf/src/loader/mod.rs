//! Scatter-gather data loader
//!
//! The loader fans one query out into a sub-request per id, correlates the
//! replies through the store, retries overdue sub-requests on its sweep
//! tick, and answers the caller once everything settles (or the TTL does).

mod config;
mod core;
mod handle;
mod messages;

pub use config::LoaderConfig;
pub use core::DataLoader;
pub use handle::LoaderHandle;
pub use messages::{EmptyResponse, LoaderMessage, TaskDataRequest, TaskDataResponse};
