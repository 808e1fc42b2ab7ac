//! TaskModel - data model for the taskfan lookup engine
//!
//! Two halves of the same task record:
//!
//! - [`entity`] - what the backend lookup workers materialize from storage
//! - [`resource`] - what callers receive, keyed by the id they asked for

pub mod entity;
pub mod resource;

pub use entity::{StatusRef, TaskEntity};
pub use resource::{StatusResource, TaskResource, TaskResponse};
