//! Message types for the data loader

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use taskmodel::TaskEntity;

use crate::correlation::DeliveryTarget;

/// Sub-request envelope sent to a lookup worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDataRequest {
    #[serde(rename = "trace-id")]
    pub trace_id: String,
    pub id: i32,
    pub attributes: BTreeSet<String>,
}

/// Successful sub-response: the worker found the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDataResponse {
    #[serde(rename = "trace-id")]
    pub trace_id: String,
    pub entity: TaskEntity,
}

/// Explicit no-data sub-response: the worker had no record for the id.
/// Absence is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyResponse {
    #[serde(rename = "trace-id")]
    pub trace_id: String,
}

/// Everything a loader instance processes, in arrival order.
#[derive(Debug)]
pub enum LoaderMessage {
    /// Inbound client query to scatter across the workers.
    Query {
        ids: Vec<i32>,
        attributes: BTreeSet<String>,
        target: DeliveryTarget,
    },

    /// Sub-response carrying a found entity.
    Loaded(TaskDataResponse),

    /// Sub-response for an id the backend does not have.
    Missing(EmptyResponse),

    /// Periodic sweep trigger from the loader's own timer.
    Tick,

    /// Stop the loader loop.
    Shutdown,
}
