//! Caller-facing task resources

use serde::{Deserialize, Serialize};

use crate::entity::TaskEntity;

/// Status of a task as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResource {
    pub code: String,
    pub description: String,
}

/// Task record as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResource {
    pub id: i32,
    pub name: String,
    pub status: Option<StatusResource>,
}

impl From<TaskEntity> for TaskResource {
    fn from(entity: TaskEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            status: entity.status.map(|s| StatusResource {
                code: s.code,
                description: s.description,
            }),
        }
    }
}

/// One per-id result in a batched reply, keyed by the id that was asked for.
///
/// `task` is `None` when the backend had no record for the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub key: i32,
    pub task: Option<TaskResource>,
}

impl TaskResponse {
    pub fn found(key: i32, task: TaskResource) -> Self {
        Self { key, task: Some(task) }
    }

    pub fn absent(key: i32) -> Self {
        Self { key, task: None }
    }
}
