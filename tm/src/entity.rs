//! Backend-side task entity

use serde::{Deserialize, Serialize};

/// Status reference attached to a task entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRef {
    pub code: String,
    pub description: String,
}

impl StatusRef {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// Task entity as materialized by a lookup worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntity {
    pub id: i32,
    pub name: String,
    pub status: Option<StatusRef>,
}

impl TaskEntity {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: StatusRef) -> Self {
        self.status = Some(status);
        self
    }
}
