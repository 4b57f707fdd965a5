//! Registry queries

use crate::error::{Result, RuntimeError};
use crate::types::identifiers::TaskId;
use crate::types::task::AgentTaskInfo;

use super::core::{BackgroundAgentManager, MAX_CONCURRENT};

impl BackgroundAgentManager {
    /// Snapshots of every registered task, in spawn order
    #[must_use]
    pub fn list(&self) -> Vec<AgentTaskInfo> {
        self.registry.list()
    }

    /// Snapshot of one task
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<AgentTaskInfo> {
        self.registry.get(id)
    }

    /// Snapshot of one task, failing for unknown ids
    ///
    /// # Errors
    /// Returns [`RuntimeError::TaskNotFound`] if the id is not registered
    pub fn info(&self, id: &TaskId) -> Result<AgentTaskInfo> {
        self.registry
            .get(id)
            .ok_or_else(|| RuntimeError::task_not_found(id.as_str()))
    }

    /// Number of tasks currently `running`
    #[must_use]
    pub fn count(&self) -> usize {
        self.registry.running_count()
    }

    /// The concurrency limit
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        MAX_CONCURRENT
    }
}
