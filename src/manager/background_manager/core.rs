//! Core background agent manager structure and lifecycle management

use crate::bus::EventBus;
use crate::collaborators::Collaborators;
use crate::session_lock::SessionLock;

use super::super::session::TaskRegistry;

/// Maximum number of tasks in `running` status at once
pub const MAX_CONCURRENT: usize = 5;

/// Manager for concurrent background agent tasks
///
/// The `BackgroundAgentManager` owns the task registry and handles:
/// - Spawning tasks into child sessions under the concurrency limit
/// - Progress tracking from tool events
/// - Abort through the session lock
/// - Registry cleanup of finished tasks
///
/// Every state change is published on the event bus with a task snapshot.
pub struct BackgroundAgentManager {
    pub(super) registry: TaskRegistry,
    pub(super) bus: EventBus,
    pub(super) session_lock: SessionLock,
    pub(super) collaborators: Collaborators,
}

impl BackgroundAgentManager {
    /// Create a manager publishing on `bus` and cancelling through `session_lock`
    #[must_use]
    pub fn new(bus: EventBus, session_lock: SessionLock, collaborators: Collaborators) -> Self {
        Self {
            registry: TaskRegistry::default(),
            bus,
            session_lock,
            collaborators,
        }
    }

    /// Shut the manager down
    ///
    /// Refuses further spawns, including ones already past the capacity
    /// check, aborts every running task, then clears the registry. Returns
    /// the number of tasks that were aborted.
    pub fn shutdown(&self) -> usize {
        log::info!("Shutting down BackgroundAgentManager...");
        self.registry.close();

        let mut aborted = 0;
        for (task_id, _) in self.registry.running_tasks() {
            log::debug!("Aborting background agent: {}", task_id);
            if self.abort(&task_id) {
                aborted += 1;
            }
        }

        let cleared = self.registry.clear();
        log::info!(
            "BackgroundAgentManager shutdown complete ({} aborted, {} cleared)",
            aborted,
            cleared
        );
        aborted
    }
}
