//! Abort and registry cleanup

use crate::bus::Event;
use crate::types::identifiers::TaskId;
use crate::types::task::TaskStatus;

use super::super::session::ABORT_MESSAGE;
use super::core::BackgroundAgentManager;

impl BackgroundAgentManager {
    /// Abort a running task
    ///
    /// Returns `false` for unknown or already settled tasks. Otherwise the
    /// task moves to `aborted`, its session is signalled and `Failed` is
    /// published. The continuation may still be unwinding when this returns.
    pub fn abort(&self, id: &TaskId) -> bool {
        let Some(info) = self
            .registry
            .with_task(id, |entry| {
                entry.finish(TaskStatus::Aborted, Some(ABORT_MESSAGE.to_string()))
            })
            .flatten()
        else {
            return false;
        };

        self.session_lock.abort(&info.session_id);
        log::info!("Background agent {} aborted", id);
        self.bus.publish(Event::BackgroundAgentFailed {
            info,
            error: ABORT_MESSAGE.to_string(),
        });
        true
    }

    /// Delete a settled task; `false` if unknown or still running
    pub fn remove(&self, id: &TaskId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            log::debug!("Removed background agent {}", id);
        }
        removed
    }

    /// Delete every settled task, returning how many were removed
    pub fn clear_finished(&self) -> usize {
        let removed = self.registry.clear_finished();
        log::debug!("Cleared {} finished background agents", removed);
        removed
    }
}
