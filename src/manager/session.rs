//! Task registry and per-task state transitions
//!
//! Every mutation happens under the registry mutex and returns the updated
//! snapshot, so callers publish events only after the lock is released.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::types::identifiers::{SessionId, TaskId};
use crate::types::task::{AgentTaskInfo, TaskStatus};

/// Error recorded on tasks ended through abort or teardown
pub const ABORT_MESSAGE: &str = "Background agent was aborted";

/// Registry record for one task
pub(super) struct TaskEntry {
    /// Commit order, independent of how ids sort
    seq: u64,
    info: AgentTaskInfo,
}

impl TaskEntry {
    fn is_running(&self) -> bool {
        self.info.status == TaskStatus::Running
    }

    /// Count a started tool; `None` once the task is terminal
    pub(super) fn record_tool_start(&mut self, tool: &str) -> Option<AgentTaskInfo> {
        if !self.is_running() {
            return None;
        }
        self.info.progress.tool_count += 1;
        self.info.progress.current_tool = Some(tool.to_string());
        Some(self.info.clone())
    }

    /// Clear the current tool; `None` once the task is terminal
    pub(super) fn record_tool_end(&mut self) -> Option<AgentTaskInfo> {
        if !self.is_running() {
            return None;
        }
        self.info.progress.current_tool = None;
        Some(self.info.clone())
    }

    /// Move to a terminal status
    ///
    /// Only a running task transitions; a task that already settled keeps its
    /// status and `None` is returned.
    pub(super) fn finish(
        &mut self,
        status: TaskStatus,
        error: Option<String>,
    ) -> Option<AgentTaskInfo> {
        if !self.is_running() || !status.is_terminal() {
            return None;
        }
        self.info.status = status;
        self.info.error = error;
        self.info.progress.current_tool = None;
        self.info.progress.end_time = Some(Utc::now());
        Some(self.info.clone())
    }
}

#[derive(Default)]
struct RegistryState {
    tasks: BTreeMap<TaskId, TaskEntry>,
    /// Slots handed out by `reserve` and not yet committed or released
    reserved: usize,
    next_seq: u64,
    /// Set by `close`; no reservation or commit succeeds afterwards
    closed: bool,
}

impl RegistryState {
    fn running(&self) -> usize {
        self.tasks.values().filter(|entry| entry.is_running()).count()
    }
}

/// Task table shared by the manager, its continuations and progress handlers
#[derive(Clone, Default)]
pub(super) struct TaskRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl TaskRegistry {
    /// Claim a running slot
    ///
    /// The slot counts against the limit until it is committed or dropped.
    pub(super) fn reserve(&self, max: usize) -> Result<SlotReservation> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RuntimeError::ShutDown);
        }
        if state.running() + state.reserved >= max {
            return Err(RuntimeError::capacity_exceeded(max));
        }
        state.reserved += 1;
        Ok(SlotReservation {
            state: Arc::clone(&self.state),
            committed: false,
        })
    }

    /// Run `f` against one entry under the lock
    pub(super) fn with_task<R>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut TaskEntry) -> R,
    ) -> Option<R> {
        self.state.lock().tasks.get_mut(id).map(f)
    }

    pub(super) fn get(&self, id: &TaskId) -> Option<AgentTaskInfo> {
        self.state.lock().tasks.get(id).map(|entry| entry.info.clone())
    }

    /// Snapshots in spawn order
    pub(super) fn list(&self) -> Vec<AgentTaskInfo> {
        let state = self.state.lock();
        let mut entries: Vec<&TaskEntry> = state.tasks.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.info.clone()).collect()
    }

    pub(super) fn running_count(&self) -> usize {
        self.state.lock().running()
    }

    pub(super) fn running_tasks(&self) -> Vec<(TaskId, SessionId)> {
        self.state
            .lock()
            .tasks
            .values()
            .filter(|entry| entry.is_running())
            .map(|entry| (entry.info.id.clone(), entry.info.session_id.clone()))
            .collect()
    }

    /// Delete a settled task; running or unknown tasks are left alone
    pub(super) fn remove(&self, id: &TaskId) -> bool {
        let mut state = self.state.lock();
        match state.tasks.get(id) {
            Some(entry) if !entry.is_running() => {
                state.tasks.remove(id);
                true
            }
            _ => false,
        }
    }

    pub(super) fn clear_finished(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|_, entry| entry.is_running());
        before - state.tasks.len()
    }

    /// Refuse every later reservation and commit
    pub(super) fn close(&self) {
        self.state.lock().closed = true;
    }

    pub(super) fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.tasks.len();
        state.tasks.clear();
        count
    }
}

/// A claimed running slot
///
/// Dropping it without [`SlotReservation::commit`] gives the slot back.
pub(super) struct SlotReservation {
    state: Arc<Mutex<RegistryState>>,
    committed: bool,
}

impl SlotReservation {
    /// Turn the slot into a registered running task
    ///
    /// # Errors
    /// Returns [`RuntimeError::ShutDown`] if the registry was closed after
    /// the slot was reserved; the slot is released on drop.
    pub(super) fn commit(mut self, info: AgentTaskInfo) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RuntimeError::ShutDown);
        }
        state.reserved = state.reserved.saturating_sub(1);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.tasks.insert(info.id.clone(), TaskEntry { seq, info });
        self.committed = true;
        Ok(())
    }
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if !self.committed {
            let mut state = self.state.lock();
            state.reserved = state.reserved.saturating_sub(1);
        }
    }
}
