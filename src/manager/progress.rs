//! Tool-progress tracking for background tasks
//!
//! Each task listens for tool start/completion events of its own child
//! session and republishes its snapshot as `background-agent.updated`.

use crate::bus::{Event, EventBus, EventKind, Subscription, WeakEventBus};
use crate::types::identifiers::{SessionId, TaskId};
use crate::types::task::AgentTaskInfo;

use super::session::{TaskEntry, TaskRegistry};

/// Both progress subscriptions of one task
pub(super) struct ProgressListener {
    started: Subscription,
    completed: Subscription,
}

impl ProgressListener {
    /// Subscribe to tool events of `session_id` on behalf of `task_id`
    pub(super) fn attach(
        bus: &EventBus,
        registry: &TaskRegistry,
        task_id: &TaskId,
        session_id: &SessionId,
    ) -> Self {
        let started = {
            let (registry, task_id, watched, weak) = context(bus, registry, task_id, session_id);
            bus.subscribe(EventKind::ToolStarted, move |envelope| {
                if let Event::ToolStarted {
                    session_id, tool, ..
                } = &envelope.event
                    && *session_id == watched
                {
                    let info = registry
                        .with_task(&task_id, |entry| entry.record_tool_start(tool))
                        .flatten();
                    publish_update(&weak, info);
                }
                Ok(())
            })
        };

        let completed = {
            let (registry, task_id, watched, weak) = context(bus, registry, task_id, session_id);
            bus.subscribe(EventKind::ToolCompleted, move |envelope| {
                if let Event::ToolCompleted { session_id, .. } = &envelope.event
                    && *session_id == watched
                {
                    let info = registry
                        .with_task(&task_id, TaskEntry::record_tool_end)
                        .flatten();
                    publish_update(&weak, info);
                }
                Ok(())
            })
        };

        Self { started, completed }
    }

    /// Remove both subscriptions; repeated calls are no-ops
    pub(super) fn unsubscribe(&self) {
        self.started.unsubscribe();
        self.completed.unsubscribe();
    }
}

fn context(
    bus: &EventBus,
    registry: &TaskRegistry,
    task_id: &TaskId,
    session_id: &SessionId,
) -> (TaskRegistry, TaskId, SessionId, WeakEventBus) {
    (
        registry.clone(),
        task_id.clone(),
        session_id.clone(),
        bus.downgrade(),
    )
}

fn publish_update(bus: &WeakEventBus, info: Option<AgentTaskInfo>) {
    if let (Some(info), Some(bus)) = (info, bus.upgrade()) {
        bus.publish(Event::BackgroundAgentUpdated { info });
    }
}
