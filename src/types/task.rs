//! Background agent task records
//!
//! `AgentTaskInfo` is the snapshot handed to callers and carried by every
//! `background-agent.*` event.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::ModelRef;
use super::identifiers::{SessionId, TaskId};

/// Lifecycle status of a background agent task
///
/// `Running` is the only non-terminal status; nothing transitions back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Continuation still in flight
    Running,
    /// Continuation settled successfully
    Completed,
    /// Continuation failed
    Failed,
    /// Cancellation requested and acknowledged
    Aborted,
}

impl TaskStatus {
    /// True for `completed`, `failed` and `aborted`
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Progress counters of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    /// Tool currently executing, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tool: Option<String>,
    /// Number of tool calls started so far
    pub tool_count: u32,
    /// When the task was spawned
    pub start_time: DateTime<Utc>,
    /// Set exactly when the status is terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Snapshot of one background agent task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskInfo {
    /// Task id
    pub id: TaskId,
    /// Child session running the task
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Session that spawned the task
    #[serde(rename = "parentSessionID")]
    pub parent_session_id: SessionId,
    /// Short description given at spawn
    pub description: String,
    /// Resolved agent name
    pub agent: String,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Progress counters
    pub progress: TaskProgress,
    /// Failure or abort reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request parameters for spawning a background agent
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Session spawning the task
    pub parent_session_id: SessionId,
    /// Short description, also used for the child session title
    pub description: String,
    /// Prompt text sent to the child session
    pub prompt: String,
    /// Explicit agent name
    pub agent: Option<String>,
    /// Tool allow-map overrides
    pub tools: Option<HashMap<String, bool>>,
    /// Explicit model
    pub model: Option<ModelRef>,
}

impl SpawnRequest {
    /// Create a request with agent, tools and model left to inheritance
    pub fn new(
        parent_session_id: impl Into<SessionId>,
        description: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            parent_session_id: parent_session_id.into(),
            description: description.into(),
            prompt: prompt.into(),
            agent: None,
            tools: None,
            model: None,
        }
    }

    /// Select the agent explicitly
    #[must_use]
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Override tool enablement
    #[must_use]
    pub fn tools(mut self, tools: HashMap<String, bool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Select the model explicitly
    #[must_use]
    pub fn model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }
}
