//! Event payloads carried on the bus
//!
//! Every event name maps to exactly one variant with a fixed payload shape.
//! On the wire an event is `{ "type": <name>, "properties": <payload> }`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::identifiers::{RequestId, SessionId};
use crate::types::permissions::{PermissionRequest, Response};
use crate::types::task::AgentTaskInfo;

/// Closed set of events published on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties")]
pub enum Event {
    /// A background agent task was registered
    #[serde(rename = "background-agent.spawned")]
    BackgroundAgentSpawned {
        /// Task snapshot
        info: AgentTaskInfo,
    },
    /// A running task's progress changed
    #[serde(rename = "background-agent.updated")]
    BackgroundAgentUpdated {
        /// Task snapshot
        info: AgentTaskInfo,
    },
    /// A task's continuation settled successfully
    #[serde(rename = "background-agent.completed")]
    BackgroundAgentCompleted {
        /// Task snapshot
        info: AgentTaskInfo,
    },
    /// A task failed or was aborted
    #[serde(rename = "background-agent.failed")]
    BackgroundAgentFailed {
        /// Task snapshot
        info: AgentTaskInfo,
        /// Failure or abort reason
        error: String,
    },
    /// A tool invocation is waiting for approval
    #[serde(rename = "permission.requested")]
    PermissionRequested {
        /// The pending request
        request: PermissionRequest,
    },
    /// A permission request was resolved
    #[serde(rename = "permission.replied")]
    PermissionReplied {
        /// Session of the request
        #[serde(rename = "sessionID")]
        session_id: SessionId,
        /// Resolved request
        #[serde(rename = "requestID")]
        request_id: RequestId,
        /// Effective response
        response: Response,
    },
    /// A tool started executing inside a session
    #[serde(rename = "session.tool.started")]
    ToolStarted {
        /// Session running the tool
        #[serde(rename = "sessionID")]
        session_id: SessionId,
        /// Tool call id
        #[serde(rename = "callID")]
        call_id: String,
        /// Tool name
        tool: String,
    },
    /// A tool finished executing inside a session
    #[serde(rename = "session.tool.completed")]
    ToolCompleted {
        /// Session running the tool
        #[serde(rename = "sessionID")]
        session_id: SessionId,
        /// Tool call id
        #[serde(rename = "callID")]
        call_id: String,
        /// Tool name
        tool: String,
        /// Tool failure, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Event {
    /// Kind tag of this event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BackgroundAgentSpawned { .. } => EventKind::BackgroundAgentSpawned,
            Self::BackgroundAgentUpdated { .. } => EventKind::BackgroundAgentUpdated,
            Self::BackgroundAgentCompleted { .. } => EventKind::BackgroundAgentCompleted,
            Self::BackgroundAgentFailed { .. } => EventKind::BackgroundAgentFailed,
            Self::PermissionRequested { .. } => EventKind::PermissionRequested,
            Self::PermissionReplied { .. } => EventKind::PermissionReplied,
            Self::ToolStarted { .. } => EventKind::ToolStarted,
            Self::ToolCompleted { .. } => EventKind::ToolCompleted,
        }
    }

    /// Session the event is scoped to
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::BackgroundAgentSpawned { info }
            | Self::BackgroundAgentUpdated { info }
            | Self::BackgroundAgentCompleted { info }
            | Self::BackgroundAgentFailed { info, .. } => &info.session_id,
            Self::PermissionRequested { request } => &request.session_id,
            Self::PermissionReplied { session_id, .. }
            | Self::ToolStarted { session_id, .. }
            | Self::ToolCompleted { session_id, .. } => session_id,
        }
    }
}

/// Event type names, used as subscription keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `background-agent.spawned`
    BackgroundAgentSpawned,
    /// `background-agent.updated`
    BackgroundAgentUpdated,
    /// `background-agent.completed`
    BackgroundAgentCompleted,
    /// `background-agent.failed`
    BackgroundAgentFailed,
    /// `permission.requested`
    PermissionRequested,
    /// `permission.replied`
    PermissionReplied,
    /// `session.tool.started`
    ToolStarted,
    /// `session.tool.completed`
    ToolCompleted,
}

impl EventKind {
    /// Wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BackgroundAgentSpawned => "background-agent.spawned",
            Self::BackgroundAgentUpdated => "background-agent.updated",
            Self::BackgroundAgentCompleted => "background-agent.completed",
            Self::BackgroundAgentFailed => "background-agent.failed",
            Self::PermissionRequested => "permission.requested",
            Self::PermissionReplied => "permission.replied",
            Self::ToolStarted => "session.tool.started",
            Self::ToolCompleted => "session.tool.completed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event plus publish timestamp, as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Typed payload
    #[serde(flatten)]
    pub event: Event,
    /// When the event was published
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// Wrap an event with the current time
    #[must_use]
    pub fn now(event: Event) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    /// Kind tag of the wrapped event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
