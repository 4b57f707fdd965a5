//! Permission-related type definitions
//!
//! This module contains the permission request record and the response wire
//! format. A [`Response`] is either a bare string (`"once"`, `"always"`,
//! `"reject"`) or an object carrying the same `type` plus optional `message`,
//! `agent` and `answers`. The two shapes never collapse into each other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::identifiers::{RequestId, SessionId, ToolName};

// ============================================================================
// Response Wire Format
// ============================================================================

/// Resolution kind of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Approve this single invocation only
    Once,
    /// Approve and remember the approval for this tool and signature
    Always,
    /// Deny the invocation
    Reject,
}

impl ResponseKind {
    /// True for `once` and `always`
    #[must_use]
    pub const fn is_approval(self) -> bool {
        matches!(self, Self::Once | Self::Always)
    }
}

/// Answer to a clarifying question collected during approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Answer {
    /// Single free-form or selected answer
    Single(String),
    /// Multiple selected answers
    Multiple(Vec<String>),
}

/// Object form of a [`Response`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseDetail {
    /// Resolution kind
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Explanation, surfaced to the agent on reject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Agent the approval binds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Question id to answer mapping; an empty map is distinct from absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<BTreeMap<String, Answer>>,
}

/// Permission response as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Response {
    /// Bare literal form
    Bare(ResponseKind),
    /// Structured form
    Detailed(ResponseDetail),
}

impl Response {
    /// Bare `"once"`
    #[must_use]
    pub const fn once() -> Self {
        Self::Bare(ResponseKind::Once)
    }

    /// Bare `"always"`
    #[must_use]
    pub const fn always() -> Self {
        Self::Bare(ResponseKind::Always)
    }

    /// Bare `"reject"`
    #[must_use]
    pub const fn reject() -> Self {
        Self::Bare(ResponseKind::Reject)
    }

    /// Structured reject carrying an explanation
    pub fn reject_with(message: impl Into<String>) -> Self {
        Self::Detailed(ResponseDetail {
            kind: ResponseKind::Reject,
            message: Some(message.into()),
            agent: None,
            answers: None,
        })
    }

    /// Resolution kind regardless of the wire shape
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::Bare(kind) => *kind,
            Self::Detailed(detail) => detail.kind,
        }
    }

    /// Optional explanation
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Bare(_) => None,
            Self::Detailed(detail) => detail.message.as_deref(),
        }
    }

    /// Optional agent binding
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::Bare(_) => None,
            Self::Detailed(detail) => detail.agent.as_deref(),
        }
    }

    /// Optional clarifying answers
    #[must_use]
    pub fn answers(&self) -> Option<&BTreeMap<String, Answer>> {
        match self {
            Self::Bare(_) => None,
            Self::Detailed(detail) => detail.answers.as_ref(),
        }
    }

    /// True for `once` and `always`
    #[must_use]
    pub const fn is_approval(&self) -> bool {
        self.kind().is_approval()
    }
}

impl From<ResponseKind> for Response {
    fn from(kind: ResponseKind) -> Self {
        Self::Bare(kind)
    }
}

// ============================================================================
// Permission Request
// ============================================================================

/// Approval level requested for a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Plain approval
    #[default]
    Ask,
    /// Approval additionally gated behind a PIN
    Pin,
}

/// One pending approval, as announced on the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Request id
    pub id: RequestId,
    /// Session the tool call runs in
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    /// Tool call id within the session, when known
    #[serde(rename = "callID", skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Tool being invoked
    pub tool: ToolName,
    /// Snapshot of the tool arguments
    pub arguments: serde_json::Value,
    /// Signature remembered by an `always` approval
    pub signature: String,
    /// Requested approval level
    pub level: PermissionLevel,
    /// Human-readable title for the approval prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hidden-character warning for the surfaced command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// When the request was created
    pub created_at: DateTime<Utc>,
}
