//! Session, message and prompt shapes exchanged with collaborators

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::agent::ModelRef;
use super::identifiers::{MessageId, SessionId};

/// Session created by the session collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id
    pub id: SessionId,
    /// Parent session, for child sessions
    #[serde(rename = "parentID", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SessionId>,
    /// Session title
    pub title: String,
    /// Working directory of the session
    pub directory: PathBuf,
}

/// Parameters for creating a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSession {
    /// Parent session
    pub parent_id: Option<SessionId>,
    /// Title
    pub title: String,
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User turn
    User,
    /// Assistant turn
    Assistant,
}

/// Message metadata used to inherit agent and model from a parent session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message id
    pub id: MessageId,
    /// Author role
    pub role: MessageRole,
    /// Agent that produced or received the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Model the message used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
}

/// One resolved prompt part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptPart {
    /// Plain text
    Text {
        /// Text content
        text: String,
    },
    /// File attachment referenced from the prompt
    File {
        /// File URL
        url: String,
        /// MIME type
        mime: String,
        /// Display file name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    /// Agent mention
    Agent {
        /// Mentioned agent
        name: String,
    },
}

/// Input to the prompt collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Session to run the prompt in
    pub session_id: SessionId,
    /// Message id to use for the user message, if preassigned
    pub message_id: Option<MessageId>,
    /// Effective model; `None` lets the prompt layer pick its default
    pub model: Option<ModelRef>,
    /// Resolved agent name
    pub agent: String,
    /// Agent kind tag, `background` for background agents
    pub agent_type: Option<String>,
    /// Effective tool allow-map
    pub tools: HashMap<String, bool>,
    /// Prompt parts
    pub parts: Vec<PromptPart>,
}
