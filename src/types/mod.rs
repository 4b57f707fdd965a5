//! Type definitions for the agent runtime
//!
//! This module contains the data shapes shared across components,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers and the ascending id generator
//! - [`permissions`] - Permission requests and the response wire format
//! - [`agent`] - Agent definitions and model references
//! - [`task`] - Background agent task records
//! - [`session`] - Session, message and prompt shapes
//! - [`options`] - Runtime configuration

pub mod agent;
pub mod identifiers;
pub mod options;
pub mod permissions;
pub mod session;
pub mod task;

// Re-export commonly used types
pub use agent::{AgentDefinition, ModelRef};
pub use identifiers::{
    AscendingIds, IdGenerator, IdKind, MessageId, RequestId, SessionId, TaskId, ToolName,
};
pub use options::{BackgroundAgentConfig, RuntimeConfig, RuntimeConfigBuilder};
pub use permissions::{
    Answer, PermissionLevel, PermissionRequest, Response, ResponseDetail, ResponseKind,
};
pub use session::{
    CreateSession, MessageInfo, MessageRole, PromptPart, PromptRequest, SessionInfo,
};
pub use task::{AgentTaskInfo, SpawnRequest, TaskProgress, TaskStatus};
