//! External collaborator interfaces
//!
//! The orchestration core never owns sessions, prompts or agent definitions.
//! It reaches them through these object-safe traits, which the host runtime
//! implements and hands to [`crate::AgentRuntime::init`].

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::agent::AgentDefinition;
use crate::types::identifiers::{AscendingIds, IdGenerator, SessionId};
use crate::types::options::RuntimeConfig;
use crate::types::session::{CreateSession, MessageInfo, PromptPart, PromptRequest, SessionInfo};

/// Session store collaborator
pub trait SessionService: Send + Sync {
    /// Create a session
    ///
    /// # Errors
    /// Returns error if the store refuses to create the session
    fn create(&self, input: CreateSession) -> BoxFuture<'_, Result<SessionInfo>>;

    /// Most recent messages of a session, newest last, at most `limit`
    ///
    /// # Errors
    /// Returns error if the session cannot be read
    fn messages(&self, session_id: &SessionId, limit: usize)
    -> BoxFuture<'_, Result<Vec<MessageInfo>>>;
}

/// Prompt execution collaborator
pub trait PromptService: Send + Sync {
    /// Resolve prompt text into parts (file references, agent mentions)
    ///
    /// # Errors
    /// Returns error if a referenced resource cannot be resolved
    fn resolve_prompt_parts(&self, text: &str) -> BoxFuture<'_, Result<Vec<PromptPart>>>;

    /// Run a prompt to completion
    ///
    /// Implementations must observe `cancel` at every suspension point and
    /// return [`crate::RuntimeError::Aborted`] once it fires.
    ///
    /// # Errors
    /// Returns error if the model call or a tool execution fails
    fn prompt(
        &self,
        request: PromptRequest,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Agent catalog collaborator
pub trait AgentCatalog: Send + Sync {
    /// Look up an agent by name; `is_background` asks for the background variant
    fn get(&self, name: &str, is_background: bool) -> Option<AgentDefinition>;
}

/// Configuration collaborator
pub trait ConfigSource: Send + Sync {
    /// Current configuration
    fn get(&self) -> RuntimeConfig;
}

impl ConfigSource for RuntimeConfig {
    fn get(&self) -> RuntimeConfig {
        self.clone()
    }
}

/// Every collaborator the runtime needs, bundled for construction
#[derive(Clone)]
pub struct Collaborators {
    /// Session store
    pub sessions: Arc<dyn SessionService>,
    /// Prompt execution
    pub prompts: Arc<dyn PromptService>,
    /// Agent catalog
    pub agents: Arc<dyn AgentCatalog>,
    /// Configuration
    pub config: Arc<dyn ConfigSource>,
    /// Id generation
    pub ids: Arc<dyn IdGenerator>,
}

impl Collaborators {
    /// Bundle collaborators using the default ascending id generator
    pub fn new(
        sessions: Arc<dyn SessionService>,
        prompts: Arc<dyn PromptService>,
        agents: Arc<dyn AgentCatalog>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            sessions,
            prompts,
            agents,
            config,
            ids: Arc::new(AscendingIds::new()),
        }
    }

    /// Replace the id generator
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}
