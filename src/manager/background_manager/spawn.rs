//! Background task spawning

use chrono::Utc;

use crate::bus::Event;
use crate::error::{Result, RuntimeError};
use crate::types::identifiers::{IdKind, TaskId};
use crate::types::session::{CreateSession, MessageInfo, PromptRequest};
use crate::types::task::{AgentTaskInfo, SpawnRequest, TaskProgress, TaskStatus};

use super::super::background::{Continuation, spawn_continuation};
use super::super::helpers::{
    BACKGROUND_AGENT_TYPE, PARENT_LOOKBACK, agent_name, compose_prompt, resolve_model,
    resolve_tools, session_title,
};
use super::super::progress::ProgressListener;
use super::core::{BackgroundAgentManager, MAX_CONCURRENT};

impl BackgroundAgentManager {
    /// Spawn a background agent in a new child session
    ///
    /// Returns as soon as the task is registered; the returned snapshot is
    /// always `running`. The prompt runs in a detached continuation whose
    /// outcome is observable only through the registry and the event bus.
    ///
    /// # Errors
    /// Returns error if the concurrency limit is reached, the manager was
    /// shut down, the agent is unknown, or the child session cannot be
    /// created or registered. No task is registered in any of these cases.
    pub async fn spawn(&self, request: SpawnRequest) -> Result<AgentTaskInfo> {
        let reservation = self.registry.reserve(MAX_CONCURRENT)?;

        let parent_messages = self.parent_messages(&request).await;

        let name = agent_name(request.agent.as_deref(), &parent_messages);
        let agent = self
            .collaborators
            .agents
            .get(&name, true)
            .ok_or_else(|| RuntimeError::unknown_agent(name))?;

        let session = self
            .collaborators
            .sessions
            .create(CreateSession {
                parent_id: Some(request.parent_session_id.clone()),
                title: session_title(&request.description, &agent.name),
            })
            .await?;

        let run = self.session_lock.acquire(&session.id).inspect_err(|e| {
            log::warn!(
                "Child session {} created but not registered, left orphaned: {}",
                session.id,
                e
            );
        })?;
        let task_id = TaskId::new(self.collaborators.ids.ascending(IdKind::Task));

        let info = AgentTaskInfo {
            id: task_id.clone(),
            session_id: session.id.clone(),
            parent_session_id: request.parent_session_id.clone(),
            description: request.description.clone(),
            agent: agent.name.clone(),
            status: TaskStatus::Running,
            progress: TaskProgress {
                current_tool: None,
                tool_count: 0,
                start_time: Utc::now(),
                end_time: None,
            },
            error: None,
        };
        if let Err(e) = reservation.commit(info.clone()) {
            run.token().cancel();
            log::warn!(
                "Discarding background agent {} in session {}: {}",
                task_id,
                session.id,
                e
            );
            return Err(e);
        }

        log::info!(
            "Spawned background agent {} (@{}) in session {}",
            task_id,
            agent.name,
            session.id
        );
        self.bus.publish(Event::BackgroundAgentSpawned { info: info.clone() });

        let listener = ProgressListener::attach(&self.bus, &self.registry, &task_id, &session.id);

        let config = self.collaborators.config.get();
        let prompt_request = PromptRequest {
            session_id: session.id.clone(),
            message_id: None,
            model: resolve_model(request.model.as_ref(), &agent, &parent_messages),
            agent: agent.name.clone(),
            agent_type: Some(BACKGROUND_AGENT_TYPE.to_string()),
            tools: resolve_tools(&agent, request.tools.as_ref()),
            parts: Vec::new(),
        };

        spawn_continuation(Continuation {
            task_id,
            run,
            listener,
            registry: self.registry.clone(),
            bus: self.bus.clone(),
            prompts: self.collaborators.prompts.clone(),
            request: prompt_request,
            text: compose_prompt(config.background_prompt(), &request.prompt),
        });

        Ok(info)
    }

    /// Recent parent messages, read only when something is left to inherit
    async fn parent_messages(&self, request: &SpawnRequest) -> Vec<MessageInfo> {
        if request.agent.is_some() && request.model.is_some() {
            return Vec::new();
        }
        match self
            .collaborators
            .sessions
            .messages(&request.parent_session_id, PARENT_LOOKBACK)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!(
                    "Could not read parent session {} for inheritance: {}",
                    request.parent_session_id,
                    e
                );
                Vec::new()
            }
        }
    }
}
