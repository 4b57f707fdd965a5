//! Helper functions for spawn-time resolution
//!
//! Pure functions deciding agent, model, tools, title and prompt text for a
//! background task from the request, the agent definition and the parent
//! session's recent messages.

use std::collections::HashMap;

use crate::types::agent::{AgentDefinition, ModelRef};
use crate::types::session::{MessageInfo, MessageRole};

/// Agent used when neither the request nor the parent session names one
pub(super) const FALLBACK_AGENT: &str = "build";

/// Agent kind tag passed to the prompt collaborator
pub(super) const BACKGROUND_AGENT_TYPE: &str = "background";

/// How many parent messages to scan when inheriting agent and model
pub(super) const PARENT_LOOKBACK: usize = 50;

/// Tools a background agent may never use, so it cannot spawn further agents
pub(super) const FORCE_DISABLED_TOOLS: [&str; 2] = ["task", "background_agent"];

/// Agent of the parent session's most recent assistant message
pub(super) fn inherited_agent(messages: &[MessageInfo]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|msg| msg.role == MessageRole::Assistant)
        .find_map(|msg| msg.agent.as_deref())
}

/// Model of the parent session's most recent message that carries one
pub(super) fn inherited_model(messages: &[MessageInfo]) -> Option<&ModelRef> {
    messages.iter().rev().find_map(|msg| msg.model.as_ref())
}

/// Name of the agent to run: explicit, else inherited, else the fallback
pub(super) fn agent_name(explicit: Option<&str>, messages: &[MessageInfo]) -> String {
    explicit
        .or_else(|| inherited_agent(messages))
        .unwrap_or(FALLBACK_AGENT)
        .to_string()
}

/// Effective model: explicit, else the agent's, else the parent's, else none
pub(super) fn resolve_model(
    explicit: Option<&ModelRef>,
    agent: &AgentDefinition,
    messages: &[MessageInfo],
) -> Option<ModelRef> {
    explicit
        .or(agent.model.as_ref())
        .or_else(|| inherited_model(messages))
        .cloned()
}

/// Effective tool allow-map
///
/// Request overrides are layered over the agent's map, then the recursive
/// spawning tools are switched off regardless of either.
pub(super) fn resolve_tools(
    agent: &AgentDefinition,
    overrides: Option<&HashMap<String, bool>>,
) -> HashMap<String, bool> {
    let mut tools = agent.tools.clone();
    if let Some(overrides) = overrides {
        tools.extend(overrides.iter().map(|(name, enabled)| (name.clone(), *enabled)));
    }
    for name in FORCE_DISABLED_TOOLS {
        tools.insert(name.to_string(), false);
    }
    tools
}

/// Title of the child session
pub(super) fn session_title(description: &str, agent: &str) -> String {
    format!("{description} (@{agent} background agent)")
}

/// Prompt text with the configured background preamble in front, if any
pub(super) fn compose_prompt(preamble: Option<&str>, prompt: &str) -> String {
    match preamble.map(str::trim).filter(|p| !p.is_empty()) {
        Some(preamble) => format!("{preamble}\n\n{prompt}"),
        None => prompt.to_string(),
    }
}
