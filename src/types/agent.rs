//! Agent definition and model reference types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Provider-qualified model reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider identifier (e.g. "anthropic")
    #[serde(rename = "providerID")]
    pub provider_id: String,
    /// Model identifier within the provider
    #[serde(rename = "modelID")]
    pub model_id: String,
}

impl ModelRef {
    /// Create a model reference
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
        }
    }
}

/// Agent definition as returned by the agent catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Agent name (e.g. "build", "plan")
    pub name: String,
    /// Agent description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Model pinned by the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
    /// Tool enablement overrides carried by the agent
    #[serde(default)]
    pub tools: HashMap<String, bool>,
    /// Agent system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl AgentDefinition {
    /// Create a definition with no model or tool overrides
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            tools: HashMap::new(),
            prompt: None,
        }
    }

    /// Pin a model
    #[must_use]
    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    /// Override one tool's enablement
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>, enabled: bool) -> Self {
        self.tools.insert(tool.into(), enabled);
        self
    }
}
