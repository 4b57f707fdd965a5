//! Runtime configuration
//!
//! This module contains the configuration the orchestration core reads through
//! the config collaborator, including a builder pattern for easy configuration.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

// ============================================================================
// Runtime Config
// ============================================================================

/// Background agent section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundAgentConfig {
    /// Extra instructions prepended to every background agent prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Configuration consumed by the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Background agent settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_agent: Option<BackgroundAgentConfig>,
}

impl RuntimeConfig {
    /// Create a new builder for `RuntimeConfig`
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        log::debug!("Loaded runtime config from {}", path.display());
        Self::from_json_str(&raw)
    }

    /// Check invariants the serde schema cannot express
    ///
    /// # Errors
    /// Returns error if the background prompt is present but blank
    pub fn validate(&self) -> Result<()> {
        if let Some(prompt) = self.background_prompt()
            && prompt.trim().is_empty()
        {
            return Err(RuntimeError::invalid_config(
                "backgroundAgent.prompt must not be blank",
            ));
        }
        Ok(())
    }

    /// JSON Schema of the configuration document
    #[must_use]
    pub fn json_schema() -> serde_json::Value {
        schemars::schema_for!(RuntimeConfig).to_value()
    }

    /// Background agent prompt preamble, if configured
    #[must_use]
    pub fn background_prompt(&self) -> Option<&str> {
        self.background_agent
            .as_ref()
            .and_then(|section| section.prompt.as_deref())
    }
}

// ============================================================================
// Builder for RuntimeConfig
// ============================================================================

/// Builder for `RuntimeConfig`
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Set the background agent prompt preamble
    #[must_use]
    pub fn background_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config
            .background_agent
            .get_or_insert_with(BackgroundAgentConfig::default)
            .prompt = Some(prompt.into());
        self
    }

    /// Build the config
    #[must_use]
    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
