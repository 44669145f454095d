use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Persona prepended to every conversation unless a prompts file overrides it.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful medical assistant for HealthConnect, a healthcare management system. Provide concise and helpful responses to user queries about health and the HealthConnect system.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompts file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse prompts file '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Prompts file '{0}' has an empty system_prompt")]
    Empty(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
}

pub fn load_prompts(path: &str) -> Result<PromptConfig, PromptError> {
    let file_content = fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_string(),
        source,
    })?;
    let config: PromptConfig = serde_json::from_str(&file_content).map_err(|source| PromptError::Json {
        path: path.to_string(),
        source,
    })?;
    if config.system_prompt.trim().is_empty() {
        return Err(PromptError::Empty(path.to_string()));
    }
    Ok(config)
}

/// The system prompt from `path` when given, the built-in persona otherwise.
pub fn resolve_system_prompt(path: Option<&str>) -> Result<String, PromptError> {
    match path {
        Some(p) => load_prompts(p).map(|c| c.system_prompt),
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
    }
}
