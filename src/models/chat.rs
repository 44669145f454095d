use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use crate::error::{ RelayError, Result };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Body of `POST /api/chat`. Extra fields sent by the browser (message ids,
/// timestamps) are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: JsonValue = serde_json
            ::from_slice(body)
            .map_err(|e| RelayError::MalformedRequest(format!("body is not valid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(RelayError::MalformedRequest("body must be a JSON object".to_string()));
        }

        serde_json::from_value(value).map_err(|e| RelayError::MalformedRequest(e.to_string()))
    }
}
