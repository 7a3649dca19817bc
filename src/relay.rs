use log::{ debug, error, warn };
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::chat::ChatClient;
use crate::models::chat::{ Message, Role };

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Conversation history is required")]
    MissingConversation,
    #[error("Failed to generate content")]
    MalformedRequest,
    #[error("Failed to generate content")]
    Upstream,
}

/// Stateless relay between a client conversation and the upstream model.
#[derive(Clone)]
pub struct RelayService {
    chat_client: Arc<dyn ChatClient>,
}

impl RelayService {
    pub fn new(chat_client: Arc<dyn ChatClient>) -> Self {
        Self { chat_client }
    }

    pub fn model(&self) -> String {
        self.chat_client.get_model()
    }

    /// Validates a raw request body, forwards the conversation upstream and
    /// returns the reply text. The upstream is not called when validation
    /// fails.
    pub async fn generate(&self, body: &[u8]) -> Result<String, RelayError> {
        let conversation = parse_conversation(body)?;
        debug!("Forwarding {} turns to model {}", conversation.len(), self.model());

        match self.chat_client.generate(&conversation).await {
            Ok(resp) => Ok(resp.response),
            Err(e) => {
                error!("Error generating content: {}", e);
                Err(RelayError::Upstream)
            }
        }
    }
}

/// Reads `conversation` out of a JSON body. An absent, null or empty list is
/// a client error; a body that is not JSON, or a `conversation` that is not
/// a list, is a server failure. Individual entries are mapped leniently.
pub fn parse_conversation(body: &[u8]) -> Result<Vec<Message>, RelayError> {
    let payload: JsonValue = serde_json::from_slice(body).map_err(|e| {
        warn!("Undecodable request body: {}", e);
        RelayError::MalformedRequest
    })?;

    let entries = match payload.get("conversation") {
        None | Some(JsonValue::Null) => {
            return Err(RelayError::MissingConversation);
        }
        Some(JsonValue::Array(entries)) if entries.is_empty() => {
            return Err(RelayError::MissingConversation);
        }
        Some(JsonValue::Array(entries)) => entries,
        Some(other) => {
            warn!("`conversation` is not a list: {}", other);
            return Err(RelayError::MalformedRequest);
        }
    };

    Ok(entries.iter().map(map_entry).collect())
}

fn map_entry(entry: &JsonValue) -> Message {
    let role = Role::from_wire(entry.get("role").unwrap_or(&JsonValue::Null));
    let content = match entry.get("content") {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Message::new(role, content)
}
