pub mod gemini;
pub mod hosted;

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as StdError;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::gemini::GeminiChatClient;
use self::hosted::HostedChatClient;
use crate::models::chat::Message;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// A text-completion-from-turns upstream. Implementations receive the full
/// conversation on every call and keep no state between calls.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(
        &self,
        conversation: &[Message]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        _ => {
            let specific_client = HostedChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_defaults_to_gemini_model() {
        let client = new_client(&LlmConfig::default()).unwrap();
        assert_eq!(client.get_model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_new_client_keeps_configured_model() {
        let config = LlmConfig {
            llm_type: LlmType::Ollama,
            api_key: None,
            completion_model: Some("llama3".to_string()),
            base_url: Some("http://localhost:11434".to_string()),
        };
        let client = new_client(&config).unwrap();
        assert_eq!(client.get_model(), "llama3");
        assert_eq!(client.get_base_url().as_deref(), Some("http://localhost:11434"));
    }
}
