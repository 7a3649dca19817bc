use async_trait::async_trait;
use std::error::Error as StdError;
use log::{ info, warn };

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ Message, Role };
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

fn backend_for(llm_type: &LlmType) -> LLMBackend {
    match llm_type {
        LlmType::Gemini => LLMBackend::Google,
        LlmType::OpenAI => LLMBackend::OpenAI,
        LlmType::Anthropic => LLMBackend::Anthropic,
        LlmType::Ollama => LLMBackend::Ollama,
        LlmType::DeepSeek => LLMBackend::DeepSeek,
        LlmType::XAI => LLMBackend::XAI,
        LlmType::Groq => LLMBackend::Groq,
    }
}

fn default_model(llm_type: &LlmType) -> &'static str {
    match llm_type {
        LlmType::Gemini => "gemini-1.5-flash",
        LlmType::OpenAI => "gpt-4o-mini",
        LlmType::Anthropic => "claude-3-5-haiku-latest",
        LlmType::Ollama => "llama3",
        LlmType::DeepSeek => "deepseek-chat",
        LlmType::XAI => "grok-2-latest",
        LlmType::Groq => "llama-3.1-8b-instant",
    }
}

fn to_chat_messages(conversation: &[Message]) -> Vec<ChatMessage> {
    conversation
        .iter()
        .map(|m| ChatMessage {
            role: match m.role() {
                Role::User => ChatRole::User,
                Role::Model => ChatRole::Assistant,
            },
            content: m.content().to_string(),
            message_type: MessageType::Text,
        })
        .collect()
}

/// Any provider `rllm` knows how to reach. The provider is built once; when
/// a key is required but missing, every call fails instead of the server.
pub struct HostedChatClient {
    llm: Option<Box<dyn LLMProvider + Send + Sync>>,
    llm_type: LlmType,
    model: String,
    base_url: Option<String>,
}

impl HostedChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| default_model(&llm_type).to_string());
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        let llm: Option<Box<dyn LLMProvider + Send + Sync>> = match (&llm_type, api_key) {
            (LlmType::Ollama, key) | (_, key @ Some(_)) => {
                let mut builder = LLMBuilder::new()
                    .backend(backend_for(&llm_type))
                    .model(&chat_model)
                    .stream(false);
                if let Some(key) = key {
                    builder = builder.api_key(key);
                }
                if let Some(url) = &base_url {
                    builder = builder.base_url(url);
                }
                Some(builder.build()?)
            }
            (_, None) => {
                warn!("No API key configured for {} provider; generation calls will fail", llm_type);
                None
            }
        };

        Ok(Self {
            llm,
            llm_type,
            model: chat_model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Self::new(
            config.llm_type.clone(),
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }
}

#[async_trait]
impl ChatClient for HostedChatClient {
    async fn generate(
        &self,
        conversation: &[Message]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let llm = self.llm
            .as_ref()
            .ok_or_else(|| format!("API key for {} provider is not configured", self.llm_type))?;

        let messages = to_chat_messages(conversation);
        info!(
            "HostedChatClient::generate() → provider={} model={} turns={}",
            self.llm_type,
            self.model,
            messages.len()
        );
        let resp = llm.chat(&messages).await?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}
