use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use log::{ info, debug };

use super::{ ChatClient, CompletionResponse };
use crate::llm::LlmConfig;
use crate::models::chat::Message;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize, Debug)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

fn build_request(conversation: &[Message]) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: conversation
            .iter()
            .map(|m| GeminiContent {
                role: m.role().as_str(),
                parts: vec![GeminiPart {
                    text: m.content().to_string(),
                }],
            })
            .collect(),
    }
}

fn extract_text(resp: GoogleResponse) -> Result<String, Box<dyn StdError + Send + Sync>> {
    let content = resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| "No candidates in Gemini response".to_string())?;

    let texts: Vec<String> = content.parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if texts.is_empty() {
        return Err("Gemini candidate carried no text parts".into());
    }
    Ok(texts.concat())
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>
    ) -> Self {
        Self {
            http: HttpClient::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != crate::llm::LlmType::Gemini {
            return Err("Invalid config type for GeminiChatClient".into());
        }

        Ok(Self::new(
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(
        &self,
        conversation: &[Message]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let api_key = self.api_key
            .as_deref()
            .ok_or_else(|| "Google API key is not configured (GOOGLE_API_KEY)".to_string())?;

        let payload = build_request(conversation);
        info!(
            "GeminiChatClient::generate() → model={} turns={}",
            self.model,
            payload.contents.len()
        );

        let resp = self.http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&payload)
            .send().await?
            .error_for_status()?
            .json::<GoogleResponse>().await?;

        let text = extract_text(resp)?;
        debug!("Gemini returned {} bytes of text", text.len());
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
