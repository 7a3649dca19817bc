pub mod chat;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Gemini,
    OpenAI,
    Anthropic,
    Ollama,
    DeepSeek,
    XAI,
    Groq,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}
impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmType::Gemini),
            "openai" => Ok(LlmType::OpenAI),
            "anthropic" => Ok(LlmType::Anthropic),
            "ollama" => Ok(LlmType::Ollama),
            "deepseek" => Ok(LlmType::DeepSeek),
            "xai" => Ok(LlmType::XAI),
            "groq" => Ok(LlmType::Groq),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmType::Gemini => "gemini",
            LlmType::OpenAI => "openai",
            LlmType::Anthropic => "anthropic",
            LlmType::Ollama => "ollama",
            LlmType::DeepSeek => "deepseek",
            LlmType::XAI => "xai",
            LlmType::Groq => "groq",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Gemini,
            api_key: None,
            completion_model: None,
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_llm_type() {
        assert_eq!("gemini".parse::<LlmType>(), Ok(LlmType::Gemini));
        assert_eq!(" Google ".parse::<LlmType>(), Ok(LlmType::Gemini));
        assert_eq!("OpenAI".parse::<LlmType>(), Ok(LlmType::OpenAI));
        assert_eq!("groq".parse::<LlmType>(), Ok(LlmType::Groq));
        assert!("palm".parse::<LlmType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for llm_type in [
            LlmType::Gemini,
            LlmType::OpenAI,
            LlmType::Anthropic,
            LlmType::Ollama,
            LlmType::DeepSeek,
            LlmType::XAI,
            LlmType::Groq,
        ] {
            assert_eq!(llm_type.to_string().parse::<LlmType>(), Ok(llm_type));
        }
    }
}
