//! HTTP oracle over hosted chat-completion APIs
//!
//! Speaks both the Anthropic messages format and the OpenAI-compatible
//! chat format (DeepSeek and friends); the provider is picked from the
//! endpoint URL. A reply without any text comes back as an empty string.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::llm::oracle::Oracle;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAiCompatible,
}

impl Provider {
    fn for_url(url: &str) -> Self {
        if url.contains("anthropic.com") {
            Provider::Anthropic
        } else {
            Provider::OpenAiCompatible
        }
    }
}

/// Connection settings for [`LlmClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ClientSettings {
    /// Read settings from the environment
    ///
    /// `LLM_API_KEY` is required. `LLM_API_URL`, `LLM_MODEL` and
    /// `LLM_MAX_TOKENS` fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY").map_err(|_| SimError::LlmError("LLM_API_KEY not set".into()))?;
        let max_tokens = match std::env::var("LLM_MAX_TOKENS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| SimError::Config(format!("LLM_MAX_TOKENS is not a number: {}", raw)))?,
            Err(_) => DEFAULT_MAX_TOKENS,
        };
        Ok(Self {
            api_key,
            api_url: std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            max_tokens,
        })
    }
}

/// Oracle backed by a hosted model
#[derive(Debug)]
pub struct LlmClient {
    http: Client,
    settings: ClientSettings,
    provider: Provider,
}

impl LlmClient {
    pub fn new(settings: ClientSettings) -> Self {
        let provider = Provider::for_url(&settings.api_url);
        Self {
            http: Client::new(),
            settings,
            provider,
        }
    }

    pub fn from_env() -> Result<Self> {
        ClientSettings::from_env().map(Self::new)
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// One system + user exchange, returning the reply text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let settings = &self.settings;
        match self.provider {
            Provider::Anthropic => {
                let body = MessagesRequest {
                    model: &settings.model,
                    max_tokens: settings.max_tokens,
                    system,
                    messages: vec![ChatTurn { role: "user", content: user }],
                };
                let request = self
                    .http
                    .post(&settings.api_url)
                    .header("x-api-key", &settings.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&body);
                let reply: MessagesReply = send(request).await?;
                Ok(reply.text())
            }
            Provider::OpenAiCompatible => {
                let body = ChatRequest {
                    model: &settings.model,
                    max_tokens: settings.max_tokens,
                    messages: vec![
                        ChatTurn { role: "system", content: system },
                        ChatTurn { role: "user", content: user },
                    ],
                };
                let request = self.http.post(&settings.api_url).bearer_auth(&settings.api_key).json(&body);
                let reply: ChatReply = send(request).await?;
                Ok(reply.text())
            }
        }
    }
}

#[async_trait]
impl Oracle for LlmClient {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        self.complete(system_prompt, prompt).await
    }
}

/// Send a request and decode the JSON body, mapping every failure to a transport error
async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await.map_err(|e| SimError::LlmError(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(SimError::LlmError(format!("API error ({}): {}", status, detail)));
    }
    response.json().await.map_err(|e| SimError::LlmError(e.to_string()))
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatTurn<'a>>,
}

#[derive(Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<TextBlock>,
}

#[derive(Deserialize)]
struct TextBlock {
    #[serde(default)]
    text: String,
}

impl MessagesReply {
    fn text(self) -> String {
        self.content.into_iter().map(|block| block.text).collect()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatTurn<'a>>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatReply {
    fn text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}
