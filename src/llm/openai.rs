use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::sse::decode_stream;
use super::{LanguageModelClient, LlmError, TokenStream};

/// Connection settings for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    /// Bearer token; `None` for local servers that do not authenticate
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Applies to connecting and to whole non-streaming requests
    pub timeout: Duration,
}

impl OpenAiSettings {
    /// Read the API key from the environment variable `var`.
    ///
    /// An empty variable name means the endpoint needs no key.
    pub fn api_key_from_env(var: &str) -> Result<Option<String>, LlmError> {
        if var.is_empty() {
            return Ok(None);
        }
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(LlmError::MissingApiKey(var.to_string())),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
///
/// The rendered prompt is sent as a single user message, so the template
/// fully controls what the model sees.
#[derive(Clone)]
pub struct OpenAiClient {
    settings: OpenAiSettings,
    client: Client,
}

impl OpenAiClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(settings.timeout)
            .build()?;
        Ok(Self::with_http_client(settings, client))
    }

    pub fn with_http_client(mut settings: OpenAiSettings, client: Client) -> Self {
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Self { settings, client }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }
        if !stream {
            request = request.timeout(self.settings.timeout);
        }

        tracing::debug!(model = %self.settings.model, stream, "Sending chat completion request");

        let res = request.send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res)
    }
}

#[async_trait]
impl LanguageModelClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let res = self.send(prompt, false).await?;
        let body = res.text().await?;

        let payload: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(format!("completion body: {e}")))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, LlmError> {
        let res = self.send(prompt, true).await?;
        Ok(decode_stream(Box::pin(res.bytes_stream())))
    }
}
