//! Client for OpenAI-compatible chat completion endpoints.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, Groq and anything else that
//! exposes `POST {base_url}/chat/completions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stemchat_core::error::ProviderError;
use stemchat_core::message::Message;
use stemchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use tracing::{debug, warn};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Replace the overall HTTP request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Could not configure HTTP client, using defaults");
            reqwest::Client::new()
        })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&CompletionBody::from(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status = status.as_u16(), "Completion request rejected");
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let reply: CompletionReply = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status.as_u16(),
            message: format!("unreadable completion: {e}"),
        })?;

        reply.into_response()
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ProviderRequest> for CompletionBody<'a> {
    fn from(request: &'a ProviderRequest) -> Self {
        Self {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl CompletionReply {
    /// The first choice becomes the assistant message. A reply without
    /// choices is an API error; a null body is returned as empty text and
    /// left for the caller to judge.
    fn into_response(self) -> Result<ProviderResponse, ProviderError> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "completion contained no choices".into(),
            });
        };

        if let Some(role) = choice.message.role.as_deref().filter(|r| *r != "assistant") {
            debug!(role, "Completion carried an unexpected role");
        }

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: self.model,
        })
    }
}
