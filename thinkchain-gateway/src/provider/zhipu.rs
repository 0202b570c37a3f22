//! Zhipu (BigModel) provider
//!
//! The endpoint is OpenAI-compatible, so any `/chat/completions` server
//! works when `base_url` is pointed at it.

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thinkchain_error::Error;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "glm-4-plus";

/// Chat-completion provider for the GLM model family
pub struct ZhipuProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

impl ZhipuProvider {
    pub fn new(config: ProviderConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            Error::unexpected(format!("failed to create HTTP client: {}", e))
                .with_operation("zhipu::new")
                .set_source(e)
        })?;

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl LlmProvider for ZhipuProvider {
    fn name(&self) -> &str {
        "zhipu"
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.as_deref().unwrap_or(self.default_model());

        let api_request = ZhipuRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| ZhipuMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            top_p: request.top_p,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: request.stream,
        };

        let endpoint = self.endpoint();
        debug!(%endpoint, model, "POST chat completion");

        let mut req = self.client.post(&endpoint).json(&api_request);

        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| {
            Error::network_failed(e.to_string())
                .with_operation("zhipu::complete")
                .with_context("endpoint", endpoint.clone())
                .set_source(e)
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = error_detail(&text);

            let err = match status {
                401 | 403 => Error::authentication_failed(status, detail),
                429 => Error::rate_limited(detail),
                _ => Error::api_failed(status, detail),
            };
            return Err(err.with_operation("zhipu::complete").with_context("model", model));
        }

        let api_response: ZhipuResponse = response.json().await.map_err(|e| {
            Error::parse_failed(format!("failed to decode response: {}", e))
                .with_operation("zhipu::complete")
                .set_source(e)
        })?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            Error::empty_response("no choices in response").with_operation("zhipu::complete")
        })?;

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: api_response.id,
            model: if api_response.model.is_empty() {
                model.to_string()
            } else {
                api_response.model
            },
            content: choice.message.content,
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

/// Pull the human-readable message out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ZhipuErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ZhipuRequest<'a> {
    model: &'a str,
    messages: Vec<ZhipuMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ZhipuMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ZhipuResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ZhipuChoice>,
    usage: Option<ZhipuUsage>,
}

#[derive(Debug, Deserialize)]
struct ZhipuChoice {
    message: ZhipuReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZhipuReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZhipuUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ZhipuErrorBody {
    error: ZhipuErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ZhipuErrorDetail {
    message: Option<String>,
}
