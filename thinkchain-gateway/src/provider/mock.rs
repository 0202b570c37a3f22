//! Scripted provider for tests.
//!
//! Replies are consumed in order; every request is recorded so tests can
//! check what the gateway actually sent.

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use thinkchain_error::{Error, ErrorKind};

enum Scripted {
    Text(String),
    Truncated(String),
    NoContent,
    Fail(ErrorKind, String),
}

#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Text(text.into()))
    }

    /// Queue a reply cut off by the token limit
    pub fn truncated(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Truncated(text.into()))
    }

    /// Queue a reply whose message has no content
    pub fn no_content(self) -> Self {
        self.push(Scripted::NoContent)
    }

    /// Queue a failure
    pub fn fail(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(kind, message.into()))
    }

    fn push(self, entry: Scripted) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(entry);
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// User-message text of every request received so far
    pub fn user_inputs(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.content_of(Role::User).unwrap_or_default().to_string())
            .collect()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model().to_string());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let (content, finish_reason) = match next {
            Some(Scripted::Text(text)) => (Some(text), FinishReason::Stop),
            Some(Scripted::Truncated(text)) => (Some(text), FinishReason::Length),
            Some(Scripted::NoContent) => (None, FinishReason::Stop),
            Some(Scripted::Fail(kind, message)) => {
                return Err(Error::new(kind, message).with_operation("mock::complete"))
            }
            None => {
                return Err(Error::unexpected("mock script exhausted")
                    .with_operation("mock::complete"))
            }
        };

        let completion_tokens = content.as_ref().map_or(0, |c| c.chars().count() as u64);
        Ok(CompletionResponse {
            id: "mock".to_string(),
            model,
            content,
            finish_reason,
            usage: Usage {
                prompt_tokens: 1,
                completion_tokens,
                total_tokens: 1 + completion_tokens,
            },
        })
    }
}
