//! # thinkchain gateway
//!
//! The single point where thinkchain talks to a language model.
//!
//! ## Core Concepts
//! - **Provider**: trait-based access to a chat-completion backend (`ZhipuProvider` over HTTP)
//! - **Session parameters**: API key, model and sampling values supplied per run, never persisted
//! - **Gateway**: sends one system instruction plus one user message and returns the reply text,
//!   turning any failure into an `"Error: ..."` string

pub mod gateway;
pub mod params;
pub mod provider;

pub use gateway::{is_failure, render_failure, Gateway, Reply, ERROR_PREFIX};
pub use params::{Model, SessionParams};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    ProviderConfig, Role, Usage, UsageTracker, ZhipuProvider,
};
#[cfg(any(test, feature = "mock"))]
pub use provider::mock::MockProvider;

pub use thinkchain_error::{Error, ErrorKind, Result};
