//! The model gateway: one instruction, one user message, one reply.

use crate::params::SessionParams;
use crate::provider::{
    ChatMessage, CompletionRequest, FinishReason, LlmProvider, ProviderConfig, Usage,
    ZhipuProvider,
};
use thinkchain_error::{Error, Result};
use tracing::{debug, warn};

/// Every failed exchange renders to a string starting with this.
pub const ERROR_PREFIX: &str = "Error: ";

/// Render a failure the way it is shown in place of an answer.
pub fn render_failure(err: &Error) -> String {
    format!("{}{}", ERROR_PREFIX, err.message())
}

/// Whether a reply is a rendered failure rather than model output.
pub fn is_failure(reply: &str) -> bool {
    reply.starts_with(ERROR_PREFIX)
}

/// A successful reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub model: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Holds the provider and the session parameters for a run.
///
/// Each exchange is stateless: no history is kept between calls.
pub struct Gateway<P> {
    provider: P,
    params: SessionParams,
}

impl Gateway<ZhipuProvider> {
    /// Build a gateway backed by a fresh HTTP provider.
    pub fn connect(config: ProviderConfig, params: SessionParams) -> Result<Self> {
        let provider = ZhipuProvider::new(config, params.api_key.clone())
            .map_err(|e| e.with_operation("gateway::connect"))?;
        Ok(Self::new(provider, params))
    }
}

impl<P: LlmProvider> Gateway<P> {
    pub fn new(provider: P, params: SessionParams) -> Self {
        Self { provider, params }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The request sent for one exchange: system instruction, user text,
    /// and the session's sampling parameters, unchanged.
    pub fn request(&self, instruction: &str, user_text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system(instruction),
            ChatMessage::user(user_text),
        ])
        .with_model(self.params.model.as_str())
        .with_top_p(self.params.top_p)
        .with_temperature(self.params.temperature)
        .with_max_tokens(self.params.max_tokens)
    }

    /// One exchange, with failures as structured errors.
    pub async fn try_complete(&self, instruction: &str, user_text: &str) -> Result<Reply> {
        let request = self.request(instruction, user_text);
        debug!(
            provider = self.provider.name(),
            model = %self.params.model,
            top_p = self.params.top_p,
            temperature = self.params.temperature,
            max_tokens = self.params.max_tokens,
            input_chars = user_text.chars().count(),
            "sending exchange"
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.with_operation("gateway::complete"))?;

        let text = response.content.ok_or_else(|| {
            Error::empty_response("no content in response")
                .with_operation("gateway::complete")
                .with_context("model", response.model.clone())
        })?;

        debug!(
            id = %response.id,
            finish_reason = ?response.finish_reason,
            output_chars = text.chars().count(),
            total_tokens = response.usage.total_tokens,
            "exchange complete"
        );

        Ok(Reply {
            text,
            model: response.model,
            finish_reason: response.finish_reason,
            usage: response.usage,
        })
    }

    /// One exchange. Returns the reply text, or `"Error: <description>"`
    /// if anything went wrong. Never fails.
    pub async fn complete(&self, instruction: &str, user_text: &str) -> String {
        match self.try_complete(instruction, user_text).await {
            Ok(reply) => reply.text,
            Err(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "model call failed");
                render_failure(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Model;
    use crate::provider::mock::MockProvider;
    use crate::provider::Role;
    use thinkchain_error::ErrorKind;

    fn params() -> SessionParams {
        SessionParams::new("key")
            .with_model(Model::Glm4Flash)
            .with_top_p(0.42)
            .with_temperature(0.9)
            .with_max_tokens(128)
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let gateway = Gateway::new(MockProvider::new().reply("plan"), params());

        let reply = gateway.complete("analyze", "question").await;
        assert_eq!(reply, "plan");
        assert!(!is_failure(&reply));
    }

    #[tokio::test]
    async fn test_complete_builds_two_message_exchange() {
        let gateway = Gateway::new(MockProvider::new().reply("ok"), params());
        gateway.complete("be a verifier", "check this").await;

        let requests = gateway.provider().requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "be a verifier");
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "check this");
        assert!(!request.stream);
    }

    #[tokio::test]
    async fn test_sampling_parameters_forwarded_unchanged() {
        let gateway = Gateway::new(MockProvider::new().reply("a").reply("b"), params());
        gateway.complete("one", "x").await;
        gateway.complete("two", "y").await;

        for request in gateway.provider().requests() {
            assert_eq!(request.model.as_deref(), Some("glm-4-flash"));
            assert_eq!(request.top_p, Some(0.42));
            assert_eq!(request.temperature, Some(0.9));
            assert_eq!(request.max_tokens, Some(128));
        }
    }

    #[tokio::test]
    async fn test_failure_renders_as_error_string() {
        let gateway = Gateway::new(
            MockProvider::new().fail(ErrorKind::NetworkFailed, "connection reset by peer"),
            params(),
        );

        let reply = gateway.complete("analyze", "question").await;
        assert_eq!(reply, "Error: connection reset by peer");
        assert!(is_failure(&reply));
    }

    #[tokio::test]
    async fn test_missing_content_is_a_failure() {
        let gateway = Gateway::new(MockProvider::new().no_content(), params());

        let err = gateway.try_complete("a", "b").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.operation(), "gateway::complete");

        let gateway = Gateway::new(MockProvider::new().no_content(), params());
        assert_eq!(gateway.complete("a", "b").await, "Error: no content in response");
    }

    #[tokio::test]
    async fn test_try_complete_reports_usage() {
        let gateway = Gateway::new(MockProvider::new().reply("four"), params());

        let reply = gateway.try_complete("a", "b").await.unwrap();
        assert_eq!(reply.text, "four");
        assert_eq!(reply.model, "glm-4-flash");
        assert_eq!(reply.usage.completion_tokens, 4);
    }

    #[test]
    fn test_connect_builds_http_gateway() {
        let gateway = Gateway::connect(ProviderConfig::new(), params()).unwrap();
        assert_eq!(gateway.provider().name(), "zhipu");
        assert_eq!(gateway.params().max_tokens, 128);
    }

    #[test]
    fn test_render_failure_uses_message() {
        let err = Error::api_failed(500, "boom").with_operation("zhipu::complete");
        assert_eq!(render_failure(&err), "Error: API error (500): boom");
        assert!(!is_failure("Errors are fine in prose"));
    }

    #[test]
    fn test_complete_in_blocking_context() {
        let gateway = Gateway::new(MockProvider::new().reply("sync"), params());
        let reply = tokio_test::block_on(gateway.complete("a", "b"));
        assert_eq!(reply, "sync");
    }
}
