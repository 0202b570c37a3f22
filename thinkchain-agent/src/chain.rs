//! The analyze → reason → verify chain

use crate::agent::{Agent, ANALYZER, REASONER, VERIFIER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thinkchain_gateway::{
    render_failure, Error, FinishReason, Gateway, LlmProvider, ProviderConfig, Result,
    SessionParams, UsageTracker,
};
use tracing::{info, warn};

/// What the chain does after a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop calling the model; later steps report `"Skipped: ..."`.
    #[default]
    Halt,
    /// Feed the `"Error: ..."` string to the next step as if it were output.
    PassThrough,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Halt => "halt",
            FailurePolicy::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "halt" => Ok(FailurePolicy::Halt),
            "pass-through" | "passthrough" => Ok(FailurePolicy::PassThrough),
            other => Err(Error::invalid_argument(
                "failure_policy",
                format!("unknown failure policy '{}', expected 'halt' or 'pass-through'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
    Skipped,
}

/// Summary of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub role: &'static str,
    pub status: StepStatus,
    pub input_chars: usize,
    pub output_chars: usize,
    /// The reply stopped at `max_tokens`
    pub truncated: bool,
}

/// The three outputs of a run, always present whatever happened.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutput {
    pub analysis: String,
    pub reasoning: String,
    pub verification: String,
    pub steps: Vec<StepRecord>,
    pub usage: UsageTracker,
}

impl ChainOutput {
    pub fn outputs(&self) -> (&str, &str, &str) {
        (&self.analysis, &self.reasoning, &self.verification)
    }

    /// True if every step produced model output
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Ok)
    }
}

/// Three agents over one gateway, run in a fixed order.
pub struct Chain<'g, P> {
    agents: [Agent<'g, P>; 3],
    policy: FailurePolicy,
}

impl<'g, P: LlmProvider> Chain<'g, P> {
    pub fn new(gateway: &'g Gateway<P>) -> Self {
        Self {
            agents: [
                Agent::new(ANALYZER, gateway),
                Agent::new(REASONER, gateway),
                Agent::new(VERIFIER, gateway),
            ],
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// analysis = analyzer(question); reasoning = reasoner(analysis);
    /// verification = verifier(reasoning).
    pub async fn run(&self, question: &str) -> ChainOutput {
        let mut input = question.to_string();
        let mut outputs = Vec::with_capacity(self.agents.len());
        let mut steps = Vec::with_capacity(self.agents.len());
        let mut usage = UsageTracker::new();
        let mut halted_by: Option<&'static str> = None;

        for agent in &self.agents {
            if let Some(failed) = halted_by {
                info!(role = agent.name(), "step skipped");
                steps.push(StepRecord {
                    role: agent.name(),
                    status: StepStatus::Skipped,
                    input_chars: 0,
                    output_chars: 0,
                    truncated: false,
                });
                outputs.push(format!("Skipped: {} failed", failed));
                continue;
            }

            let input_chars = input.chars().count();
            let (output, status, truncated) = match agent.try_think(&input).await {
                Ok(reply) => {
                    usage.track(&reply.model, &reply.usage);
                    let truncated = reply.finish_reason == FinishReason::Length;
                    if truncated {
                        warn!(role = agent.name(), "reply cut off by max_tokens");
                    }
                    (reply.text, StepStatus::Ok, truncated)
                }
                Err(err) => {
                    warn!(role = agent.name(), error = %err, "step failed");
                    if self.policy == FailurePolicy::Halt {
                        halted_by = Some(agent.name());
                    }
                    (render_failure(&err), StepStatus::Failed, false)
                }
            };

            let output_chars = output.chars().count();
            info!(role = agent.name(), status = ?status, output_chars, "step finished");
            steps.push(StepRecord {
                role: agent.name(),
                status,
                input_chars,
                output_chars,
                truncated,
            });

            input.clone_from(&output);
            outputs.push(output);
        }

        let mut outputs = outputs.into_iter();
        ChainOutput {
            analysis: outputs.next().unwrap_or_default(),
            reasoning: outputs.next().unwrap_or_default(),
            verification: outputs.next().unwrap_or_default(),
            steps,
            usage,
        }
    }
}

/// Run the chain against the default endpoint with the default policy.
pub async fn run(params: SessionParams, question: &str) -> Result<ChainOutput> {
    run_with(ProviderConfig::default(), params, question, FailurePolicy::default()).await
}

/// Validate `params`, build a fresh gateway and run the chain once.
///
/// Only setup problems are returned as `Err`; failures of individual steps
/// show up in the output strings.
pub async fn run_with(
    config: ProviderConfig,
    params: SessionParams,
    question: &str,
    policy: FailurePolicy,
) -> Result<ChainOutput> {
    params.validate()?;
    let gateway = Gateway::connect(config, params)?;

    info!(model = %gateway.params().model, %policy, "running chain");
    Ok(Chain::new(&gateway).with_policy(policy).run(question).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinkchain_gateway::{is_failure, ErrorKind, MockProvider, Model, Role};

    fn gateway(provider: MockProvider) -> Gateway<MockProvider> {
        Gateway::new(
            provider,
            SessionParams::new("k")
                .with_model(Model::Glm4Air)
                .with_top_p(0.3)
                .with_temperature(0.6)
                .with_max_tokens(900),
        )
    }

    #[tokio::test]
    async fn test_outputs_feed_forward() {
        let gateway = gateway(MockProvider::new().reply("A").reply("B").reply("C"));

        let output = Chain::new(&gateway).run("q").await;

        assert_eq!(output.outputs(), ("A", "B", "C"));
        assert!(output.succeeded());
        assert_eq!(gateway.provider().user_inputs(), vec!["q", "A", "B"]);
    }

    #[tokio::test]
    async fn test_each_step_uses_its_role_and_session_parameters() {
        let gateway = gateway(MockProvider::new().reply("A").reply("B").reply("C"));
        Chain::new(&gateway).run("q").await;

        let requests = gateway.provider().requests();
        let instructions: Vec<_> = requests
            .iter()
            .map(|r| r.content_of(Role::System).unwrap_or_default())
            .collect();
        assert_eq!(
            instructions,
            vec![ANALYZER.instruction, REASONER.instruction, VERIFIER.instruction]
        );

        for request in &requests {
            assert_eq!(request.model.as_deref(), Some("glm-4-air"));
            assert_eq!(request.top_p, Some(0.3));
            assert_eq!(request.temperature, Some(0.6));
            assert_eq!(request.max_tokens, Some(900));
        }
    }

    #[tokio::test]
    async fn test_pass_through_feeds_error_string_forward() {
        let gateway = gateway(
            MockProvider::new()
                .fail(ErrorKind::NetworkFailed, "boom")
                .reply("B")
                .reply("C"),
        );

        let output = Chain::new(&gateway)
            .with_policy(FailurePolicy::PassThrough)
            .run("q")
            .await;

        assert_eq!(output.outputs(), ("Error: boom", "B", "C"));
        assert_eq!(gateway.provider().user_inputs(), vec!["q", "Error: boom", "B"]);
        assert_eq!(output.steps[0].status, StepStatus::Failed);
        assert_eq!(output.steps[1].status, StepStatus::Ok);
        assert!(!output.succeeded());
    }

    #[tokio::test]
    async fn test_pass_through_every_step_failing() {
        let gateway = gateway(
            MockProvider::new()
                .fail(ErrorKind::AuthenticationFailed, "bad key")
                .fail(ErrorKind::AuthenticationFailed, "bad key")
                .fail(ErrorKind::AuthenticationFailed, "bad key"),
        );

        let output = Chain::new(&gateway)
            .with_policy(FailurePolicy::PassThrough)
            .run("q")
            .await;

        let (a, r, v) = output.outputs();
        assert!(is_failure(a) && is_failure(r) && is_failure(v));
        assert_eq!(gateway.provider().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_halt_stops_after_failed_step() {
        let gateway = gateway(
            MockProvider::new()
                .reply("A")
                .fail(ErrorKind::RateLimited, "quota exceeded"),
        );

        let output = Chain::new(&gateway).run("q").await;

        assert_eq!(output.analysis, "A");
        assert_eq!(output.reasoning, "Error: quota exceeded");
        assert_eq!(output.verification, "Skipped: Step-by-Step Reasoner failed");
        assert_eq!(gateway.provider().requests().len(), 2);
        assert_eq!(
            output.steps.iter().map(|s| s.status).collect::<Vec<_>>(),
            vec![StepStatus::Ok, StepStatus::Failed, StepStatus::Skipped]
        );
    }

    #[tokio::test]
    async fn test_usage_tracked_for_successful_steps() {
        let gateway = gateway(MockProvider::new().reply("AA").reply("BB").reply("CC"));

        let output = Chain::new(&gateway).run("q").await;

        assert_eq!(output.usage.total_calls, 3);
        assert_eq!(output.usage.total_completion_tokens, 6);
        assert_eq!(output.steps[1].input_chars, 2);
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("halt".parse::<FailurePolicy>().unwrap(), FailurePolicy::Halt);
        assert_eq!(
            "pass_through".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::PassThrough
        );
        assert_eq!(FailurePolicy::PassThrough.to_string(), "pass-through");
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[tokio::test]
    async fn test_truncated_reply_is_flagged_and_still_fed_forward() {
        let gateway = gateway(MockProvider::new().reply("A").truncated("B cut").reply("C"));

        let output = Chain::new(&gateway).run("q").await;

        assert_eq!(output.outputs(), ("A", "B cut", "C"));
        assert!(output.succeeded());
        let flags: Vec<bool> = output.steps.iter().map(|s| s.truncated).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(gateway.provider().user_inputs(), vec!["q", "A", "B cut"]);
    }

    #[test]
    fn test_output_serializes_for_api() {
        let output = ChainOutput {
            analysis: "a".into(),
            reasoning: "r".into(),
            verification: "v".into(),
            steps: vec![StepRecord {
                role: ANALYZER.name,
                status: StepStatus::Skipped,
                input_chars: 0,
                output_chars: 0,
                truncated: false,
            }],
            usage: UsageTracker::new(),
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["verification"], "v");
        assert_eq!(json["steps"][0]["status"], "skipped");
        assert_eq!(json["steps"][0]["role"], "Problem Analyzer");
    }

    #[tokio::test]
    async fn test_run_with_rejects_invalid_parameters() {
        let params = SessionParams::new("k").with_top_p(2.0);

        let err = run_with(ProviderConfig::default(), params, "q", FailurePolicy::Halt)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_run_with_unreachable_endpoint_still_returns_three_strings() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = ProviderConfig::new().with_base_url(format!("http://127.0.0.1:{}", port));

        let output = run_with(config, SessionParams::new("k"), "q", FailurePolicy::Halt)
            .await
            .unwrap();

        assert!(is_failure(&output.analysis));
        assert_eq!(output.reasoning, "Skipped: Problem Analyzer failed");
        assert_eq!(output.verification, "Skipped: Problem Analyzer failed");
    }
}
