//! Agents - a named, fixed instruction bound to a gateway

use thinkchain_gateway::{Gateway, LlmProvider, Reply, Result};

/// A role: a display name and the system instruction that defines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDef {
    pub name: &'static str,
    pub instruction: &'static str,
}

/// Breaks a problem into its key elements and a structured plan.
pub const ANALYZER: RoleDef = RoleDef {
    name: "Problem Analyzer",
    instruction: "你是理解复杂问题的专家。\
                  你的职责是确定问题的关键要素，并将其分解为一个结构化的、循序渐进的计划。\
                  专注于分析的清晰度和完整性。",
};

/// Answers each step of the plan.
pub const REASONER: RoleDef = RoleDef {
    name: "Step-by-Step Reasoner",
    instruction: "你是一个乐于解答各种问题的助手，你的任务是为针对上述步骤给出回答。",
};

/// Checks the reasoning for logical consistency and gaps.
pub const VERIFIER: RoleDef = RoleDef {
    name: "Logical Verifier",
    instruction: "你是一个乐于解答各种问题的助手，验证推理过程的逻辑一致性和结果的可靠性。\
                  检查每个结论的正确性，并找出任何潜在的错误或差距。",
};

/// The chain, in execution order.
pub const ROLES: [RoleDef; 3] = [ANALYZER, REASONER, VERIFIER];

/// A role bound to a gateway.
pub struct Agent<'g, P> {
    role: RoleDef,
    gateway: &'g Gateway<P>,
}

impl<'g, P: LlmProvider> Agent<'g, P> {
    pub fn new(role: RoleDef, gateway: &'g Gateway<P>) -> Self {
        Self { role, gateway }
    }

    pub fn name(&self) -> &'static str {
        self.role.name
    }

    pub fn instruction(&self) -> &'static str {
        self.role.instruction
    }

    /// Send `user_text` under this role's instruction; the reply comes back
    /// unchanged, or as an `"Error: ..."` string on failure.
    pub async fn think(&self, user_text: &str) -> String {
        self.gateway.complete(self.role.instruction, user_text).await
    }

    /// Like [`think`](Self::think), keeping the failure structured.
    pub async fn try_think(&self, user_text: &str) -> Result<Reply> {
        self.gateway.try_complete(self.role.instruction, user_text).await
    }
}
