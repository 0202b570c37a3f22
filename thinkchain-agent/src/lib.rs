//! # thinkchain agent
//!
//! A chain of three agents sharing one gateway:
//! 1. The analyzer breaks the question into a step-by-step plan
//! 2. The reasoner answers the plan
//! 3. The verifier checks the reasoning for consistency and gaps
//!
//! Each agent's output is the next agent's input. Agents differ only in
//! their fixed instruction, so a role is plain data (`RoleDef`).

mod agent;
mod chain;

pub use agent::{Agent, RoleDef, ANALYZER, REASONER, ROLES, VERIFIER};
pub use chain::{run, run_with, Chain, ChainOutput, FailurePolicy, StepRecord, StepStatus};
