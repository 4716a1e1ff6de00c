//! The result of applying one rule action to one item.
//!
//! Replaces the original's exception-based control flow
//! (`ExitPipelineException`, bare exceptions propagating out of a rule
//! call) with an explicit sum type the executor matches on. Rust cannot
//! lean on exceptions for pipeline control flow, so every exit path —
//! including an early pipeline exit — is a return value.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// The rule action ran to completion.
    Success,
    /// The rule requested early termination of this item's remaining
    /// rules. `success = true` is a deliberate, non-error early exit
    /// (e.g. "nothing more to do for this file").
    PipelineExit { success: bool, message: Option<String> },
    /// The rule's deadline elapsed before it returned.
    Timeout,
    /// A condition evaluated to `false`; carries the condition's name
    /// (negation-stripped, matching the original's `AssertionError`
    /// message convention).
    ConditionFailure(String),
    /// Any other error raised while evaluating a condition or running a
    /// rule action.
    Error(String),
}

impl RuleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RuleOutcome::Success | RuleOutcome::PipelineExit { success: true, .. })
    }

    /// A short word identifying the outcome kind, used as the structured
    /// log field and the end-of-run summary bucket.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleOutcome::Success => "success",
            RuleOutcome::PipelineExit { success: true, .. } => "pipeline_exit_ok",
            RuleOutcome::PipelineExit { success: false, .. } => "pipeline_exit_error",
            RuleOutcome::Timeout => "timeout",
            RuleOutcome::ConditionFailure(_) => "condition_failure",
            RuleOutcome::Error(_) => "error",
        }
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Success => write!(f, "success"),
            RuleOutcome::PipelineExit { success, message } => {
                write!(f, "pipeline exit ({}): {}", if *success { "ok" } else { "error" }, message.as_deref().unwrap_or(""))
            }
            RuleOutcome::Timeout => write!(f, "timeout"),
            RuleOutcome::ConditionFailure(name) => write!(f, "condition failed: {name}"),
            RuleOutcome::Error(message) => write!(f, "error: {message}"),
        }
    }
}
