//! The result of a budget consult: status, which dimension is bound, and
//! what (if anything) the loop should do about it.

use serde::{Deserialize, Serialize};

/// Coarse health of the budget, ported from the four-level taxonomy used
/// by the reference resource tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Well within limits.
    Ok,
    /// Approaching the soft limit.
    Warning,
    /// Approaching the hard limit.
    Critical,
    /// A hard limit has been reached or exceeded.
    Exhausted,
}

/// Which resource a [`BudgetCheck`] is reporting on, for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDimension {
    /// The token budget is the binding constraint.
    Tokens,
    /// The iteration budget is the binding constraint.
    Iterations,
    /// The wall-clock duration budget is the binding constraint.
    Duration,
    /// No dimension is currently binding.
    None,
}

/// The result of consulting the economics manager before a loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCheck {
    /// Whether the loop may proceed with another iteration.
    pub can_continue: bool,
    /// Overall budget health.
    pub status: BudgetStatus,
    /// Which limit is bound, for messaging.
    pub budget_type: BudgetDimension,
    /// Strict mode near the hard limit: the next provider call MUST be
    /// built without tool definitions so the model cannot initiate more
    /// work.
    pub force_text_only: bool,
    /// An optional system message to insert before the next model call,
    /// warning the model of remaining budget. Never persisted into
    /// history — it is transient, scoped to one call.
    pub injected_prompt: Option<String>,
}
