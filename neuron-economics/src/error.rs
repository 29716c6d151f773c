//! Error types for budget construction.

use thiserror::Error;

/// Errors raised when constructing or restoring economics state.
///
/// These are construction-time only — once an [`crate::EconomicsManager`]
/// exists, budget questions are answered through [`crate::BudgetCheck`],
/// never by raising.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EconomicsError {
    /// The supplied [`crate::ExecutionBudget`] violates an invariant
    /// (e.g. `soft_token_limit > max_tokens`, or `max_iterations == 0`).
    #[error("invalid budget configuration: {0}")]
    InvalidBudget(String),
}
