//! Budget configuration: resource caps and how strictly they're enforced.

use crate::error::EconomicsError;
use layer0::duration::DurationMs;
use serde::{Deserialize, Serialize};

/// How strictly a budget limit is enforced once the soft/hard thresholds
/// are crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Budget checks only ever warn — `can_continue` stays `true` even past
    /// the hard limit. Useful for dry-run estimation.
    Advisory,
    /// Soft limit produces warnings and nudge prompts; the hard limit stops
    /// the loop (`can_continue = false`).
    Soft,
    /// Same as `Soft`, plus strips tool definitions from the next provider
    /// call once usage crosses 95% of the hard limit (`force_text_only`).
    Strict,
}

impl Default for EnforcementMode {
    fn default() -> Self {
        Self::Soft
    }
}

/// Configuration bundle of resource caps for one agent execution.
///
/// Invariant: `soft_token_limit <= max_tokens` when both are set and
/// `max_tokens` is non-zero. `max_tokens == 0` means unlimited tokens (only
/// iteration/duration limits apply).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionBudget {
    /// Maximum total tokens (input + output + cache read + cache write) for
    /// the execution. `0` means unlimited.
    pub max_tokens: u64,
    /// Warning threshold below `max_tokens`. `None` derives it as 80% of
    /// `max_tokens`.
    pub soft_token_limit: Option<u64>,
    /// Maximum number of loop iterations (provider calls).
    pub max_iterations: u32,
    /// Maximum wall-clock duration for the execution. Zero means unlimited.
    pub max_duration: DurationMs,
    /// How strictly limits are enforced.
    pub enforcement_mode: EnforcementMode,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            max_tokens: 0,
            soft_token_limit: None,
            max_iterations: 50,
            max_duration: DurationMs::from_secs(600),
            enforcement_mode: EnforcementMode::Soft,
        }
    }
}

impl ExecutionBudget {
    /// Validate the budget's invariants.
    ///
    /// Called at every construction site that accepts caller-supplied
    /// configuration ([`crate::EconomicsManager::new`],
    /// [`crate::EconomicsManager::restore`]) — a bad budget is a
    /// configuration error raised once up front, not discovered mid-loop.
    pub fn validate(&self) -> Result<(), EconomicsError> {
        if self.max_tokens > 0 {
            if let Some(soft) = self.soft_token_limit {
                if soft > self.max_tokens {
                    return Err(EconomicsError::InvalidBudget(format!(
                        "soft_token_limit ({soft}) exceeds max_tokens ({})",
                        self.max_tokens
                    )));
                }
            }
        }
        if self.max_iterations == 0 {
            return Err(EconomicsError::InvalidBudget(
                "max_iterations must allow at least one iteration".into(),
            ));
        }
        Ok(())
    }
}
