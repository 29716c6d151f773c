//! Running, monotonic usage counters for one agent execution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running counters for one agent execution.
///
/// Every field is monotonically non-decreasing within an execution — the
/// loop and the tool dispatcher only ever add to these, never subtract.
/// `baseline_tokens` is the exception: it is re-anchored (not incremented)
/// by [`crate::EconomicsManager::update_baseline`] after an external
/// compaction event, so post-compaction growth can be reported separately
/// from pre-compaction totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentMetrics {
    /// Total input tokens across all model calls.
    pub input_tokens: u64,
    /// Total output tokens across all model calls.
    pub output_tokens: u64,
    /// Total tokens read from a provider-side prompt cache.
    pub cache_read_tokens: u64,
    /// Total tokens written to a provider-side prompt cache.
    pub cache_write_tokens: u64,
    /// Cumulative estimated cost, computed by the caller from a pricing
    /// table outside this crate and recorded as-is.
    pub estimated_cost: Decimal,
    /// Number of completed (non-retry) model calls.
    pub llm_calls: u32,
    /// Number of tool calls dispatched.
    pub tool_calls: u32,
    /// Wall-clock milliseconds elapsed since the manager was created.
    pub elapsed_ms: u64,
    /// Number of loop iterations completed.
    pub iteration: u32,
    /// Token count at the last baseline re-anchor, if any.
    pub baseline_tokens: Option<u64>,
}

impl AgentMetrics {
    /// Sum of every token category tracked.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }

    /// Tokens accumulated since the last baseline re-anchor (or since the
    /// start of the execution if no compaction has occurred yet).
    #[must_use]
    pub fn tokens_since_baseline(&self) -> u64 {
        self.total_tokens()
            .saturating_sub(self.baseline_tokens.unwrap_or(0))
    }
}
