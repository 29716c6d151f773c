//! Serializable economics snapshot (for persistence by the caller).

use crate::metrics::AgentMetrics;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Serializable record of accumulated usage, per spec §6's budget snapshot.
///
/// The core never persists this itself — callers serialize it to whatever
/// store they use and re-feed it through [`crate::EconomicsManager::restore`]
/// to resume accounting across a process restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSnapshot {
    /// Total input tokens.
    pub input_tokens: u64,
    /// Total output tokens.
    pub output_tokens: u64,
    /// Total prompt-cache read tokens.
    pub cache_read: u64,
    /// Total prompt-cache write tokens.
    pub cache_write: u64,
    /// Cumulative estimated cost.
    pub estimated_cost: Decimal,
    /// Number of completed model calls.
    pub llm_calls: u32,
    /// Number of tool calls dispatched.
    pub tool_calls: u32,
    /// Wall-clock seconds elapsed.
    pub elapsed_seconds: f64,
    /// Number of loop iterations completed.
    pub iteration: u32,
    /// Baseline token count at the last compaction re-anchor, if any.
    pub baseline: Option<u64>,
}

impl From<&AgentMetrics> for BudgetSnapshot {
    fn from(m: &AgentMetrics) -> Self {
        Self {
            input_tokens: m.input_tokens,
            output_tokens: m.output_tokens,
            cache_read: m.cache_read_tokens,
            cache_write: m.cache_write_tokens,
            estimated_cost: m.estimated_cost,
            llm_calls: m.llm_calls,
            tool_calls: m.tool_calls,
            elapsed_seconds: m.elapsed_ms as f64 / 1000.0,
            iteration: m.iteration,
            baseline: m.baseline_tokens,
        }
    }
}

impl From<BudgetSnapshot> for AgentMetrics {
    fn from(s: BudgetSnapshot) -> Self {
        Self {
            input_tokens: s.input_tokens,
            output_tokens: s.output_tokens,
            cache_read_tokens: s.cache_read,
            cache_write_tokens: s.cache_write,
            estimated_cost: s.estimated_cost,
            llm_calls: s.llm_calls,
            tool_calls: s.tool_calls,
            elapsed_ms: (s.elapsed_seconds * 1000.0) as u64,
            iteration: s.iteration,
            baseline_tokens: s.baseline,
        }
    }
}
