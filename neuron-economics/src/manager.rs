//! The sole authority on budget questions for one agent execution.

use crate::budget::{EnforcementMode, ExecutionBudget};
use crate::cache_boundary::CacheBoundaryEstimate;
use crate::error::EconomicsError;
use crate::loop_detector::{LoopDetector, LoopSignal};
use crate::metrics::AgentMetrics;
use crate::snapshot::BudgetSnapshot;
use crate::status::{BudgetCheck, BudgetDimension, BudgetStatus};
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::time::Instant;

/// Warning threshold as a fraction of `max_tokens`, used when
/// `soft_token_limit` is not set.
const SOFT_FRACTION: f64 = 0.80;
/// Critical threshold as a fraction of `max_tokens`.
const CRITICAL_FRACTION: f64 = 0.90;
/// Force-text-only threshold (strict mode) as a fraction of `max_tokens`.
const FORCE_TEXT_ONLY_FRACTION: f64 = 0.95;
/// Default share of remaining token budget a swarm worker may draw on,
/// ported from the reference swarm budget split.
const DEFAULT_WORKER_FRACTION: f64 = 0.7;

/// Accumulates usage, evaluates budget status, and runs loop detection for
/// one agent execution.
///
/// Consulted before each loop iteration ([`EconomicsManager::check_budget`])
/// and updated after each model call ([`EconomicsManager::record_llm_usage`]).
/// Internally synchronized so it can be shared (`Arc<EconomicsManager>`)
/// between the loop and the AoT scheduler without the caller needing its
/// own lock.
pub struct EconomicsManager {
    budget: ExecutionBudget,
    metrics: Mutex<AgentMetrics>,
    loop_detector: Mutex<LoopDetector>,
    cache_boundary: Mutex<CacheBoundaryEstimate>,
    start: Instant,
    worker_fraction: f64,
}

impl EconomicsManager {
    /// Create a manager for a fresh execution under `budget`.
    ///
    /// # Errors
    /// Returns [`EconomicsError::InvalidBudget`] if `budget` violates its
    /// own invariants (see [`ExecutionBudget::validate`]).
    pub fn new(budget: ExecutionBudget) -> Result<Self, EconomicsError> {
        budget.validate()?;
        Ok(Self {
            budget,
            metrics: Mutex::new(AgentMetrics::default()),
            loop_detector: Mutex::new(LoopDetector::new()),
            cache_boundary: Mutex::new(CacheBoundaryEstimate::new()),
            start: Instant::now(),
            worker_fraction: DEFAULT_WORKER_FRACTION,
        })
    }

    /// Override the fraction of remaining token budget workers may draw on
    /// collectively (default 0.7, matching the reference swarm split).
    #[must_use]
    pub fn with_worker_fraction(mut self, fraction: f64) -> Self {
        self.worker_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Restore a manager from a previously serialized [`BudgetSnapshot`]
    /// under (possibly new) `budget`. Loop detection and cache-boundary
    /// state are NOT restored — they are short-lived heuristics scoped to
    /// the process that observed the calls, not durable accounting.
    ///
    /// # Errors
    /// Returns [`EconomicsError::InvalidBudget`] if `budget` is invalid.
    pub fn restore(budget: ExecutionBudget, snapshot: BudgetSnapshot) -> Result<Self, EconomicsError> {
        budget.validate()?;
        Ok(Self {
            budget,
            metrics: Mutex::new(snapshot.into()),
            loop_detector: Mutex::new(LoopDetector::new()),
            cache_boundary: Mutex::new(CacheBoundaryEstimate::new()),
            start: Instant::now(),
            worker_fraction: DEFAULT_WORKER_FRACTION,
        })
    }

    /// Record usage from a completed (non-retry) model call.
    ///
    /// Advances the iteration counter by one — the iteration loop calls
    /// this exactly once per successful provider response, never for a
    /// retried attempt that ultimately failed.
    #[tracing::instrument(skip(self), fields(input, output, cache_read, cache_write))]
    pub fn record_llm_usage(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        cache_read_tokens: u64,
        cache_write_tokens: u64,
        cost: Decimal,
    ) {
        let mut m = self.metrics.lock().unwrap();
        m.input_tokens += input_tokens;
        m.output_tokens += output_tokens;
        m.cache_read_tokens += cache_read_tokens;
        m.cache_write_tokens += cache_write_tokens;
        m.estimated_cost += cost;
        m.llm_calls += 1;
        m.iteration += 1;
        m.elapsed_ms = self.start.elapsed().as_millis() as u64;
        drop(m);
        self.cache_boundary.lock().unwrap().record(cache_read_tokens);
    }

    /// Record that a tool call was dispatched during `iteration`.
    #[tracing::instrument(skip(self, args))]
    pub fn record_tool_call(&self, name: &str, args: &serde_json::Value, iteration: u32) {
        let _ = (name, args, iteration);
        self.metrics.lock().unwrap().tool_calls += 1;
    }

    /// Feed a tool call into the loop detector, returning any signal it
    /// produced. Does not itself stop execution.
    pub fn note_tool_call(&self, name: &str, args: &serde_json::Value) -> Option<LoopSignal> {
        self.loop_detector.lock().unwrap().record(name, args)
    }

    /// Current windowed cache-boundary estimate.
    #[must_use]
    pub fn cache_boundary_estimate(&self) -> f64 {
        self.cache_boundary.lock().unwrap().estimate()
    }

    /// Evaluate budget status against current metrics.
    ///
    /// Checked in order iterations, duration, then tokens — whichever is
    /// exhausted first is reported. This order matches the loop's own
    /// guard sequence (§4.4 step 1).
    #[tracing::instrument(skip(self))]
    pub fn check_budget(&self) -> BudgetCheck {
        let m = self.metrics.lock().unwrap();
        let advisory = self.budget.enforcement_mode == EnforcementMode::Advisory;

        if m.iteration >= self.budget.max_iterations {
            return BudgetCheck {
                can_continue: advisory,
                status: BudgetStatus::Exhausted,
                budget_type: BudgetDimension::Iterations,
                force_text_only: false,
                injected_prompt: Some(format!(
                    "Iteration budget exhausted: {}/{} iterations used.",
                    m.iteration, self.budget.max_iterations
                )),
            };
        }

        let max_duration_ms = self.budget.max_duration.as_millis();
        if max_duration_ms > 0 && self.start.elapsed().as_millis() as u64 >= max_duration_ms {
            return BudgetCheck {
                can_continue: advisory,
                status: BudgetStatus::Exhausted,
                budget_type: BudgetDimension::Duration,
                force_text_only: false,
                injected_prompt: Some(format!(
                    "Duration budget exhausted: {}ms elapsed.",
                    self.start.elapsed().as_millis()
                )),
            };
        }

        if self.budget.max_tokens > 0 {
            let total = m.total_tokens();
            let max = self.budget.max_tokens as f64;
            let fraction = total as f64 / max;
            let soft = self
                .budget
                .soft_token_limit
                .unwrap_or_else(|| (max * SOFT_FRACTION) as u64);

            if fraction >= 1.0 {
                return BudgetCheck {
                    can_continue: advisory,
                    status: BudgetStatus::Exhausted,
                    budget_type: BudgetDimension::Tokens,
                    force_text_only: false,
                    injected_prompt: Some(format!(
                        "Token budget exhausted: {total}/{} tokens used.",
                        self.budget.max_tokens
                    )),
                };
            }

            if fraction >= CRITICAL_FRACTION {
                let force_text_only = self.budget.enforcement_mode == EnforcementMode::Strict
                    && fraction >= FORCE_TEXT_ONLY_FRACTION;
                return BudgetCheck {
                    can_continue: true,
                    status: BudgetStatus::Critical,
                    budget_type: BudgetDimension::Tokens,
                    force_text_only,
                    injected_prompt: Some(format!(
                        "Critical: {total}/{} tokens used ({:.0}%). Wrap up soon.",
                        self.budget.max_tokens,
                        fraction * 100.0
                    )),
                };
            }

            if total >= soft {
                return BudgetCheck {
                    can_continue: true,
                    status: BudgetStatus::Warning,
                    budget_type: BudgetDimension::Tokens,
                    force_text_only: false,
                    injected_prompt: Some(format!(
                        "Warning: {total}/{} tokens used ({:.0}%).",
                        self.budget.max_tokens,
                        fraction * 100.0
                    )),
                };
            }
        }

        BudgetCheck {
            can_continue: true,
            status: BudgetStatus::Ok,
            budget_type: BudgetDimension::None,
            force_text_only: false,
            injected_prompt: None,
        }
    }

    /// Re-anchor incremental token measurement after an external compaction
    /// event, so post-compaction growth is reported separately from
    /// pre-compaction totals ([`AgentMetrics::tokens_since_baseline`]).
    pub fn update_baseline(&self, new_token_count: u64) {
        self.metrics.lock().unwrap().baseline_tokens = Some(new_token_count);
    }

    /// Whether the AoT scheduler may spawn another worker projected to use
    /// `projected_tokens`, under the configured worker budget fraction of
    /// whatever token budget remains.
    ///
    /// Unlimited budgets (`max_tokens == 0`) always permit spawning.
    #[must_use]
    pub fn can_spawn_worker(&self, projected_tokens: u64) -> bool {
        if self.budget.max_tokens == 0 {
            return true;
        }
        let total = self.metrics.lock().unwrap().total_tokens();
        let remaining = self.budget.max_tokens.saturating_sub(total);
        let worker_share = (remaining as f64 * self.worker_fraction) as u64;
        projected_tokens <= worker_share
    }

    /// A serializable snapshot of current metrics.
    #[must_use]
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot::from(&*self.metrics.lock().unwrap())
    }

    /// A clone of current metrics.
    #[must_use]
    pub fn metrics(&self) -> AgentMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// The budget this manager enforces.
    #[must_use]
    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }
}
