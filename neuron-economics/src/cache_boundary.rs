//! Running estimate of the provider's prompt-cache boundary.
//!
//! A windowed, recency-weighted moving average over `cache_read_tokens`
//! deltas from recent model calls. Consumed by observers (dashboards,
//! cost estimators) — the loop itself does not act on this value.

use std::collections::VecDeque;

/// Number of recent samples the estimate is computed over.
const WINDOW: usize = 10;

/// Windowed weighted moving average of cache-read token counts.
#[derive(Debug, Default)]
pub struct CacheBoundaryEstimate {
    samples: VecDeque<u64>,
}

impl CacheBoundaryEstimate {
    /// Create an empty estimator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW),
        }
    }

    /// Record a model call's `cache_read_tokens` count.
    pub fn record(&mut self, cache_read_tokens: u64) {
        self.samples.push_back(cache_read_tokens);
        while self.samples.len() > WINDOW {
            self.samples.pop_front();
        }
    }

    /// The current estimate: a linearly recency-weighted average of the
    /// last [`WINDOW`] samples (the most recent sample counts for the most,
    /// the oldest for the least). Zero if no samples have been recorded.
    #[must_use]
    pub fn estimate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let n = self.samples.len();
        let total_weight = (n * (n + 1) / 2) as f64;
        let weighted: f64 = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1) as f64 * v as f64)
            .sum();
        weighted / total_weight
    }

    /// Number of samples currently in the window.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
