//! Scheduler configuration.

use layer0::duration::DurationMs;

/// Configuration for a [`crate::pool::SubagentPool`].
#[derive(Debug, Clone)]
pub struct AoTConfig {
    /// Maximum number of tasks executing concurrently.
    pub max_concurrency: usize,
    /// Wall-clock budget for a single task before it is treated as timed
    /// out and reported as [`crate::pool::TaskOutcome::TimedOut`].
    pub task_timeout: DurationMs,
}

impl Default for AoTConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            task_timeout: DurationMs::from_secs(600),
        }
    }
}
