//! Atom-of-Thought parallel task scheduler.
//!
//! Decomposes a unit of work into a DAG of atomic tasks
//! ([`AoTGraph`]), computes which tasks are independent enough to run
//! at once (`compute_levels`/`get_ready_batch`), and dispatches ready
//! batches through a bounded worker pool ([`SubagentPool`]) that
//! respects a shared file-claim ledger so two tasks never write the
//! same file concurrently.
//!
//! Typical flow: build the graph, `compute_levels()`, then loop
//! `get_ready_batch()` -> `SubagentPool::execute_batch()` -> feed
//! outcomes back through `mark_complete`/`mark_failed` until the graph
//! is exhausted.

#![deny(missing_docs)]

pub mod claim;
pub mod config;
pub mod error;
pub mod graph;
pub mod pool;

pub use claim::{ClaimGuard, FileClaim, FileClaimLedger};
pub use config::AoTConfig;
pub use error::AoTError;
pub use graph::{AoTGraph, AoTNode, AoTSummary, TaskStatus};
pub use pool::{ConflictChecker, SubagentPool, TaskOutcome, TaskSpec};
