//! Execution economics: usage accounting, budget enforcement, and loop
//! detection for neuron operators.
//!
//! An [`EconomicsManager`] is the single thing an iteration loop consults
//! before spending another provider call, and the single thing it reports
//! usage to after one completes. It owns three independent heuristics:
//!
//! - budget status ([`BudgetCheck`]) against an [`ExecutionBudget`]
//! - doom-loop detection ([`LoopDetector`]) over recent tool calls
//! - a prompt-cache boundary estimate ([`CacheBoundaryEstimate`])
//!
//! State is serializable ([`BudgetSnapshot`]) so a caller can persist and
//! restore accounting across a process restart.

#![deny(missing_docs)]

pub mod budget;
pub mod cache_boundary;
pub mod error;
pub mod loop_detector;
pub mod manager;
pub mod metrics;
pub mod snapshot;
pub mod status;

pub use budget::{EnforcementMode, ExecutionBudget};
pub use cache_boundary::CacheBoundaryEstimate;
pub use error::EconomicsError;
pub use loop_detector::{canonicalize, LoopDetector, LoopSignal};
pub use manager::EconomicsManager;
pub use metrics::AgentMetrics;
pub use snapshot::BudgetSnapshot;
pub use status::{BudgetCheck, BudgetDimension, BudgetStatus};
