//! Error types for the AoT scheduler.

use thiserror::Error;

/// Errors raised while building or executing an [`crate::graph::AoTGraph`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AoTError {
    /// The dependency graph contains a cycle; no valid topological level
    /// assignment exists.
    #[error("dependency cycle detected in task graph")]
    CycleDetected,

    /// A task declared a dependency on a task id that was never added.
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency {
        /// The task whose dependency list references an unknown id.
        task: String,
        /// The unknown dependency id.
        dependency: String,
    },

    /// An operation referenced a task id that does not exist in the graph.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A file claim could not be acquired because another task already
    /// holds it.
    #[error("file already claimed: {path} (held by {holder})")]
    FileClaimed {
        /// The contended path.
        path: String,
        /// The task id currently holding the claim.
        holder: String,
    },
}
