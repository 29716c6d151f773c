//! Failure classification for tool call outcomes.
//!
//! Maps a [`ToolError`] to an actionable [`FailureClass`] by inspecting its
//! variant and, for opaque execution failures, pattern-matching the error
//! text against known provider/transport failure signatures. The AoT
//! scheduler uses this to decide whether a failed task can be retried or
//! should cascade a terminal failure to its dependents.

use neuron_types::ToolError;

/// Classification of a tool call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureClass {
    /// Blocked by a permission policy's deny decision.
    PolicyBlocked,
    /// The model supplied arguments that failed schema validation.
    InvalidArgs,
    /// A referenced file or path does not exist.
    MissingPath,
    /// The call requires human approval before it can proceed.
    PermissionRequired,
    /// The provider rejected the request for exceeding a spend limit.
    ProviderSpendLimit,
    /// The provider rejected the request as unauthenticated/unauthorized.
    ProviderAuth,
    /// The provider is rate limiting requests.
    RateLimited,
    /// A transient provider or network error (5xx, connection reset).
    Transient5xx,
    /// The call exceeded its deadline.
    Timeout,
    /// No known signature matched; treated as retryable by default.
    Unknown,
}

impl FailureClass {
    /// Whether a failure of this class is worth retrying.
    ///
    /// Mirrors the non-retryable set used for swarm worker failures: policy,
    /// argument, path, and permission failures won't succeed on a bare
    /// retry, nor will spend-limit or auth failures, since they need
    /// operator intervention rather than another attempt.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            Self::PolicyBlocked
                | Self::InvalidArgs
                | Self::MissingPath
                | Self::PermissionRequired
                | Self::ProviderSpendLimit
                | Self::ProviderAuth
        )
    }
}

/// Classify a [`ToolError`] into a [`FailureClass`].
///
/// Structured variants ([`ToolError::PermissionDenied`],
/// [`ToolError::InvalidInput`], [`ToolError::Cancelled`]) map directly.
/// [`ToolError::ExecutionFailed`] wraps an opaque source error, whose
/// `Display` text is pattern-matched the same way a raw provider error
/// string would be.
#[must_use]
pub fn classify(err: &ToolError) -> FailureClass {
    match err {
        ToolError::NotFound(_) => FailureClass::MissingPath,
        ToolError::InvalidInput(_) => FailureClass::InvalidArgs,
        ToolError::PermissionDenied(_) => FailureClass::PermissionRequired,
        ToolError::Cancelled => FailureClass::Timeout,
        ToolError::ModelRetry(_) => FailureClass::InvalidArgs,
        ToolError::ExecutionFailed(source) => classify_text(&source.to_string()),
    }
}

/// Pattern-match raw error/output text against known failure signatures.
///
/// Checks are ordered most-specific-first so that e.g. a rate-limit message
/// mentioning "error" doesn't fall through to the transient-5xx bucket.
#[must_use]
pub fn classify_text(text: &str) -> FailureClass {
    let lower = text.to_lowercase();
    let has_any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if has_any(&["429", "rate limit", "rate_limited", "too many requests"]) {
        FailureClass::RateLimited
    } else if has_any(&[
        "402",
        "spend limit",
        "billing",
        "payment required",
        "insufficient_quota",
    ]) {
        FailureClass::ProviderSpendLimit
    } else if has_any(&[
        "401",
        "403",
        "unauthorized",
        "forbidden",
        "invalid api key",
        "authentication",
    ]) {
        FailureClass::ProviderAuth
    } else if has_any(&["timeout", "timed out", "deadline exceeded", "sigterm"]) {
        FailureClass::Timeout
    } else if has_any(&["policy", "blocked by policy", "not allowed", "policy_blocked"]) {
        FailureClass::PolicyBlocked
    } else if has_any(&[
        "invalid arguments",
        "invalid_tool_args",
        "malformed json",
        "schema validation",
    ]) {
        FailureClass::InvalidArgs
    } else if has_any(&["file not found", "no such file", "enoent", "path does not exist"]) {
        FailureClass::MissingPath
    } else if has_any(&["permission denied", "eacces", "requires approval", "permission_required"]) {
        FailureClass::PermissionRequired
    } else if has_any(&[
        "500",
        "502",
        "503",
        "504",
        "server error",
        "network error",
        "connection",
    ]) {
        FailureClass::Transient5xx
    } else {
        FailureClass::Unknown
    }
}
