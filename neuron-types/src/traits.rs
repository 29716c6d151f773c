//! Object-safe tool abstraction.
//!
//! [`Tool`] is the ergonomic, generic trait implementors write against —
//! associated types for args/output/error, native `async fn` ergonomics.
//! It isn't object-safe. [`ToolDyn`] is the dyn-compatible boundary a
//! registry can store heterogeneously as `Arc<dyn ToolDyn>`; every `Tool`
//! gets it for free via the blanket impl below, which handles JSON
//! (de)serialization at the boundary.

use crate::types::{CompletionRequest, CompletionResponse, ContentItem, Message, ToolContext, ToolDefinition, ToolOutput};
use crate::error::{ContextError, ProviderError, ToolError};
use crate::stream::StreamHandle;
use crate::wasm::{WasmBoxedFuture, WasmCompatSend, WasmCompatSync};

/// A typed tool implementation.
///
/// Implementors describe their input/output shapes as associated types and
/// let [`ToolDyn`]'s blanket impl handle schema generation and JSON
/// marshalling. See the `#[neuron_tool]` attribute macro in `neuron-tool`
/// for a way to derive this from a plain async function.
pub trait Tool: Send + Sync {
    /// The tool's unique name.
    const NAME: &'static str;

    /// Deserialized argument type for this tool.
    type Args: serde::de::DeserializeOwned + Send;
    /// Serializable output type for this tool.
    type Output: serde::Serialize + Send;
    /// Error type returned on tool failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build the tool's definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with typed arguments.
    fn call(
        &self,
        args: Self::Args,
        ctx: &ToolContext,
    ) -> impl std::future::Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Object-safe boundary for tool dispatch.
///
/// Stored as `Arc<dyn ToolDyn>` in a registry. Any `T: Tool` implements this
/// automatically via the blanket impl below.
pub trait ToolDyn: WasmCompatSend + WasmCompatSync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Build the tool's definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool against raw JSON input, returning a [`ToolOutput`].
    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> WasmBoxedFuture<'a, Result<ToolOutput, ToolError>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> WasmBoxedFuture<'a, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let args: T::Args = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            match self.call(args, ctx).await {
                Ok(output) => {
                    let structured = serde_json::to_value(&output).ok();
                    let text = match &structured {
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    };
                    Ok(ToolOutput {
                        content: vec![ContentItem::Text(text)],
                        structured_content: structured,
                        is_error: false,
                    })
                }
                Err(e) => Err(ToolError::ExecutionFailed(Box::new(e))),
            }
        })
    }
}

/// The outcome of evaluating a tool call against a [`PermissionPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// The call is allowed to proceed. `Some(args)` replaces the call's
    /// arguments verbatim before execution; `None` runs the original args
    /// unmodified.
    Allow(Option<serde_json::Value>),
    /// The call is rejected outright, with a human-readable reason.
    Deny(String),
    /// The call requires external confirmation before proceeding.
    Ask(String),
}

/// Evaluates whether a tool call is permitted to run.
///
/// Implementations inspect the tool name and raw JSON input — e.g. an
/// allowlist policy, a path-scoped filesystem policy, or one that asks a
/// human for destructive operations.
pub trait PermissionPolicy: Send + Sync {
    /// Decide whether `tool_name` may run with the given `input`.
    fn check(&self, tool_name: &str, input: &serde_json::Value) -> PermissionDecision;
}

/// Consulted when a [`PermissionPolicy`] returns [`PermissionDecision::Ask`].
///
/// Implementations surface the tool name and reason to a human (or other
/// out-of-band approver, e.g. a CLI prompt or a UI confirmation dialog) and
/// await their decision. A denial is treated exactly like
/// [`PermissionDecision::Deny`]; there is no other channel back into the
/// tool loop.
#[async_trait::async_trait]
pub trait ApprovalCallback: Send + Sync {
    /// Ask whether `tool_name` may proceed, given a human-readable `reason`
    /// for why confirmation was required. Returns `true` to allow the call,
    /// `false` to deny it.
    async fn approve(&self, tool_name: &str, reason: &str) -> bool;
}

/// LLM provider interface shared by context-management strategies.
///
/// Mirrors `neuron_turn::Provider`'s RPITIT shape but speaks the wire
/// types in this crate (`Message`, `CompletionRequest`/`Response`) so
/// crates that don't depend on `neuron-turn` — such as `neuron-context`'s
/// summarization strategy — can stay generic over a provider without a
/// hard dependency on the ReAct loop's own provider trait.
pub trait Provider: Send + Sync {
    /// Send a completion request to the provider.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, ProviderError>> + Send;

    /// Send a completion request and stream the response incrementally.
    fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<StreamHandle, ProviderError>> + Send;
}

/// Strategy for keeping a conversation's context window within budget.
///
/// Implementations decide, given the running message history and a
/// token count, whether compaction is due (`should_compact`) and how to
/// perform it (`compact`). `compact` is async because strategies such as
/// summarization call back into a [`Provider`].
///
/// Uses `async_trait` (rather than RPITIT, as `Provider` does) because
/// callers need to hold heterogeneous strategies as `Box<dyn
/// ContextStrategy>` — e.g. `neuron-context`'s `CompositeStrategy`
/// chains several together.
#[async_trait::async_trait]
pub trait ContextStrategy: Send + Sync {
    /// Estimate the token cost of a message list.
    fn token_estimate(&self, messages: &[Message]) -> usize;

    /// Whether compaction is due given the current token count.
    ///
    /// `limit` is the caller's current measured token count (not a cap);
    /// implementations compare it against their own configured threshold.
    fn should_compact(&self, messages: &[Message], limit: usize) -> bool;

    /// Compact the message list, returning a shorter (or rewritten) one.
    async fn compact(&self, messages: Vec<Message>) -> Result<Vec<Message>, ContextError>;
}
