//! Tool registry with a composable middleware pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use neuron_types::{Tool, ToolContext, ToolDefinition, ToolDyn, ToolError, ToolOutput};

use crate::middleware::{Next, ToolCall, ToolMiddleware};

/// Grace period given to a timed-out tool task to react to cancellation
/// before it is forcibly aborted.
const TIMEOUT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Registry of tools available to a turn, with global and per-tool middleware.
///
/// Tools are stored as `Arc<dyn ToolDyn>` keyed by name. Calling
/// [`ToolRegistry::execute`] runs the call through the global middleware
/// chain followed by any middleware registered specifically for that tool,
/// then the tool itself.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    global_middleware: Vec<Arc<dyn ToolMiddleware>>,
    tool_middleware: HashMap<String, Vec<Arc<dyn ToolMiddleware>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            global_middleware: Vec::new(),
            tool_middleware: HashMap::new(),
        }
    }

    /// Register a typed tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_dyn(Arc::new(tool));
    }

    /// Register an already-boxed dyn tool (e.g. from an MCP server or HTTP
    /// endpoint adapter). Overwrites any existing tool with the same name.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Add middleware that runs for every tool call, in registration order.
    pub fn add_middleware(&mut self, middleware: impl ToolMiddleware + 'static) {
        self.global_middleware.push(Arc::new(middleware));
    }

    /// Add middleware that runs only for calls to `tool_name`, after the
    /// global middleware chain.
    pub fn add_tool_middleware(&mut self, tool_name: impl Into<String>, middleware: impl ToolMiddleware + 'static) {
        self.tool_middleware
            .entry(tool_name.into())
            .or_default()
            .push(Arc::new(middleware));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Definitions for all registered tools, in no particular order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Execute a tool call by name, running the middleware pipeline.
    ///
    /// Returns [`ToolError::NotFound`] if no tool with this name is
    /// registered — this check happens before any middleware runs.
    #[tracing::instrument(skip(self, input, ctx), fields(tool = %name))]
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let call = ToolCall {
            id: String::new(),
            name: name.to_string(),
            input,
        };

        let chain = self.chain_for(name);
        let next = Next::new(tool.as_ref(), &chain);
        next.run(&call, ctx).await
    }

    /// Execute many tool calls concurrently, preserving input order in the
    /// output (never completion order). Each call gets its own timeout; a
    /// timed-out or panicking call is reported as a [`ToolError`] for that
    /// call only and does not cancel its siblings.
    ///
    /// Each call runs in its own spawned task. On timeout, the task's
    /// cancellation token is cancelled (SIGTERM-equivalent) and the task is
    /// given a short grace period to react before being forcibly aborted
    /// (force-kill) — either way the dispatcher surfaces a timeout error
    /// for that call.
    #[tracing::instrument(skip(self, calls, ctx))]
    pub async fn execute_batch(
        &self,
        calls: Vec<ToolCall>,
        ctx: &ToolContext,
        timeout: std::time::Duration,
    ) -> Vec<(String, Result<ToolOutput, ToolError>)> {
        let futures = calls.into_iter().map(|call| {
            let tool = self.tools.get(&call.name).cloned();
            let chain = self.chain_for(&call.name);
            let mut call_ctx = ctx.clone();
            let child_token = ctx.cancellation_token.child_token();
            call_ctx.cancellation_token = child_token.clone();

            async move {
                let id = call.id.clone();
                let Some(tool) = tool else {
                    return (id, Err(ToolError::NotFound(call.name.clone())));
                };

                let name = call.name.clone();
                let mut handle = tokio::spawn(async move {
                    Next::new(tool.as_ref(), &chain).run(&call, &call_ctx).await
                });

                let result = match tokio::time::timeout(timeout, &mut handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_err)) => Err(ToolError::ExecutionFailed(Box::new(std::io::Error::other(
                        format!("tool '{name}' task panicked: {join_err}"),
                    )))),
                    Err(_elapsed) => {
                        child_token.cancel();
                        if tokio::time::timeout(TIMEOUT_GRACE_PERIOD, &mut handle).await.is_err() {
                            handle.abort();
                        }
                        Err(ToolError::ExecutionFailed(Box::new(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("tool '{name}' timed out after {:.1}s", timeout.as_secs_f64()),
                        ))))
                    }
                };
                (id, result)
            }
        });

        futures::future::join_all(futures).await
    }

    /// The effective middleware chain for a single tool: global middleware
    /// followed by that tool's own middleware.
    fn chain_for(&self, name: &str) -> Vec<Arc<dyn ToolMiddleware>> {
        let mut chain = self.global_middleware.clone();
        if let Some(specific) = self.tool_middleware.get(name) {
            chain.extend(specific.iter().cloned());
        }
        chain
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
