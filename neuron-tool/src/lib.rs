#![deny(missing_docs)]
//! Tool interface and registry for neuron.
//!
//! Re-exports [`neuron_types::Tool`]/[`neuron_types::ToolDyn`] — the typed
//! and object-safe halves of the tool abstraction — and adds the pieces
//! that make a registry useful in practice: a composable middleware
//! pipeline ([`middleware`]), built-in middleware ([`builtin`]), and the
//! [`ToolRegistry`] that ties them together. Any tool source (local
//! function, MCP server, HTTP endpoint) implements [`ToolDyn`]; most code
//! implements the friendlier [`Tool`] instead and gets [`ToolDyn`] for free.

pub mod builtin;
pub mod failure;
pub mod middleware;
pub mod registry;

pub use failure::{classify, classify_text, FailureClass};
pub use middleware::{tool_middleware_fn, Next, ToolCall, ToolMiddleware};
pub use neuron_types::{
    ApprovalCallback, ContentItem, PermissionDecision, PermissionPolicy, Tool, ToolContext,
    ToolDefinition, ToolDyn, ToolError, ToolOutput,
};
pub use registry::ToolRegistry;

#[cfg(feature = "macros")]
pub use neuron_tool_macros::neuron_tool;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_dyn_is_object_safe() {
        _assert_send_sync::<std::sync::Arc<dyn ToolDyn>>();
    }

    #[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
    struct EchoArgs {
        msg: String,
    }

    #[derive(Debug, serde::Serialize)]
    struct EchoOutput {
        echoed: String,
    }

    struct EchoTool;

    impl Tool for EchoTool {
        const NAME: &'static str = "echo";
        type Args = EchoArgs;
        type Output = EchoOutput;
        type Error = ToolError;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: Self::NAME.into(),
                title: None,
                description: "Echoes input back".into(),
                input_schema: serde_json::to_value(schemars::schema_for!(EchoArgs)).unwrap(),
                output_schema: None,
                annotations: None,
                cache_control: None,
            }
        }

        async fn call(&self, args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
            Ok(EchoOutput { echoed: args.msg })
        }
    }

    struct FailTool;

    impl Tool for FailTool {
        const NAME: &'static str = "fail";
        type Args = serde_json::Value;
        type Output = serde_json::Value;
        type Error = ToolError;

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: Self::NAME.into(),
                title: None,
                description: "Always fails".into(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: None,
                annotations: None,
                cache_control: None,
            }
        }

        async fn call(&self, _args: Self::Args, _ctx: &ToolContext) -> Result<Self::Output, Self::Error> {
            Err(ToolError::ExecutionFailed(Box::new(std::io::Error::other("always fails"))))
        }
    }

    fn test_ctx() -> ToolContext {
        ToolContext {
            cwd: PathBuf::from("/tmp"),
            session_id: "test".into(),
            environment: Default::default(),
            cancellation_token: tokio_util::sync::CancellationToken::new(),
            progress_reporter: None,
            approval_callback: None,
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());

        reg.register(EchoTool);
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_iter() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool);
        reg.register(FailTool);

        let names: Vec<&str> = reg.iter().map(|t| t.name()).collect();
        assert!(names.contains(&"echo"));
        assert!(names.contains(&"fail"));
    }

    #[tokio::test]
    async fn registry_call_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool);

        let ctx = test_ctx();
        let result = reg
            .execute("echo", serde_json::json!({"msg": "hello"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn registry_call_failing_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(FailTool);

        let ctx = test_ctx();
        let result = reg.execute("fail", serde_json::json!({}), &ctx).await;
        assert!(result.is_err());
    }

    #[test]
    fn registry_overwrite() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool);
        assert_eq!(reg.len(), 1);

        reg.register(EchoTool);
        assert_eq!(reg.len(), 1);
    }
}
