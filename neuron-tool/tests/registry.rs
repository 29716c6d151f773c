use neuron_tool::*;
use neuron_types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ReadFileArgs {
    path: String,
}

#[derive(Debug, Serialize)]
struct ReadFileOutput {
    content: String,
}

#[derive(Debug, thiserror::Error)]
enum ReadFileError {
    #[error("file not found: {0}")]
    NotFound(String),
}

struct ReadFileTool;

impl Tool for ReadFileTool {
    const NAME: &'static str = "read_file";
    type Args = ReadFileArgs;
    type Output = ReadFileOutput;
    type Error = ReadFileError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            title: None,
            description: "Read a file".into(),
            input_schema: serde_json::to_value(schemars::schema_for!(ReadFileArgs)).unwrap(),
            output_schema: None,
            annotations: None,
            cache_control: None,
        }
    }

    fn call(
        &self,
        args: Self::Args,
        _ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send {
        async move {
            Ok(ReadFileOutput {
                content: format!("contents of {}", args.path),
            })
        }
    }
}

fn test_ctx() -> ToolContext {
    ToolContext {
        cwd: PathBuf::from("/tmp"),
        session_id: "test".into(),
        environment: HashMap::new(),
        cancellation_token: tokio_util::sync::CancellationToken::new(),
        progress_reporter: None,
        approval_callback: None,
    }
}

#[tokio::test]
async fn register_and_execute_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);

    let ctx = test_ctx();
    let result = registry
        .execute("read_file", serde_json::json!({"path": "/tmp/f"}), &ctx)
        .await
        .unwrap();
    assert!(!result.is_error);
}

#[test]
fn definitions_lists_all_tools() {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);
    let defs = registry.definitions();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "read_file");
}

#[tokio::test]
async fn execute_unknown_tool_returns_not_found() {
    let registry = ToolRegistry::new();
    let ctx = test_ctx();
    let err = registry
        .execute("nonexistent", serde_json::json!({}), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn get_returns_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);
    assert!(registry.get("read_file").is_some());
    assert!(registry.get("nonexistent").is_none());
}

// --- execute_batch tests ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SleepArgs {}

#[derive(Debug, Serialize)]
struct SleepOutput {
    done: bool,
}

#[derive(Debug, thiserror::Error)]
enum SleepError {
    #[error("cancelled")]
    Cancelled,
}

/// A tool that honors cancellation: it races its sleep against the
/// context's cancellation token and exits promptly once cancelled.
struct CooperativeSleepTool {
    sleep: Duration,
}

impl Tool for CooperativeSleepTool {
    const NAME: &'static str = "cooperative_sleep";
    type Args = SleepArgs;
    type Output = SleepOutput;
    type Error = SleepError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            title: None,
            description: "Sleeps, honoring cancellation".into(),
            input_schema: serde_json::to_value(schemars::schema_for!(SleepArgs)).unwrap(),
            output_schema: None,
            annotations: None,
            cache_control: None,
        }
    }

    fn call(
        &self,
        _args: Self::Args,
        ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send {
        let sleep = self.sleep;
        let token = ctx.cancellation_token.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep(sleep) => Ok(SleepOutput { done: true }),
                () = token.cancelled() => Err(SleepError::Cancelled),
            }
        }
    }
}

/// A tool that ignores cancellation entirely, to exercise the force-kill path.
struct UncooperativeSleepTool {
    sleep: Duration,
}

impl Tool for UncooperativeSleepTool {
    const NAME: &'static str = "uncooperative_sleep";
    type Args = SleepArgs;
    type Output = SleepOutput;
    type Error = SleepError;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            title: None,
            description: "Sleeps, ignoring cancellation".into(),
            input_schema: serde_json::to_value(schemars::schema_for!(SleepArgs)).unwrap(),
            output_schema: None,
            annotations: None,
            cache_control: None,
        }
    }

    fn call(
        &self,
        _args: Self::Args,
        _ctx: &ToolContext,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send {
        let sleep = self.sleep;
        async move {
            tokio::time::sleep(sleep).await;
            Ok(SleepOutput { done: true })
        }
    }
}

#[tokio::test]
async fn execute_batch_preserves_input_order() {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);
    let ctx = test_ctx();

    let calls = vec![
        ToolCall { id: "a".into(), name: "read_file".into(), input: serde_json::json!({"path": "1"}) },
        ToolCall { id: "b".into(), name: "read_file".into(), input: serde_json::json!({"path": "2"}) },
        ToolCall { id: "c".into(), name: "read_file".into(), input: serde_json::json!({"path": "3"}) },
    ];
    let results = registry.execute_batch(calls, &ctx, Duration::from_secs(5)).await;
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    for (_, result) in &results {
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn execute_batch_times_out_a_slow_tool_without_blocking_siblings() {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool);
    registry.register(UncooperativeSleepTool { sleep: Duration::from_secs(10) });
    let ctx = test_ctx();

    let calls = vec![
        ToolCall { id: "slow".into(), name: "uncooperative_sleep".into(), input: serde_json::json!({}) },
        ToolCall { id: "fast".into(), name: "read_file".into(), input: serde_json::json!({"path": "1"}) },
    ];
    let started = std::time::Instant::now();
    let results = registry.execute_batch(calls, &ctx, Duration::from_millis(50)).await;
    // Hard timeout (50ms) + grace period (3s) bounds the wait even though the
    // slow tool never reacts to cancellation; well under its own 10s sleep.
    assert!(started.elapsed() < Duration::from_secs(8));

    let slow = results.iter().find(|(id, _)| id == "slow").unwrap();
    match &slow.1 {
        Err(ToolError::ExecutionFailed(e)) => assert!(e.to_string().contains("timed out")),
        other => panic!("expected timeout error, got: {other:?}"),
    }

    let fast = results.iter().find(|(id, _)| id == "fast").unwrap();
    assert!(fast.1.is_ok());
}

#[tokio::test]
async fn execute_batch_cancels_a_cooperative_tool_well_before_the_grace_period_elapses() {
    let mut registry = ToolRegistry::new();
    registry.register(CooperativeSleepTool { sleep: Duration::from_secs(10) });
    let ctx = test_ctx();

    let calls = vec![ToolCall {
        id: "cooperative".into(),
        name: "cooperative_sleep".into(),
        input: serde_json::json!({}),
    }];
    let started = std::time::Instant::now();
    let results = registry.execute_batch(calls, &ctx, Duration::from_millis(50)).await;
    // A tool that reacts to cancellation should return well inside the
    // grace period, not burn the full 3s.
    assert!(started.elapsed() < Duration::from_secs(2));

    match &results[0].1 {
        Err(ToolError::ExecutionFailed(e)) => assert!(e.to_string().contains("timed out")),
        other => panic!("expected timeout error, got: {other:?}"),
    }
}
