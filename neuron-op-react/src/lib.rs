#![deny(missing_docs)]
//! ReAct operator — model + tools in a reasoning loop.
//!
//! Implements `layer0::Operator` by running the Reason-Act-Observe cycle:
//! assemble context → consult the budget → call the model (with retry) →
//! dispatch tools in parallel → append results → repeat until completion,
//! cancellation, or budget exhaustion.

use async_trait::async_trait;
use layer0::content::Content;
use layer0::duration::DurationMs;
use layer0::effect::{Effect, Scope, SignalPayload};
use layer0::error::OperatorError;
use layer0::hook::{HookAction, HookContext, HookPoint};
use layer0::id::{AgentId, WorkflowId};
use layer0::operator::{
    ExitReason, Operator, OperatorInput, OperatorMetadata, OperatorOutput, ToolCallRecord,
};
use neuron_economics::{BudgetDimension, EconomicsManager, EnforcementMode, ExecutionBudget};
use neuron_hooks::HookRegistry;
use neuron_tool::middleware::ToolCall as DispatchCall;
use neuron_tool::{ContentItem, ToolContext, ToolError, ToolOutput, ToolRegistry};
use neuron_turn::context::ContextStrategy;
use neuron_turn::convert::{content_to_user_message, parts_to_content};
use neuron_turn::provider::{Provider, ProviderError};
use neuron_turn::types::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Base delay for provider-call retry backoff.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
/// Cap on retry backoff delay, no matter how many attempts have elapsed.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
/// Maximum number of provider-call attempts (1 initial + up to 2 retries).
const MAX_ATTEMPTS: u32 = 3;

/// Static configuration for a ReactOperator instance.
pub struct ReactConfig {
    /// Base system prompt.
    pub system_prompt: String,
    /// Default model identifier.
    pub default_model: String,
    /// Default max tokens per response.
    pub default_max_tokens: u32,
    /// Default max turns before stopping.
    pub default_max_turns: u32,
    /// Default total token budget for the execution (0 = unlimited).
    pub default_token_budget: u64,
    /// How strictly the token budget is enforced.
    pub default_enforcement_mode: EnforcementMode,
    /// Wall-clock timeout applied to each tool call in a dispatched batch.
    pub tool_call_timeout: Duration,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            default_model: String::new(),
            default_max_tokens: 4096,
            default_max_turns: 10,
            default_token_budget: 0,
            default_enforcement_mode: EnforcementMode::Soft,
            tool_call_timeout: Duration::from_secs(120),
        }
    }
}

/// Names of tools that produce Effects instead of executing locally.
const EFFECT_TOOL_NAMES: &[&str] = &[
    "write_memory",
    "delete_memory",
    "delegate",
    "handoff",
    "signal",
];

/// Resolved configuration merging defaults with per-request overrides.
struct ResolvedConfig {
    model: Option<String>,
    system: String,
    max_turns: u32,
    max_cost: Option<Decimal>,
    max_duration: Option<DurationMs>,
    allowed_tools: Option<Vec<String>>,
    max_tokens: u32,
    token_budget: u64,
}

/// A full-featured Operator implementation with a ReAct loop.
///
/// Generic over `P: Provider` (not object-safe). The object-safe boundary
/// is `layer0::Operator`, which `ReactOperator<P>` implements via `#[async_trait]`.
pub struct ReactOperator<P: Provider> {
    provider: P,
    tools: ToolRegistry,
    context_strategy: Box<dyn ContextStrategy>,
    hooks: HookRegistry,
    state_reader: Arc<dyn layer0::StateReader>,
    config: ReactConfig,
    cancellation: CancellationToken,
}

impl<P: Provider> ReactOperator<P> {
    /// Create a new ReactOperator with all dependencies.
    pub fn new(
        provider: P,
        tools: ToolRegistry,
        context_strategy: Box<dyn ContextStrategy>,
        hooks: HookRegistry,
        state_reader: Arc<dyn layer0::StateReader>,
        config: ReactConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            context_strategy,
            hooks,
            state_reader,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach an external cancellation token. Cancelling it aborts the loop
    /// at the next guard point (before a provider call, or during retry
    /// backoff) with [`ExitReason::Custom`]`("cancelled")`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    fn resolve_config(&self, input: &OperatorInput) -> ResolvedConfig {
        let tc = input.config.as_ref();
        let system = match tc.and_then(|c| c.system_addendum.as_ref()) {
            Some(addendum) => format!("{}\n{}", self.config.system_prompt, addendum),
            None => self.config.system_prompt.clone(),
        };
        ResolvedConfig {
            model: tc.and_then(|c| c.model.clone()).or_else(|| {
                if self.config.default_model.is_empty() {
                    None
                } else {
                    Some(self.config.default_model.clone())
                }
            }),
            system,
            max_turns: tc
                .and_then(|c| c.max_turns)
                .unwrap_or(self.config.default_max_turns),
            max_cost: tc.and_then(|c| c.max_cost),
            max_duration: tc.and_then(|c| c.max_duration),
            allowed_tools: tc.and_then(|c| c.allowed_tools.clone()),
            max_tokens: self.config.default_max_tokens,
            token_budget: tc
                .and_then(|c| c.max_token_budget)
                .unwrap_or(self.config.default_token_budget),
        }
    }

    fn build_tool_schemas(&self, config: &ResolvedConfig) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .iter()
            .map(|tool| {
                let def = tool.definition();
                ToolSchema {
                    name: def.name,
                    description: def.description,
                    input_schema: def.input_schema,
                }
            })
            .collect();

        // Add effect tool schemas
        schemas.extend(effect_tool_schemas());

        // Filter by allowed_tools if specified
        if let Some(allowed) = &config.allowed_tools {
            schemas.retain(|s| allowed.contains(&s.name));
        }

        schemas
    }

    async fn assemble_context(
        &self,
        input: &OperatorInput,
    ) -> Result<Vec<ProviderMessage>, OperatorError> {
        let mut messages = Vec::new();

        // Read history from state if session is present
        if let Some(session) = &input.session {
            let scope = Scope::Session(session.clone());
            match self.state_reader.read(&scope, "messages").await {
                Ok(Some(history)) => {
                    if let Ok(history_messages) =
                        serde_json::from_value::<Vec<ProviderMessage>>(history)
                    {
                        messages = history_messages;
                    }
                }
                Ok(None) => {} // No history yet
                Err(_) => {}   // State read errors are non-fatal
            }
        }

        // Add the new user message
        messages.push(content_to_user_message(&input.message));

        Ok(messages)
    }

    fn try_as_effect(&self, name: &str, input: &serde_json::Value) -> Option<Effect> {
        match name {
            "write_memory" => {
                let scope_str = input.get("scope")?.as_str()?;
                let key = input.get("key")?.as_str()?.to_string();
                let value = input.get("value")?.clone();
                let scope = parse_scope(scope_str);
                Some(Effect::WriteMemory { scope, key, value })
            }
            "delete_memory" => {
                let scope_str = input.get("scope")?.as_str()?;
                let key = input.get("key")?.as_str()?.to_string();
                let scope = parse_scope(scope_str);
                Some(Effect::DeleteMemory { scope, key })
            }
            "delegate" => {
                let agent = input.get("agent")?.as_str()?;
                let message = input.get("message").and_then(|m| m.as_str()).unwrap_or("");
                let delegate_input =
                    OperatorInput::new(Content::text(message), layer0::operator::TriggerType::Task);
                Some(Effect::Delegate {
                    agent: AgentId::new(agent),
                    input: Box::new(delegate_input),
                })
            }
            "handoff" => {
                let agent = input.get("agent")?.as_str()?;
                let state = input
                    .get("state")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                Some(Effect::Handoff {
                    agent: AgentId::new(agent),
                    state,
                })
            }
            "signal" => {
                let target = input.get("target")?.as_str()?;
                let signal_type = input
                    .get("signal_type")
                    .and_then(|s| s.as_str())
                    .unwrap_or("default");
                let data = input
                    .get("data")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                Some(Effect::Signal {
                    target: WorkflowId::new(target),
                    payload: SignalPayload::new(signal_type, data),
                })
            }
            _ => None,
        }
    }

    fn build_metadata(
        &self,
        economics: &EconomicsManager,
        tool_records: Vec<ToolCallRecord>,
        duration: DurationMs,
    ) -> OperatorMetadata {
        let m = economics.metrics();
        let mut meta = OperatorMetadata::default();
        meta.tokens_in = m.input_tokens;
        meta.tokens_out = m.output_tokens;
        meta.cost = m.estimated_cost;
        meta.turns_used = m.iteration;
        meta.tools_called = tool_records;
        meta.duration = duration;
        meta
    }

    fn make_output(
        message: Content,
        exit_reason: ExitReason,
        metadata: OperatorMetadata,
        effects: Vec<Effect>,
    ) -> OperatorOutput {
        let mut output = OperatorOutput::new(message, exit_reason);
        output.metadata = metadata;
        output.effects = effects;
        output
    }

    fn build_hook_context(
        &self,
        point: HookPoint,
        economics: &EconomicsManager,
        elapsed: DurationMs,
    ) -> HookContext {
        let m = economics.metrics();
        let mut ctx = HookContext::new(point);
        ctx.tokens_used = m.input_tokens + m.output_tokens;
        ctx.cost = m.estimated_cost;
        ctx.turns_completed = m.iteration;
        ctx.elapsed = elapsed;
        ctx
    }

    /// Build the `ExecutionBudget` consulted by the economics manager for
    /// one execution, from the resolved per-request/default configuration.
    fn build_budget(&self, config: &ResolvedConfig) -> ExecutionBudget {
        ExecutionBudget {
            max_tokens: config.token_budget,
            soft_token_limit: None,
            max_iterations: config.max_turns.max(1),
            max_duration: config.max_duration.unwrap_or(DurationMs::ZERO),
            enforcement_mode: self.config.default_enforcement_mode,
        }
    }

    /// Call the provider, retrying retryable errors with exponential
    /// backoff (base 1s, cap 30s, up to [`MAX_ATTEMPTS`] total attempts).
    /// Cancellation during backoff short-circuits with `Ok(None)`, which
    /// the caller treats as a cancelled termination.
    async fn call_provider_with_retry(
        &self,
        request: &ProviderRequest,
    ) -> Result<Option<ProviderResponse>, OperatorError> {
        let mut attempt = 0u32;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(Some(response)),
                Err(e) => {
                    attempt += 1;
                    let retryable = e.is_retryable();
                    tracing::warn!(attempt, retryable, error = %e, "llm.error");
                    if !retryable {
                        return Err(map_provider_error(e));
                    }
                    if attempt >= MAX_ATTEMPTS {
                        return Err(OperatorError::Retryable(format!(
                            "provider call failed after {attempt} attempts: {e}"
                        )));
                    }
                    let delay = backoff_delay(attempt - 1);
                    tokio::select! {
                        _ = self.cancellation.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

/// Exponential backoff delay for the given zero-indexed attempt number.
fn backoff_delay(attempt: u32) -> Duration {
    let scaled = RETRY_BASE_DELAY.saturating_mul(1u32 << attempt.min(8));
    scaled.min(RETRY_MAX_DELAY)
}

fn map_provider_error(e: ProviderError) -> OperatorError {
    if e.is_retryable() {
        OperatorError::Retryable(e.to_string())
    } else {
        OperatorError::Model(e.to_string())
    }
}

/// Render a dispatch-level [`ToolError`] as the text of a failed
/// `ToolResult` content part.
fn describe_tool_error(e: &ToolError) -> String {
    e.to_string()
}

/// Render a [`ToolOutput`] as the text that flows back into the model's
/// context as a `ToolResult` content part.
fn tool_output_to_text(output: &ToolOutput) -> String {
    let text: String = output
        .content
        .iter()
        .map(|item| match item {
            ContentItem::Text(t) => t.clone(),
            ContentItem::Image { .. } => "[image]".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    if !text.is_empty() {
        return text;
    }
    match &output.structured_content {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl<P: Provider + 'static> Operator for ReactOperator<P> {
    async fn execute(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let start = Instant::now();
        let config = self.resolve_config(&input);
        let mut messages = self.assemble_context(&input).await?;
        let tool_schemas = self.build_tool_schemas(&config);

        let budget = self.build_budget(&config);
        let economics = EconomicsManager::new(budget)
            .map_err(|e| OperatorError::NonRetryable(e.to_string()))?;

        let mut tool_records: Vec<ToolCallRecord> = vec![];
        let mut effects: Vec<Effect> = vec![];
        let mut last_content: Vec<ContentPart> = vec![];
        let mut pending_nudge: Option<String> = None;

        loop {
            // 1. Guard: cancellation, then budget (iteration/duration/tokens).
            if self.cancellation.is_cancelled() {
                return Ok(Self::make_output(
                    parts_to_content(&last_content),
                    ExitReason::Custom("cancelled".into()),
                    self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                    effects,
                ));
            }

            let budget_check = economics.check_budget();
            if !budget_check.can_continue {
                let exit_reason = match budget_check.budget_type {
                    BudgetDimension::Iterations => ExitReason::MaxTurns,
                    BudgetDimension::Duration => ExitReason::Timeout,
                    BudgetDimension::Tokens | BudgetDimension::None => ExitReason::BudgetExhausted,
                };
                return Ok(Self::make_output(
                    parts_to_content(&last_content),
                    exit_reason,
                    self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                    effects,
                ));
            }

            // 2. Hook: PreInference
            let hook_ctx =
                self.build_hook_context(HookPoint::PreInference, &economics, DurationMs::from(start.elapsed()));
            if let HookAction::Halt { reason } = self.hooks.dispatch(&hook_ctx).await {
                return Ok(Self::make_output(
                    parts_to_content(&last_content),
                    ExitReason::ObserverHalt { reason },
                    self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                    effects,
                ));
            }

            // 3. Build ProviderRequest — strip tools if force_text_only; inject
            // a transient system note (budget warning and/or loop-detector
            // nudge) for this call only, without polluting `messages`.
            let mut system = config.system.clone();
            if let Some(prompt) = &budget_check.injected_prompt {
                system.push_str("\n\n[budget] ");
                system.push_str(prompt);
            }
            if let Some(nudge) = pending_nudge.take() {
                system.push_str("\n\n[loop-detector] ");
                system.push_str(&nudge);
            }
            let tools = if budget_check.force_text_only {
                Vec::new()
            } else {
                tool_schemas.clone()
            };

            let request = ProviderRequest {
                model: config.model.clone(),
                messages: messages.clone(),
                tools,
                max_tokens: Some(config.max_tokens),
                temperature: None,
                system: Some(system),
                extra: input.metadata.clone(),
            };

            // 4. Call provider with retry/backoff.
            tracing::debug!(iteration = economics.metrics().iteration, "llm.start");
            let response = match self.call_provider_with_retry(&request).await? {
                Some(response) => response,
                None => {
                    return Ok(Self::make_output(
                        parts_to_content(&last_content),
                        ExitReason::Custom("cancelled".into()),
                        self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                        effects,
                    ));
                }
            };
            tracing::debug!(stop_reason = ?response.stop_reason, "llm.complete");

            // 5. Usage recording
            economics.record_llm_usage(
                response.usage.input_tokens,
                response.usage.output_tokens,
                response.usage.cache_read_tokens.unwrap_or(0),
                response.usage.cache_creation_tokens.unwrap_or(0),
                response.cost.unwrap_or(Decimal::ZERO),
            );

            // 6. Hook: PostInference
            let mut hook_ctx =
                self.build_hook_context(HookPoint::PostInference, &economics, DurationMs::from(start.elapsed()));
            hook_ctx.model_output = Some(parts_to_content(&response.content));
            if let HookAction::Halt { reason } = self.hooks.dispatch(&hook_ctx).await {
                return Ok(Self::make_output(
                    parts_to_content(&response.content),
                    ExitReason::ObserverHalt { reason },
                    self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                    effects,
                ));
            }

            last_content.clone_from(&response.content);

            // 7. Cost cap (token/iteration/duration caps live in EconomicsManager;
            // the dollar cost cap is request-scoped config, not tracked there).
            if let Some(max_cost) = &config.max_cost {
                if economics.metrics().estimated_cost >= *max_cost {
                    return Ok(Self::make_output(
                        parts_to_content(&response.content),
                        ExitReason::BudgetExhausted,
                        self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                        effects,
                    ));
                }
            }

            // 8. Check StopReason
            match response.stop_reason {
                StopReason::MaxTokens => {
                    return Err(OperatorError::Model("output truncated (max_tokens)".into()));
                }
                StopReason::ContentFilter => {
                    return Err(OperatorError::Model("content filtered".into()));
                }
                StopReason::EndTurn => {
                    return Ok(Self::make_output(
                        parts_to_content(&response.content),
                        ExitReason::Complete,
                        self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                        effects,
                    ));
                }
                StopReason::ToolUse => {
                    // Continue to tool execution below
                }
            }

            // 9. Tool dispatch
            // Add assistant message to context
            messages.push(ProviderMessage {
                role: Role::Assistant,
                content: response.content.clone(),
            });

            let tool_uses: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            let mut result_slots: Vec<Option<ContentPart>> = vec![None; tool_uses.len()];
            // (original index, dispatch call) for everything that needs to
            // actually run through the registry's parallel batch executor.
            let mut batch_items: Vec<(usize, DispatchCall)> = Vec::new();

            for (idx, (id, name, tool_input)) in tool_uses.iter().enumerate() {
                // a. Effect tools bypass the registry/hooks entirely.
                if EFFECT_TOOL_NAMES.contains(&name.as_str()) {
                    if let Some(effect) = self.try_as_effect(name, tool_input) {
                        effects.push(effect);
                    }
                    result_slots[idx] = Some(ContentPart::ToolResult {
                        tool_use_id: id.clone(),
                        content: format!("{name} effect recorded."),
                        is_error: false,
                    });
                    tool_records.push(ToolCallRecord::new(name, DurationMs::ZERO, true));
                    continue;
                }

                // b. Hook: PreToolUse (sequential — may Halt, SkipTool, or
                // ModifyToolInput before the call ever joins the batch).
                let mut actual_input = tool_input.clone();
                let mut hook_ctx = HookContext::new(HookPoint::PreToolUse);
                hook_ctx.tool_name = Some(name.clone());
                hook_ctx.tool_input = Some(tool_input.clone());
                let base_ctx = self.build_hook_context(
                    HookPoint::PreToolUse,
                    &economics,
                    DurationMs::from(start.elapsed()),
                );
                hook_ctx.tokens_used = base_ctx.tokens_used;
                hook_ctx.cost = base_ctx.cost;
                hook_ctx.turns_completed = base_ctx.turns_completed;
                hook_ctx.elapsed = base_ctx.elapsed;

                match self.hooks.dispatch(&hook_ctx).await {
                    HookAction::Halt { reason } => {
                        return Ok(Self::make_output(
                            parts_to_content(&last_content),
                            ExitReason::ObserverHalt { reason },
                            self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                            effects,
                        ));
                    }
                    HookAction::SkipTool { reason } => {
                        result_slots[idx] = Some(ContentPart::ToolResult {
                            tool_use_id: id.clone(),
                            content: format!("Skipped: {reason}"),
                            is_error: false,
                        });
                        tool_records.push(ToolCallRecord::new(name, DurationMs::ZERO, false));
                        continue;
                    }
                    HookAction::ModifyToolInput { new_input } => {
                        actual_input = new_input;
                    }
                    HookAction::Continue => {}
                    _ => {}
                }

                if let Some(signal) = economics.note_tool_call(name, &actual_input) {
                    tracing::warn!(?signal, tool = %name, "doom_loop");
                    pending_nudge = Some(describe_loop_signal(&signal));
                }
                economics.record_tool_call(name, &actual_input, economics.metrics().iteration);

                batch_items.push((
                    idx,
                    DispatchCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: actual_input,
                    },
                ));
            }

            // c. Dispatch the whole batch concurrently — this is the only
            // place parallelism is introduced inside one iteration.
            if !batch_items.is_empty() {
                let calls: Vec<DispatchCall> = batch_items.iter().map(|(_, c)| c.clone()).collect();
                let ctx = ToolContext {
                    session_id: input
                        .session
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    cancellation_token: self.cancellation.child_token(),
                    ..ToolContext::default()
                };
                for call in &calls {
                    tracing::debug!(tool = %call.name, "tool.start");
                }
                let results = self
                    .tools
                    .execute_batch(calls, &ctx, self.config.tool_call_timeout)
                    .await;

                // `execute_batch` preserves input order, so zipping against
                // `batch_items` lines up (orig_idx, call) with (id, result).
                for ((orig_idx, call), (call_id, result)) in
                    batch_items.iter().zip(results.into_iter())
                {
                    debug_assert_eq!(&call.id, &call_id);
                    let succeeded = matches!(&result, Ok(output) if !output.is_error);
                    tracing::debug!(tool = %call.name, ok = succeeded, "tool.complete");
                    let part = match result {
                        Ok(output) => ContentPart::ToolResult {
                            tool_use_id: call_id,
                            content: tool_output_to_text(&output),
                            is_error: output.is_error,
                        },
                        Err(e) => ContentPart::ToolResult {
                            tool_use_id: call_id,
                            content: describe_tool_error(&e),
                            is_error: true,
                        },
                    };
                    result_slots[*orig_idx] = Some(part);
                    tool_records.push(ToolCallRecord::new(&call.name, DurationMs::ZERO, succeeded));
                }
            }

            // Append one tool-role message per result, in call order, each
            // tagged with its originating call id — never bundled into a
            // single message, so the history carries exactly as many tool
            // messages as tool calls were issued.
            for slot in result_slots {
                let part = slot.expect("every tool_use slot filled");
                messages.push(ProviderMessage {
                    role: Role::User,
                    content: vec![part],
                });
            }

            // 10. Hook: ExitCheck
            let hook_ctx =
                self.build_hook_context(HookPoint::ExitCheck, &economics, DurationMs::from(start.elapsed()));
            if let HookAction::Halt { reason } = self.hooks.dispatch(&hook_ctx).await {
                return Ok(Self::make_output(
                    parts_to_content(&last_content),
                    ExitReason::ObserverHalt { reason },
                    self.build_metadata(&economics, tool_records, DurationMs::from(start.elapsed())),
                    effects,
                ));
            }

            // 11. Context compaction
            let limit = config.max_tokens as usize * 4;
            if self.context_strategy.should_compact(&messages, limit) {
                messages = self.context_strategy.compact(messages);
            }

            // 12. Loop repeats
        }
    }
}

fn describe_loop_signal(signal: &neuron_economics::LoopSignal) -> String {
    use neuron_economics::LoopSignal;
    match signal {
        LoopSignal::Repetition { tool_name, repeat_count } => format!(
            "'{tool_name}' has been called {repeat_count} times with the same arguments recently. Try a different approach."
        ),
        LoopSignal::Oscillation { tool_a, tool_b } => format!(
            "You are oscillating between '{tool_a}' and '{tool_b}'. Consider a different strategy."
        ),
        LoopSignal::Saturation { tool_name, count, window } => format!(
            "'{tool_name}' accounts for {count}/{window} of your recent calls. Consider whether this is still productive."
        ),
    }
}

/// Schemas for effect tools that the model can call.
fn effect_tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "write_memory".into(),
            description: "Write a value to persistent memory.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "scope": {"type": "string", "description": "Memory scope (e.g. 'global', 'session:id')"},
                    "key": {"type": "string", "description": "Memory key"},
                    "value": {"description": "Value to store"}
                },
                "required": ["scope", "key", "value"]
            }),
        },
        ToolSchema {
            name: "delete_memory".into(),
            description: "Delete a value from persistent memory.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "scope": {"type": "string", "description": "Memory scope"},
                    "key": {"type": "string", "description": "Memory key"}
                },
                "required": ["scope", "key"]
            }),
        },
        ToolSchema {
            name: "delegate".into(),
            description: "Delegate a task to another agent.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string", "description": "Agent ID to delegate to"},
                    "message": {"type": "string", "description": "Task description for the agent"}
                },
                "required": ["agent", "message"]
            }),
        },
        ToolSchema {
            name: "handoff".into(),
            description: "Hand off the conversation to another agent.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string", "description": "Agent ID to hand off to"},
                    "state": {"description": "State to pass to the next agent"}
                },
                "required": ["agent"]
            }),
        },
        ToolSchema {
            name: "signal".into(),
            description: "Send a signal to another workflow.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "target": {"type": "string", "description": "Target workflow ID"},
                    "signal_type": {"type": "string", "description": "Signal type identifier"},
                    "data": {"description": "Signal payload data"}
                },
                "required": ["target"]
            }),
        },
    ]
}

/// Parse a scope string into a layer0 Scope.
fn parse_scope(s: &str) -> Scope {
    if s == "global" {
        return Scope::Global;
    }
    if let Some(id) = s.strip_prefix("session:") {
        return Scope::Session(layer0::SessionId::new(id));
    }
    if let Some(id) = s.strip_prefix("workflow:") {
        return Scope::Workflow(layer0::WorkflowId::new(id));
    }
    Scope::Custom(s.to_string())
}
