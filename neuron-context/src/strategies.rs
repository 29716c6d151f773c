//! Context-compaction strategies.
//!
//! Four strategies, composable via [`CompositeStrategy`]:
//! - [`SlidingWindowStrategy`] drops the oldest non-system messages.
//! - [`ToolResultClearingStrategy`] blanks out old tool-result bodies
//!   while keeping message count and tool-use/tool-result pairing intact.
//! - [`SummarizationStrategy`] replaces old messages with a provider-
//!   generated summary.
//! - [`CompositeStrategy`] runs a pipeline of strategies, stopping as
//!   soon as the running token count is back under budget.

use async_trait::async_trait;
use neuron_types::{ContentBlock, ContentItem, ContextError, ContextStrategy, Message, Provider, Role, SystemPrompt};

use crate::counter::TokenCounter;

const CLEARED_TOOL_RESULT: &str = "[tool result cleared]";

/// Drops the oldest non-system messages, always keeping every system
/// message and the most recent `window_size` non-system messages.
pub struct SlidingWindowStrategy {
    window_size: usize,
    max_tokens: usize,
    counter: TokenCounter,
}

impl SlidingWindowStrategy {
    /// Create a strategy keeping the last `window_size` non-system messages.
    #[must_use]
    pub fn new(window_size: usize, max_tokens: usize) -> Self {
        Self::with_counter(window_size, max_tokens, TokenCounter::new())
    }

    /// Create a strategy with a custom [`TokenCounter`].
    #[must_use]
    pub fn with_counter(window_size: usize, max_tokens: usize, counter: TokenCounter) -> Self {
        Self { window_size, max_tokens, counter }
    }
}

#[async_trait]
impl ContextStrategy for SlidingWindowStrategy {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, _messages: &[Message], limit: usize) -> bool {
        limit > self.max_tokens
    }

    async fn compact(&self, messages: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        let (system, rest): (Vec<Message>, Vec<Message>) =
            messages.into_iter().partition(|m| m.role == Role::System);

        let keep_from = rest.len().saturating_sub(self.window_size);
        let mut result = system;
        result.extend(rest.into_iter().skip(keep_from));
        Ok(result)
    }
}

/// Blanks out the body of old tool results, keeping the `keep_recent_n`
/// most recent tool results (across the whole transcript) intact.
///
/// Message count and tool-use/tool-result id pairing are preserved —
/// only the cleared results' content and `is_error` flag change — so
/// downstream consumers that assume every `ToolUse` has a matching
/// `ToolResult` keep working.
pub struct ToolResultClearingStrategy {
    keep_recent_n: usize,
    max_tokens: usize,
    counter: TokenCounter,
}

impl ToolResultClearingStrategy {
    /// Create a strategy keeping the `keep_recent_n` most recent tool results.
    #[must_use]
    pub fn new(keep_recent_n: usize, max_tokens: usize) -> Self {
        Self::with_counter(keep_recent_n, max_tokens, TokenCounter::new())
    }

    /// Create a strategy with a custom [`TokenCounter`].
    #[must_use]
    pub fn with_counter(keep_recent_n: usize, max_tokens: usize, counter: TokenCounter) -> Self {
        Self { keep_recent_n, max_tokens, counter }
    }
}

#[async_trait]
impl ContextStrategy for ToolResultClearingStrategy {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, _messages: &[Message], limit: usize) -> bool {
        limit > self.max_tokens
    }

    async fn compact(&self, messages: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        let total_results = messages
            .iter()
            .flat_map(|m| &m.content)
            .filter(|b| matches!(b, ContentBlock::ToolResult { .. }))
            .count();
        let clear_count = total_results.saturating_sub(self.keep_recent_n);

        let mut seen = 0usize;
        let result = messages
            .into_iter()
            .map(|mut message| {
                for block in &mut message.content {
                    if let ContentBlock::ToolResult { content, is_error, .. } = block {
                        let should_clear = seen < clear_count;
                        seen += 1;
                        if should_clear {
                            *content = vec![ContentItem::Text(CLEARED_TOOL_RESULT.to_string())];
                            *is_error = false;
                        }
                    }
                }
                message
            })
            .collect();

        Ok(result)
    }
}

/// Replaces old messages with a single provider-generated summary,
/// keeping system messages and the `preserve_recent` most recent
/// non-system messages verbatim.
pub struct SummarizationStrategy<P: Provider> {
    provider: P,
    preserve_recent: usize,
    max_tokens: usize,
}

impl<P: Provider> SummarizationStrategy<P> {
    /// Create a strategy that summarizes via `provider`, keeping the
    /// `preserve_recent` most recent non-system messages untouched.
    #[must_use]
    pub fn new(provider: P, preserve_recent: usize, max_tokens: usize) -> Self {
        Self { provider, preserve_recent, max_tokens }
    }

    fn render_for_summary(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                let text: String = m
                    .content
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text(t) => Some(t.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{role}: {text}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl<P: Provider> ContextStrategy for SummarizationStrategy<P> {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        TokenCounter::new().estimate_messages(messages)
    }

    fn should_compact(&self, _messages: &[Message], limit: usize) -> bool {
        limit > self.max_tokens
    }

    async fn compact(&self, messages: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        let (system, rest): (Vec<Message>, Vec<Message>) =
            messages.into_iter().partition(|m| m.role == Role::System);

        let split_at = rest.len().saturating_sub(self.preserve_recent);
        let (to_summarize, recent) = rest.split_at(split_at);

        let transcript = Self::render_for_summary(to_summarize);
        let request = neuron_types::CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(format!(
                "Summarize the following conversation concisely, preserving \
                 any decisions, facts, and open questions:\n\n{transcript}"
            ))],
            system: Some(SystemPrompt::Text(
                "You summarize conversations for context compaction.".to_string(),
            )),
            ..Default::default()
        };

        let response = self.provider.complete(request).await?;
        let summary_text = response
            .message
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");

        let summary_message = Message {
            role: Role::User,
            content: vec![ContentBlock::Text(format!(
                "[Previous conversation summary]\n{summary_text}"
            ))],
        };

        let mut result = system;
        result.push(summary_message);
        result.extend(recent.iter().cloned());
        Ok(result)
    }
}

/// A type-erased, heap-allocated [`ContextStrategy`].
///
/// Lets [`CompositeStrategy`] hold a `Vec` of heterogeneous strategies.
pub struct BoxedStrategy(Box<dyn ContextStrategy>);

impl BoxedStrategy {
    /// Box a concrete strategy.
    #[must_use]
    pub fn new<S: ContextStrategy + 'static>(strategy: S) -> Self {
        Self(Box::new(strategy))
    }
}

#[async_trait]
impl ContextStrategy for BoxedStrategy {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.0.token_estimate(messages)
    }

    fn should_compact(&self, messages: &[Message], limit: usize) -> bool {
        self.0.should_compact(messages, limit)
    }

    async fn compact(&self, messages: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        self.0.compact(messages).await
    }
}

/// Chains several strategies into a pipeline.
///
/// `compact` runs strategies in order, re-measuring the token count
/// after each one; it stops as soon as the running estimate is back at
/// or under `max_tokens`, so a cheap strategy that already solved the
/// problem skips the more expensive ones after it.
pub struct CompositeStrategy {
    strategies: Vec<BoxedStrategy>,
    max_tokens: usize,
    counter: TokenCounter,
}

impl CompositeStrategy {
    /// Create a pipeline from an ordered list of strategies.
    #[must_use]
    pub fn new(strategies: Vec<BoxedStrategy>, max_tokens: usize) -> Self {
        Self { strategies, max_tokens, counter: TokenCounter::new() }
    }
}

#[async_trait]
impl ContextStrategy for CompositeStrategy {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, _messages: &[Message], limit: usize) -> bool {
        limit > self.max_tokens
    }

    async fn compact(&self, mut messages: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        for strategy in &self.strategies {
            let current = self.counter.estimate_messages(&messages);
            if current <= self.max_tokens {
                break;
            }
            messages = strategy.compact(messages).await?;
        }
        Ok(messages)
    }
}
