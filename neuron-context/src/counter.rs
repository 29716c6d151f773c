//! Token estimation for messages and tool definitions.

use neuron_types::{ContentBlock, ContentItem, Message, ToolDefinition};

/// Fixed per-message overhead (role tag, formatting) charged regardless of
/// content, matching how providers bill a small constant per turn.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Fixed token cost assigned to an image block.
///
/// Actual image token cost depends on resolution and the provider's own
/// vision tokenizer; this is a conservative flat estimate used only for
/// budget bookkeeping, not billing.
const IMAGE_TOKENS: usize = 300;

/// Fixed token cost assigned to a document block (PDF or plain-text file).
const DOCUMENT_TOKENS: usize = 500;

/// Estimates token counts for messages and tool definitions.
///
/// Uses a chars-per-token ratio rather than a real tokenizer — cheap,
/// provider-agnostic, and good enough to drive compaction decisions.
#[derive(Debug, Clone)]
pub struct TokenCounter {
    chars_per_token: f64,
}

impl TokenCounter {
    /// Create a counter with the default ratio (4 chars per token).
    #[must_use]
    pub fn new() -> Self {
        Self { chars_per_token: 4.0 }
    }

    /// Create a counter with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }

    /// Estimate the token count of a raw string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        let chars = text.chars().count();
        if chars == 0 {
            return 0;
        }
        (chars as f64 / self.chars_per_token).ceil() as usize
    }

    /// Estimate the total token count of a message list.
    #[must_use]
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Estimate the total token count of a tool definition list.
    #[must_use]
    pub fn estimate_tools(&self, tools: &[ToolDefinition]) -> usize {
        tools.iter().map(|t| self.estimate_tool(t)).sum()
    }

    fn estimate_message(&self, message: &Message) -> usize {
        let content: usize = message.content.iter().map(|b| self.estimate_block(b)).sum();
        MESSAGE_OVERHEAD_TOKENS + content
    }

    fn estimate_block(&self, block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text(text) => self.estimate_text(text),
            ContentBlock::Thinking { thinking, .. } => self.estimate_text(thinking),
            ContentBlock::RedactedThinking { data } => self.estimate_text(data),
            ContentBlock::ToolUse { name, input, .. } => {
                self.estimate_text(name) + self.estimate_text(&input.to_string())
            }
            ContentBlock::ToolResult { content, .. } => {
                content.iter().map(|item| self.estimate_item(item)).sum()
            }
            ContentBlock::Image { .. } => IMAGE_TOKENS,
            ContentBlock::Document { .. } => DOCUMENT_TOKENS,
            ContentBlock::Compaction { content } => self.estimate_text(content),
        }
    }

    fn estimate_item(&self, item: &ContentItem) -> usize {
        match item {
            ContentItem::Text(text) => self.estimate_text(text),
            ContentItem::Image { .. } => IMAGE_TOKENS,
        }
    }

    fn estimate_tool(&self, tool: &ToolDefinition) -> usize {
        self.estimate_text(&tool.name)
            + self.estimate_text(&tool.description)
            + self.estimate_text(&tool.input_schema.to_string())
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
