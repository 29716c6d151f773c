//! Streaming completion events.

use crate::types::{Message, TokenUsage};

/// A single event in a streamed completion.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental assistant text.
    TextDelta(String),
    /// Incremental extended-thinking text.
    ThinkingDelta(String),
    /// Incremental thinking-block signature.
    SignatureDelta(String),
    /// A tool call has started streaming.
    ToolUseStart {
        /// Unique identifier for this tool call.
        id: String,
        /// Name of the tool being invoked.
        name: String,
    },
    /// Incremental JSON input for a tool call in progress.
    ///
    /// Deltas for the same `id` are concatenated in arrival order to form
    /// the full JSON input once [`StreamEvent::ToolUseEnd`] is reached.
    /// Deltas for distinct `id`s may interleave (parallel tool calls).
    ToolUseInputDelta {
        /// Identifier matching the originating [`StreamEvent::ToolUseStart`].
        id: String,
        /// Partial JSON text to append.
        delta: String,
    },
    /// A tool call's input is complete.
    ToolUseEnd {
        /// Identifier matching the originating [`StreamEvent::ToolUseStart`].
        id: String,
    },
    /// The full message is complete.
    MessageComplete(Message),
    /// Token usage statistics for the completed response.
    Usage(TokenUsage),
    /// The stream ended in error.
    Error(StreamError),
}

/// An error encountered mid-stream.
#[derive(Debug, Clone)]
pub struct StreamError {
    /// Human-readable error message.
    pub message: String,
    /// Whether the caller may retry the request.
    pub is_retryable: bool,
}

impl StreamError {
    /// Construct a non-retryable stream error.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: false,
        }
    }

    /// Construct a retryable stream error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: true,
        }
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

/// Handle to an in-progress streamed completion.
pub struct StreamHandle {
    /// Channel of incoming stream events.
    pub receiver: std::pin::Pin<Box<futures::channel::mpsc::Receiver<StreamEvent>>>,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}
