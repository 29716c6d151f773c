#![deny(missing_docs)]
//! Shared provider/context/conversion primitives for ReAct-style operators.
//!
//! `neuron-op-react`'s `ReactOperator` is the `layer0::Operator` implementation
//! that consumes these types. This crate stays free of the `Operator` trait
//! boundary itself so it can be shared by other loop implementations.
//!
//! Key traits defined here:
//! - [`Provider`] — LLM provider interface (not object-safe, uses RPITIT)
//! - [`ContextStrategy`] — context window management

pub mod config;
pub mod context;
pub mod convert;
pub mod provider;
pub mod types;

// Re-exports
pub use config::NeuronTurnConfig;
pub use context::{ContextStrategy, NoCompaction};
pub use convert::{
    content_block_to_part, content_part_to_block, content_to_parts, content_to_user_message,
    parts_to_content,
};
pub use provider::{Provider, ProviderError};
pub use types::*;
