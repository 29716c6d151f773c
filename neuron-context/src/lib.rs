#![deny(missing_docs)]
//! Context window management for long-running agents.
//!
//! Provides token estimation ([`TokenCounter`]), four compaction
//! strategies implementing `neuron_types::ContextStrategy`
//! ([`SlidingWindowStrategy`], [`ToolResultClearingStrategy`],
//! [`SummarizationStrategy`], [`CompositeStrategy`]), rule-based system
//! prompt injection ([`SystemInjector`]), and persistent prompt sections
//! ([`PersistentContext`]).

pub mod counter;
pub mod injector;
pub mod persistent;
pub mod strategies;

pub use counter::TokenCounter;
pub use injector::{InjectionTrigger, SystemInjector};
pub use persistent::{ContextSection, PersistentContext};
pub use strategies::{
    BoxedStrategy, CompositeStrategy, SlidingWindowStrategy, SummarizationStrategy,
    ToolResultClearingStrategy,
};
