//! Colloquy – A process-driven dialogue engine
//!
//! This crate drives multi-step conversations from a declarative process
//! description:
//! - Processes are typed graphs of activities, validated at construction
//! - An interpreter walks the graph one user input at a time, invoking
//!   per-activity callbacks and threading a knowledge base and a context
//! - Gateways (exclusive, inclusive, parallel) branch into sub-paths and
//!   resume through a stack once those paths finish
//! - Text input flows through pluggable NLU adapters so text and data are
//!   handled identically
//! - The knowledge base persists through a caller-supplied hook, with a
//!   file-backed JSON implementation included

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod engine;
pub mod nlu;
pub mod store;

// Re-export key types for convenience
pub use engine::{
    Activity, ActivityId, ActivityKind, CallbackRegistry, CallbackResolver, Context, Data, Engine,
    EngineError, KnowledgeBase, Process, Reply, Response, Result,
};
pub use nlu::{NluAdapter, NoNlu, RasaNlu};

/// Current version of the Colloquy engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
