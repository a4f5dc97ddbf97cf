//! Process execution engine
//!
//! The core of the crate: activity graphs, their validation, the callback
//! capability objects, and the interpreter that walks a process one user
//! input at a time.

pub mod activity;
pub mod callback;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod process;
pub mod response;

pub use activity::{Activity, ActivityDescription, ActivityId, ActivityKind};
pub use callback::{Callback, CallbackRegistry, CallbackResolver, verify_callbacks};
pub use context::{COMPLETED_KEY, Context, Data, KnowledgeBase};
pub use error::{
    CallbackError, DescriptionError, EngineError, NluError, Result, StoreError,
};
pub use interpreter::{Engine, SaveHook, noop_save_hook};
pub use process::{Process, ProcessDescription};
pub use response::{Reply, Response};
