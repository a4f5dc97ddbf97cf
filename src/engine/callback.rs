//! Callback capability objects
//!
//! Per-activity business logic is supplied as boxed functions behind the
//! `CallbackResolver` trait, an explicit capability handed to the engine
//! at construction. `CallbackRegistry` is the map-backed implementation
//! most callers want.

use std::collections::HashMap;

use super::activity::{ActivityId, ActivityKind};
use super::context::{Context, Data, KnowledgeBase};
use super::error::CallbackError;
use super::process::Process;
use super::response::Response;

/// Business logic for one activity: consumes the current input, kb and
/// ctx, and returns the updated state inside a [`Response`]
pub type Callback = Box<dyn Fn(&Data, KnowledgeBase, Context) -> Response + Send + Sync>;

/// Supplies the callback of an activity given its id
pub trait CallbackResolver {
    /// Resolve the callback for `activity`, or fail if none is known
    fn resolve(&self, activity: &ActivityId) -> Result<&Callback, CallbackError>;
}

/// Map-backed callback resolver
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<ActivityId, Callback>,
}

impl CallbackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for an activity id, replacing any previous one
    pub fn register<F>(&mut self, activity: impl Into<ActivityId>, callback: F)
    where
        F: Fn(&Data, KnowledgeBase, Context) -> Response + Send + Sync + 'static,
    {
        self.callbacks.insert(activity.into(), Box::new(callback));
    }

    /// Register the callback for an activity id, builder style
    pub fn with<F>(mut self, activity: impl Into<ActivityId>, callback: F) -> Self
    where
        F: Fn(&Data, KnowledgeBase, Context) -> Response + Send + Sync + 'static,
    {
        self.register(activity, callback);
        self
    }

    /// Whether a callback is registered for the activity id
    pub fn contains(&self, activity: &ActivityId) -> bool {
        self.callbacks.contains_key(activity)
    }
}

impl CallbackResolver for CallbackRegistry {
    fn resolve(&self, activity: &ActivityId) -> Result<&Callback, CallbackError> {
        self.callbacks
            .get(activity)
            .ok_or_else(|| CallbackError::Unknown(activity.clone()))
    }
}

/// Verify that every non-End activity resolves to a callback
///
/// Run once at engine construction, before any input is accepted.
pub fn verify_callbacks(
    process: &Process,
    resolver: &dyn CallbackResolver,
) -> Result<(), CallbackError> {
    for activity in process.activities() {
        match activity.kind {
            ActivityKind::End => {}
            _ => {
                resolver.resolve(&activity.id)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::activity::Activity;

    fn noop() -> impl Fn(&Data, KnowledgeBase, Context) -> Response {
        |_data, kb, ctx| Response::new(kb, ctx, true)
    }

    fn linear_process() -> Process {
        let activities = vec![
            Activity::new("start", Some(ActivityId::new("fin")), ActivityKind::Start).unwrap(),
            Activity::new("fin", None, ActivityKind::End).unwrap(),
        ];
        Process::new(activities, ActivityId::new("start")).unwrap()
    }

    #[test]
    fn test_registry_resolves_registered() {
        let registry = CallbackRegistry::new().with("start", noop());
        assert!(registry.contains(&ActivityId::new("start")));
        assert!(registry.resolve(&ActivityId::new("start")).is_ok());
    }

    #[test]
    fn test_registry_rejects_unknown() {
        let registry = CallbackRegistry::new();
        let err = registry.resolve(&ActivityId::new("ghost")).err().unwrap();
        assert_eq!(err, CallbackError::Unknown(ActivityId::new("ghost")));
    }

    #[test]
    fn test_verify_skips_end() {
        let registry = CallbackRegistry::new().with("start", noop());
        verify_callbacks(&linear_process(), &registry).unwrap();
    }

    #[test]
    fn test_verify_names_missing_activity() {
        let registry = CallbackRegistry::new();
        let err = verify_callbacks(&linear_process(), &registry).unwrap_err();
        assert_eq!(err, CallbackError::Unknown(ActivityId::new("start")));
    }
}
