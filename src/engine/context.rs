//! Knowledge base, context, and the completed-set
//!
//! The kb and ctx are plain JSON objects threaded through every callback.
//! The ctx always carries the reserved [`COMPLETED_KEY`] entry: a JSON
//! array of gateway ids currently satisfied, which callbacks read to
//! decide whether a gateway may be skipped.

use serde_json::{Map, Value};

use super::activity::ActivityId;

/// Data input for one engine step, as produced by an NLU adapter
pub type Data = Map<String, Value>;

/// Long-lived mapping mutated by callbacks and persisted externally
pub type KnowledgeBase = Map<String, Value>;

/// Session-scoped mapping mutated by callbacks and the engine
pub type Context = Map<String, Value>;

/// Context key whose value lists the gateways that currently allow skipping
pub const COMPLETED_KEY: &str = "_done_";

/// Reset the completed-set to empty, creating it if missing
pub fn reset_completed(ctx: &mut Context) {
    ctx.insert(COMPLETED_KEY.to_string(), Value::Array(Vec::new()));
}

/// Whether the gateway is currently marked completed
pub fn is_completed(ctx: &Context, id: &ActivityId) -> bool {
    entries(ctx)
        .map(|list| list.iter().any(|entry| entry.as_str() == Some(id.as_str())))
        .unwrap_or(false)
}

/// Ids of all gateways currently marked completed
pub fn completed_gateways(ctx: &Context) -> Vec<ActivityId> {
    entries(ctx)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(ActivityId::new)
                .collect()
        })
        .unwrap_or_default()
}

/// Add the gateway to the completed-set, if not already present
pub fn mark_completed(ctx: &mut Context, id: &ActivityId) {
    let list = entries_mut(ctx);
    if !list.iter().any(|entry| entry.as_str() == Some(id.as_str())) {
        list.push(Value::String(id.as_str().to_string()));
    }
}

/// Remove the gateway from the completed-set, if present
pub fn clear_completed(ctx: &mut Context, id: &ActivityId) {
    if let Some(Value::Array(list)) = ctx.get_mut(COMPLETED_KEY) {
        list.retain(|entry| entry.as_str() != Some(id.as_str()));
    }
}

fn entries(ctx: &Context) -> Option<&Vec<Value>> {
    match ctx.get(COMPLETED_KEY) {
        Some(Value::Array(list)) => Some(list),
        _ => None,
    }
}

fn entries_mut(ctx: &mut Context) -> &mut Vec<Value> {
    // A clobbered or missing entry is recreated empty.
    let entry = ctx
        .entry(COMPLETED_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    entry.as_array_mut().expect("completed-set entry is an array")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let mut ctx = Context::new();
        let gate = ActivityId::new("gate");

        assert!(!is_completed(&ctx, &gate));
        mark_completed(&mut ctx, &gate);
        assert!(is_completed(&ctx, &gate));
        assert_eq!(completed_gateways(&ctx), vec![gate.clone()]);

        // Idempotent: marking again keeps a single entry.
        mark_completed(&mut ctx, &gate);
        assert_eq!(completed_gateways(&ctx).len(), 1);

        clear_completed(&mut ctx, &gate);
        assert!(!is_completed(&ctx, &gate));
        assert_eq!(completed_gateways(&ctx), Vec::<ActivityId>::new());
    }

    #[test]
    fn test_reset_overwrites() {
        let mut ctx = Context::new();
        mark_completed(&mut ctx, &ActivityId::new("gate"));
        reset_completed(&mut ctx);
        assert!(completed_gateways(&ctx).is_empty());
    }

    #[test]
    fn test_clobbered_entry_is_recreated() {
        let mut ctx = Context::new();
        ctx.insert(COMPLETED_KEY.to_string(), Value::from(42));
        assert!(!is_completed(&ctx, &ActivityId::new("gate")));
        mark_completed(&mut ctx, &ActivityId::new("gate"));
        assert!(is_completed(&ctx, &ActivityId::new("gate")));
    }
}
