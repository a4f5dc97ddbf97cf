//! Callback results and caller-facing replies
//!
//! A `Response` is what a callback returns: the updated kb/ctx, a
//! completion flag, optional user-facing text and payload, and (for
//! gateways) the chosen child. The engine decorates it with default
//! utterances and strips it down to a `Reply` for the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::activity::ActivityId;
use super::context::{Context, KnowledgeBase};

/// The mutable result of one callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Updated knowledge base, reclaimed by the engine after the call
    pub kb: KnowledgeBase,

    /// Updated context, reclaimed by the engine after the call
    pub ctx: Context,

    /// Whether the current activity's work is done
    pub complete: bool,

    /// User-facing text accumulated so far
    pub utterance: String,

    /// Structured payload for non-text UI state
    pub payload: Map<String, Value>,

    /// For gateway activities: the chosen child id, or None for "no
    /// further choice, proceed past the gateway"
    pub choice: Option<ActivityId>,
}

impl Response {
    /// Create a response with empty utterance, payload and choice
    pub fn new(kb: KnowledgeBase, ctx: Context, complete: bool) -> Self {
        Self {
            kb,
            ctx,
            complete,
            utterance: String::new(),
            payload: Map::new(),
            choice: None,
        }
    }

    /// Set the user-facing utterance
    pub fn with_utterance(mut self, utterance: impl Into<String>) -> Self {
        self.utterance = utterance.into();
        self
    }

    /// Set the structured payload
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Set the chosen child for a gateway activity
    pub fn with_choice(mut self, choice: impl Into<ActivityId>) -> Self {
        self.choice = Some(choice.into());
        self
    }

    /// Append the default utterance stored in the kb under `key`
    ///
    /// The looked-up value (or `fallback` when the key is absent or not a
    /// string) replaces an empty utterance; otherwise, when non-empty, it
    /// is appended after a newline. An empty looked-up value never adds a
    /// separator.
    pub fn add_utterance(&mut self, kb: &KnowledgeBase, key: &str, fallback: &str) -> &mut Self {
        let addition = kb.get(key).and_then(Value::as_str).unwrap_or(fallback);
        if self.utterance.is_empty() {
            self.utterance = addition.to_string();
        } else if !addition.is_empty() {
            self.utterance.push('\n');
            self.utterance.push_str(addition);
        }
        self
    }

    /// Strip this response down to the caller-facing reply
    pub fn into_reply(self) -> Reply {
        Reply {
            utterance: self.utterance,
            payload: self.payload,
        }
    }
}

/// What the caller receives after each input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// User-facing text
    pub utterance: String,

    /// Structured payload for non-text UI state
    pub payload: Map<String, Value>,
}
