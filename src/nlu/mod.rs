//! Text-to-data adapters
//!
//! An `NluAdapter` turns raw text into the data mapping callbacks
//! consume, so text and data input flow through the engine identically.
//! [`NoNlu`] is the built-in passthrough variant; [`RasaNlu`] calls an
//! external Rasa server.

pub mod rasa;

pub use rasa::RasaNlu;

use serde_json::Value;

use crate::engine::context::Data;
use crate::engine::error::NluError;

/// Translates text input into the equivalent data input
pub trait NluAdapter {
    /// Parse the utterance into a data mapping
    fn parse(&self, utterance: &str) -> Result<Data, NluError>;
}

/// Passthrough adapter that uses no language understanding at all
///
/// Every expected key maps to the raw utterance, so callbacks can pick the
/// key they care about. With keys `["name", "occupation"]`, the text
/// `"Mark"` parses to `{"name": "Mark", "occupation": "Mark"}`.
#[derive(Debug, Clone)]
pub struct NoNlu {
    keys: Vec<String>,
}

impl NoNlu {
    /// Create an adapter for the keys the process callbacks use
    pub fn new(expected_keys: Vec<String>) -> Self {
        Self {
            keys: expected_keys,
        }
    }

    /// The keys this adapter fills
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl NluAdapter for NoNlu {
    fn parse(&self, utterance: &str) -> Result<Data, NluError> {
        Ok(self
            .keys
            .iter()
            .map(|key| (key.clone(), Value::String(utterance.to_string())))
            .collect())
    }
}
