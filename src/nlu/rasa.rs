//! Rasa-backed NLU adapter
//!
//! Sends each utterance to a running Rasa server's `/model/parse`
//! endpoint and maps the result into `{intent, ...entities}` data. The
//! server must be trained and started separately (`rasa run --enable-api`).

use serde::Deserialize;
use serde_json::{Value, json};

use super::NluAdapter;
use crate::engine::context::Data;
use crate::engine::error::NluError;

/// Adapter that delegates parsing to an external Rasa server
///
/// A recognized utterance parses to the detected intent plus one entry per
/// extracted entity: `{"intent": "insert_name", "name": "Mark"}`. When no
/// intent is recognized the data is `{"intent": ""}`. Use [`RasaNlu::data`]
/// to hand-build an equivalent mapping for `handle_data_input`.
#[derive(Debug, Clone)]
pub struct RasaNlu {
    endpoint: String,
}

impl RasaNlu {
    /// Create an adapter talking to the given server, e.g.
    /// `http://localhost:5005`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Build the data mapping equivalent to a parsed utterance with the
    /// given intent and entity values
    pub fn data(intent: impl Into<String>, values: Data) -> Data {
        let mut data = Data::new();
        data.insert("intent".to_string(), Value::String(intent.into()));
        data.extend(values);
        data
    }
}

impl Default for RasaNlu {
    fn default() -> Self {
        Self::new("http://localhost:5005")
    }
}

impl NluAdapter for RasaNlu {
    fn parse(&self, utterance: &str) -> Result<Data, NluError> {
        let url = format!("{}/model/parse", self.endpoint.trim_end_matches('/'));
        let response = ureq::post(&url)
            .send_json(json!({ "text": utterance }))
            .map_err(|source| NluError::Request {
                endpoint: self.endpoint.clone(),
                source: Box::new(source),
            })?;
        let parsed: ParseResult = response.into_json()?;
        Ok(convert(parsed))
    }
}

/// Relevant subset of Rasa's `/model/parse` response body
#[derive(Debug, Deserialize)]
struct ParseResult {
    intent: Intent,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Intent {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    entity: String,
    value: Value,
}

fn convert(parsed: ParseResult) -> Data {
    match parsed.intent.name {
        None => RasaNlu::data("", Data::new()),
        Some(intent) => RasaNlu::data(
            intent,
            parsed
                .entities
                .into_iter()
                .map(|entity| (entity.entity, entity.value))
                .collect(),
        ),
    }
}
