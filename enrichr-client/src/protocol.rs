//! Streaming channel wire protocol
//!
//! Client → server, once per job, immediately on open:
//! `{"type":"start_enrichment","companies":[{"name":..,"website":..}, ...]}`
//!
//! Server → client:
//! - zero or more `{"progress":0-100,"processed":n,"total":n}` (some service
//!   builds never send these)
//! - exactly one `{"type":"enrichment_complete","data":[...]}`

use crate::error::{EnrichError, EnrichResult};
use crate::models::{EnrichedCompany, EnrichmentRequest, ProgressUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMPLETE_TYPE: &str = "enrichment_complete";

/// Message sent by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartEnrichment { companies: Vec<EnrichmentRequest> },
}

impl ClientMessage {
    pub fn to_json(&self) -> EnrichResult<String> {
        serde_json::to_string(self)
            .map_err(|e| EnrichError::Parse(format!("Failed to encode client message: {}", e)))
    }
}

/// Message received from the service
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Progress(ProgressUpdate),
    Complete(Vec<EnrichedCompany>),
    /// `enrichment_complete` whose payload did not decode; still terminal
    InvalidCompletion(String),
    /// Well-formed JSON this client does not act on
    Unrecognized(Option<String>),
}

#[derive(Deserialize)]
struct ProgressBody {
    progress: f64,
    #[serde(default)]
    processed: u64,
    #[serde(default)]
    total: u64,
}

#[derive(Deserialize)]
struct CompleteBody {
    data: Vec<EnrichedCompany>,
}

impl ServerMessage {
    /// Decode one text frame
    ///
    /// A `progress` key marks a progress message regardless of any `type`
    /// field; otherwise `type` selects the message.
    pub fn parse(text: &str) -> EnrichResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| EnrichError::Parse(format!("Invalid server message: {}", e)))?;

        let Some(object) = value.as_object() else {
            return Err(EnrichError::Parse(
                "Server message is not a JSON object".to_string(),
            ));
        };

        if object.contains_key("progress") {
            let body: ProgressBody = serde_json::from_value(value)
                .map_err(|e| EnrichError::Parse(format!("Invalid progress message: {}", e)))?;
            return Ok(ServerMessage::Progress(ProgressUpdate {
                percent: body.progress,
                processed: body.processed,
                total: body.total,
            }));
        }

        let message_type = object.get("type").and_then(Value::as_str).map(str::to_owned);
        match message_type.as_deref() {
            Some(COMPLETE_TYPE) => match serde_json::from_value::<CompleteBody>(value) {
                Ok(body) => Ok(ServerMessage::Complete(body.data)),
                Err(e) => Ok(ServerMessage::InvalidCompletion(format!(
                    "Invalid completion message: {}",
                    e
                ))),
            },
            _ => Ok(ServerMessage::Unrecognized(message_type)),
        }
    }
}
