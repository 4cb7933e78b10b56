//! Result reconciliation
//!
//! Both completion paths end here: the streaming coordinator hands over
//! bulk rows, the one-shot endpoint hands over a profile. Payloads are
//! wrapped, never rewritten, so unknown fields survive to the display layer.

use crate::error::{EnrichError, EnrichResult};
use crate::models::{EnrichedCompany, EnrichmentResult, StructuredProfile};
use serde_json::Value;

pub fn reconcile_bulk(rows: Vec<EnrichedCompany>) -> EnrichmentResult {
    EnrichmentResult::Bulk(rows)
}

pub fn reconcile_profile(profile: StructuredProfile) -> EnrichmentResult {
    EnrichmentResult::Profile(profile)
}

/// Reconcile an untyped `enriched_data` value
///
/// An array is a bulk row list, an object a structured profile.
pub fn reconcile_value(value: Value) -> EnrichResult<EnrichmentResult> {
    match value {
        Value::Array(_) => {
            let rows: Vec<EnrichedCompany> = serde_json::from_value(value)
                .map_err(|e| EnrichError::Parse(format!("Invalid bulk result rows: {}", e)))?;
            Ok(reconcile_bulk(rows))
        }
        Value::Object(fields) => Ok(reconcile_profile(StructuredProfile::new(fields))),
        other => Err(EnrichError::Parse(format!(
            "Unexpected enrichment payload: expected array or object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
