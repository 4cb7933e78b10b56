//! Display-ready enrichment result

use super::company::EnrichedCompany;
use super::profile::StructuredProfile;
use serde::{Deserialize, Serialize};

/// Which result shape is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Bulk,
    Profile,
}

/// Tagged union of the two resolved shapes
///
/// Serialized as `{"kind": "bulk" | "profile", "data": ...}` so consumers
/// branch on `kind` instead of probing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EnrichmentResult {
    Bulk(Vec<EnrichedCompany>),
    Profile(StructuredProfile),
}

impl EnrichmentResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            EnrichmentResult::Bulk(_) => ResultKind::Bulk,
            EnrichmentResult::Profile(_) => ResultKind::Profile,
        }
    }

    pub fn as_bulk(&self) -> Option<&[EnrichedCompany]> {
        match self {
            EnrichmentResult::Bulk(rows) => Some(rows),
            EnrichmentResult::Profile(_) => None,
        }
    }

    pub fn as_profile(&self) -> Option<&StructuredProfile> {
        match self {
            EnrichmentResult::Profile(profile) => Some(profile),
            EnrichmentResult::Bulk(_) => None,
        }
    }
}
