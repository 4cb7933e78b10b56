//! Upload-side company types: raw rows, column mapping, enrichment requests
//! and bulk result rows

use crate::error::{EnrichResult, ValidationErrors};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One parsed data line as ordered header → cell pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// Cell value for `header`
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Cells in header order
    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Logical field a header can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingField {
    CompanyName,
    Website,
}

impl MappingField {
    /// Wire/field name used in validation errors and the upload form
    pub fn as_str(self) -> &'static str {
        match self {
            MappingField::CompanyName => "companyName",
            MappingField::Website => "website",
        }
    }
}

/// Association of logical fields to uploaded headers
///
/// An empty string means "unmapped".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(rename = "companyName")]
    pub company_name_field: String,
    #[serde(rename = "website")]
    pub website_field: String,
}

impl ColumnMapping {
    pub fn new(company_name_field: impl Into<String>, website_field: impl Into<String>) -> Self {
        Self {
            company_name_field: company_name_field.into(),
            website_field: website_field.into(),
        }
    }

    pub fn get(&self, field: MappingField) -> &str {
        match field {
            MappingField::CompanyName => &self.company_name_field,
            MappingField::Website => &self.website_field,
        }
    }

    /// Override one field; an empty `header` unmaps it
    pub fn set(&mut self, field: MappingField, header: impl Into<String>) {
        let header = header.into();
        match field {
            MappingField::CompanyName => self.company_name_field = header,
            MappingField::Website => self.website_field = header,
        }
    }

    /// Check every non-empty field names a header in `headers`
    pub fn validate<S: AsRef<str>>(&self, headers: &[S]) -> EnrichResult<()> {
        let mut errors = ValidationErrors::new();
        self.collect_absent_headers(headers, &mut errors);
        errors.into_result()
    }

    /// Like [`validate`](Self::validate), additionally requiring a company name column
    pub fn validate_for_projection<S: AsRef<str>>(&self, headers: &[S]) -> EnrichResult<()> {
        let mut errors = ValidationErrors::new();
        if self.company_name_field.is_empty() {
            errors.push(
                MappingField::CompanyName.as_str(),
                "Company name column is required",
            );
        }
        self.collect_absent_headers(headers, &mut errors);
        errors.into_result()
    }

    fn collect_absent_headers<S: AsRef<str>>(&self, headers: &[S], errors: &mut ValidationErrors) {
        for field in [MappingField::CompanyName, MappingField::Website] {
            let header = self.get(field);
            if !header.is_empty() && !headers.iter().any(|h| h.as_ref() == header) {
                errors.push(
                    field.as_str(),
                    format!("Column '{}' is not present in the uploaded file", header),
                );
            }
        }
    }
}

/// One company to enrich
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub name: String,
    pub website: String,
}

impl EnrichmentRequest {
    pub fn new(name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
        }
    }
}

/// One bulk-mode result row
///
/// The service echoes each submitted record back with an `Enriched_Data`
/// field added; any other echoed keys are kept in `extra`. Text fields
/// accept null, missing or non-string values so one odd row cannot sink the
/// whole result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCompany {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub website: String,
    #[serde(rename = "Enriched_Data", default, deserialize_with = "lenient_text")]
    pub enriched_payload: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JSON value as text; null becomes empty, non-strings their JSON rendering
pub(crate) fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(text_of(value.as_ref()))
}
