//! Tabular ingestion
//!
//! Parses uploaded delimited content into [`RawRow`]s and projects rows into
//! [`EnrichmentRequest`]s through a confirmed [`ColumnMapping`].
//!
//! **Parse policy:** the file is accepted or rejected as a whole. Non-UTF-8
//! content, a missing or blank header row, duplicate headers and ragged rows
//! are all `ParseError`s; no partial row set is ever returned.
//!
//! **Projection policy:**
//! - mapped company name empty (or whitespace only) → row dropped
//! - mapped website empty, or website unmapped → row kept, `website = ""`

use crate::error::{EnrichError, EnrichResult};
use crate::models::{ColumnMapping, EnrichmentRequest, RawRow};
use std::collections::HashSet;
use tracing::{debug, info};

/// Parser options
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub delimiter: u8,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Parsed upload: header list plus rows in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularData {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

impl TabularData {
    /// Parse comma-delimited content
    pub fn parse(content: &[u8]) -> EnrichResult<Self> {
        Self::parse_with(content, IngestOptions::default())
    }

    /// Parse delimited content with explicit options
    pub fn parse_with(content: &[u8], options: IngestOptions) -> EnrichResult<Self> {
        let text = std::str::from_utf8(content)
            .map_err(|e| EnrichError::Parse(format!("File is not valid UTF-8: {}", e)))?;
        // Spreadsheet exports often lead with a byte order mark
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EnrichError::Parse(format!("Failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(EnrichError::Parse("Missing header row".to_string()));
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(EnrichError::Parse(format!("Duplicate header '{}'", header)));
            }
        }

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                EnrichError::Parse(format!("Malformed data row {}: {}", index + 1, e))
            })?;
            let cells = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(RawRow::new(cells));
        }

        info!(
            columns = headers.len(),
            rows = rows.len(),
            "Parsed uploaded company table"
        );
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First `limit` rows, for a data preview
    pub fn preview(&self, limit: usize) -> &[RawRow] {
        &self.rows[..limit.min(self.rows.len())]
    }

    /// Project rows through `mapping`
    ///
    /// The mapping must name a company name column and only reference headers
    /// of this table; otherwise a field-scoped validation error is returned.
    pub fn project(&self, mapping: &ColumnMapping) -> EnrichResult<Vec<EnrichmentRequest>> {
        mapping.validate_for_projection(&self.headers)?;

        let requests: Vec<EnrichmentRequest> = self
            .rows
            .iter()
            .filter_map(|row| project_row(row, mapping))
            .collect();

        let dropped = self.rows.len() - requests.len();
        if dropped > 0 {
            debug!(dropped, "Dropped rows without a company name");
        }
        Ok(requests)
    }
}

/// Project one row, or `None` if it has no company name
pub fn project_row(row: &RawRow, mapping: &ColumnMapping) -> Option<EnrichmentRequest> {
    let name = row.get(&mapping.company_name_field)?;
    if name.trim().is_empty() {
        return None;
    }

    let website = if mapping.website_field.is_empty() {
        ""
    } else {
        row.get(&mapping.website_field).unwrap_or("")
    };

    Some(EnrichmentRequest::new(name, website))
}

/// Apply the name-drop policy to requests produced elsewhere (e.g. server-side projection)
pub fn retain_named(requests: Vec<EnrichmentRequest>) -> Vec<EnrichmentRequest> {
    requests
        .into_iter()
        .filter(|r| !r.name.trim().is_empty())
        .collect()
}
