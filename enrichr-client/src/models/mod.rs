//! Data models for the enrichment pipeline

pub mod company;
pub mod job;
pub mod profile;
pub mod result;

pub use company::{ColumnMapping, EnrichedCompany, EnrichmentRequest, MappingField, RawRow};
pub use job::{BulkJob, JobFailure, JobProgress, ProgressUpdate, StateTransition};
pub use profile::{CompanyInput, StructuredProfile};
pub use result::{EnrichmentResult, ResultKind};
