//! enrichr-client - company data enrichment orchestration engine
//!
//! Turns an uploaded company table into enrichment requests, submits them to
//! the remote enrichment service, follows the streamed progress protocol and
//! reconciles whatever comes back into one displayable result.
//!
//! Pipeline (leaves first):
//! 1. [`services::column_inference`] - guess company name / website columns
//! 2. [`services::tabular_ingest`] - parse the upload, project requests
//! 3. [`services::submission_gateway`] - validate and dispatch a job
//! 4. [`services::progress_coordinator`] - drive one streamed bulk job
//! 5. [`services::result_reconciler`] - normalize resolved payloads
//!
//! [`session::EnrichmentSession`] ties the stages together behind a single
//! observable state value for UI collaborators.

pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod services;
pub mod session;

pub use crate::config::ClientConfig;
pub use crate::error::{EnrichError, EnrichResult, ErrorKind, FieldError, ValidationErrors};
pub use crate::session::{EnrichmentSession, SessionState};
