//! Job submission gateway
//!
//! Validates a request and dispatches it:
//! - **Bulk:** company list → [`ProgressCoordinator`] (streamed)
//! - **Single profile:** one company → [`EnrichmentApi::enrich_profile`] (one-shot)
//!
//! A gateway serves one mode. Validation runs before any I/O and reports
//! field-scoped errors.

use crate::error::{EnrichError, EnrichResult, ValidationErrors};
use crate::models::{BulkJob, CompanyInput, EnrichmentRequest, EnrichmentResult, JobProgress};
use crate::services::enrichment_api::EnrichmentApi;
use crate::services::progress_coordinator::ProgressCoordinator;
use crate::services::result_reconciler::{reconcile_bulk, reconcile_profile};
use chrono::Utc;
use enrichr_common::{EnrichEvent, EventBus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

pub const INVALID_URL_MESSAGE: &str = "Please enter a valid URL (e.g., https://www.example.com)";

/// Request shape a gateway accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    Bulk,
    SingleProfile,
}

/// Submission payload
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionRequest {
    Bulk(Vec<EnrichmentRequest>),
    SingleProfile(CompanyInput),
}

impl SubmissionRequest {
    pub fn mode(&self) -> SubmissionMode {
        match self {
            SubmissionRequest::Bulk(_) => SubmissionMode::Bulk,
            SubmissionRequest::SingleProfile(_) => SubmissionMode::SingleProfile,
        }
    }
}

/// Validate a bulk company list
pub fn validate_bulk(companies: &[EnrichmentRequest]) -> EnrichResult<()> {
    let mut errors = ValidationErrors::new();
    if companies.is_empty() {
        errors.push("companies", "At least one company is required");
    }
    for (index, company) in companies.iter().enumerate() {
        if company.name.trim().is_empty() {
            errors.push(
                format!("companies[{}].name", index),
                "Company name is required",
            );
        }
    }
    errors.into_result()
}

/// Validate a single-profile request
pub fn validate_profile(input: &CompanyInput) -> EnrichResult<()> {
    let mut errors = ValidationErrors::new();

    if input.company_name.trim().is_empty() {
        errors.push("companyName", "Company name is required");
    }
    if input.website.trim().is_empty() {
        errors.push("website", "Website is required");
    } else if !is_absolute_url(input.website.trim()) {
        errors.push("website", INVALID_URL_MESSAGE);
    }
    if input.product.trim().is_empty() {
        errors.push("product", "Product is required");
    }
    if input.territory.trim().is_empty() {
        errors.push("territory", "Territory is required");
    }

    errors.into_result()
}

fn is_absolute_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}

/// Single-mode dispatcher
pub struct SubmissionGateway {
    mode: SubmissionMode,
    coordinator: Arc<ProgressCoordinator>,
    api: Arc<dyn EnrichmentApi>,
    event_bus: EventBus,
}

impl SubmissionGateway {
    pub fn new(
        mode: SubmissionMode,
        coordinator: Arc<ProgressCoordinator>,
        api: Arc<dyn EnrichmentApi>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            mode,
            coordinator,
            api,
            event_bus,
        }
    }

    pub fn mode(&self) -> SubmissionMode {
        self.mode
    }

    /// Validate and dispatch `request`, returning the reconciled result
    ///
    /// `on_started` receives the bulk job id once the job exists;
    /// `on_progress` receives each accepted progress snapshot. Neither is
    /// called in single-profile mode.
    pub async fn submit<S, P>(
        &self,
        request: SubmissionRequest,
        cancel: &CancellationToken,
        on_started: S,
        on_progress: P,
    ) -> EnrichResult<EnrichmentResult>
    where
        S: FnOnce(uuid::Uuid) + Send,
        P: Fn(&JobProgress) + Send + Sync,
    {
        if request.mode() != self.mode {
            return Err(EnrichError::Conflict(format!(
                "Gateway serves {:?} requests, got {:?}",
                self.mode,
                request.mode()
            )));
        }

        match request {
            SubmissionRequest::Bulk(companies) => {
                validate_bulk(&companies)?;

                let mut job = BulkJob::new(companies);
                debug!(job_id = %job.id, "Bulk request validated");
                on_started(job.id);

                let rows = self.coordinator.run(&mut job, cancel, on_progress).await?;
                Ok(reconcile_bulk(rows))
            }
            SubmissionRequest::SingleProfile(input) => {
                validate_profile(&input)?;

                let profile = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EnrichError::Cancelled),
                    result = self.api.enrich_profile(&input) => result?,
                };

                info!(company = %input.company_name, "Structured profile received");
                self.event_bus.emit_lossy(EnrichEvent::ProfileEnriched {
                    company_name: input.company_name.clone(),
                    timestamp: Utc::now(),
                });
                Ok(reconcile_profile(profile))
            }
        }
    }
}
