//! Enrichment session
//!
//! Ties the pipeline stages together for one UI collaborator. The session
//! state is a single tagged value published on a `tokio::sync::watch`
//! channel:
//!
//! ```text
//! Idle → Uploading → Mapping ⇄ (mapping edits) → Enriching → Completed
//!                       │                            │
//!                       └──────── Failed ◄───────────┘
//! ```
//!
//! Validation problems never leave `Mapping`; they are attached to the state
//! so the UI can show them next to the offending field.

use crate::config::ClientConfig;
use crate::error::{EnrichError, EnrichResult, ErrorKind, ValidationErrors};
use crate::models::{
    ColumnMapping, CompanyInput, EnrichmentRequest, EnrichmentResult, JobProgress, MappingField,
    RawRow,
};
use crate::services::channel::{ChannelConnector, WsConnector};
use crate::services::column_inference::infer_column_mapping;
use crate::services::enrichment_api::{EnrichmentApi, HttpEnrichmentApi};
use crate::services::progress_coordinator::ProgressCoordinator;
use crate::services::submission_gateway::{SubmissionGateway, SubmissionMode, SubmissionRequest};
use crate::services::tabular_ingest::{retain_named, TabularData};
use enrichr_common::EventBus;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Uploading {
        file_name: String,
    },
    Mapping {
        file_name: String,
        headers: Vec<String>,
        mapping: ColumnMapping,
        row_count: usize,
        /// Field errors from the last mapping edit or confirmation attempt
        errors: Option<ValidationErrors>,
    },
    Enriching {
        /// Bulk job id once the job exists; `None` for single-profile requests
        job_id: Option<Uuid>,
        progress: JobProgress,
    },
    Completed(EnrichmentResult),
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl SessionState {
    fn failed(error: &EnrichError) -> Self {
        SessionState::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Uploading { .. } | SessionState::Enriching { .. }
        )
    }
}

/// Uploaded file held between parsing and confirmation
struct Upload {
    file_name: String,
    content: Vec<u8>,
    table: TabularData,
    mapping: ColumnMapping,
}

impl Upload {
    fn mapping_state(&self, errors: Option<ValidationErrors>) -> SessionState {
        SessionState::Mapping {
            file_name: self.file_name.clone(),
            headers: self.table.headers().to_vec(),
            mapping: self.mapping.clone(),
            row_count: self.table.row_count(),
            errors,
        }
    }
}

/// One user's upload → mapping → enrichment flow
pub struct EnrichmentSession {
    config: ClientConfig,
    coordinator: Arc<ProgressCoordinator>,
    api: Arc<dyn EnrichmentApi>,
    event_bus: EventBus,
    state_tx: watch::Sender<SessionState>,
    upload: Option<Upload>,
}

impl EnrichmentSession {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn ChannelConnector>,
        api: Arc<dyn EnrichmentApi>,
        event_bus: EventBus,
    ) -> EnrichResult<Self> {
        let coordinator = Arc::new(ProgressCoordinator::from_config(
            &config,
            connector,
            event_bus.clone(),
        )?);
        let (state_tx, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            config,
            coordinator,
            api,
            event_bus,
            state_tx,
            upload: None,
        })
    }

    /// Session against the configured service over WebSocket + HTTP
    pub fn from_config(config: ClientConfig) -> EnrichResult<Self> {
        let api = Arc::new(HttpEnrichmentApi::new(config.clone())?);
        let event_bus = EventBus::new(config.event_capacity);
        Self::new(config, Arc::new(WsConnector), api, event_bus)
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// First `limit` uploaded rows, empty before an upload is parsed
    pub fn preview(&self, limit: usize) -> &[RawRow] {
        match &self.upload {
            Some(upload) => upload.table.preview(limit),
            None => &[],
        }
    }

    /// Mark a file as being read; discards any previous upload
    pub fn begin_upload(&mut self, file_name: &str) {
        self.upload = None;
        self.publish(SessionState::Uploading {
            file_name: file_name.to_string(),
        });
    }

    /// Parse an uploaded file and propose a column mapping
    ///
    /// A malformed file moves the session to `Failed` and nothing is kept.
    pub fn load_table(&mut self, file_name: &str, content: Vec<u8>) -> EnrichResult<()> {
        self.upload = None;
        if !matches!(&*self.state_tx.borrow(), SessionState::Uploading { .. }) {
            self.publish(SessionState::Uploading {
                file_name: file_name.to_string(),
            });
        }

        let table = match TabularData::parse(&content) {
            Ok(table) => table,
            Err(e) => {
                warn!(file = %file_name, "Rejected upload: {}", e);
                self.publish(SessionState::failed(&e));
                return Err(e);
            }
        };

        let mapping = infer_column_mapping(table.headers());
        info!(
            file = %file_name,
            company_name = %mapping.company_name_field,
            website = %mapping.website_field,
            "Proposed column mapping"
        );

        let upload = Upload {
            file_name: file_name.to_string(),
            content,
            table,
            mapping,
        };
        self.publish(upload.mapping_state(None));
        self.upload = Some(upload);
        Ok(())
    }

    /// Override one mapping field; an empty `header` unmaps it
    ///
    /// The edit is always applied; a header not present in the upload is
    /// reported as a field error and blocks confirmation until corrected.
    pub fn set_mapping_field(&mut self, field: MappingField, header: &str) -> EnrichResult<()> {
        let upload = self.mapping_upload()?;
        upload.mapping.set(field, header);

        let checked = upload.mapping.validate(upload.table.headers());
        let errors = checked
            .as_ref()
            .err()
            .and_then(|e| e.validation_errors().cloned());
        let state = upload.mapping_state(errors);
        self.publish(state);
        checked
    }

    /// Confirm the mapping and run the bulk job to completion
    pub async fn confirm_and_enrich(
        &mut self,
        cancel: &CancellationToken,
    ) -> EnrichResult<EnrichmentResult> {
        let requests = self.project_confirmed().await?;

        self.publish(SessionState::Enriching {
            job_id: None,
            progress: JobProgress::default(),
        });

        let gateway = self.gateway(SubmissionMode::Bulk);
        let state_tx = &self.state_tx;
        let outcome = gateway
            .submit(
                SubmissionRequest::Bulk(requests),
                cancel,
                |id| {
                    state_tx.send_modify(|state| {
                        if let SessionState::Enriching { job_id, .. } = state {
                            *job_id = Some(id);
                        }
                    })
                },
                |snapshot| {
                    state_tx.send_modify(|state| {
                        if let SessionState::Enriching { progress, .. } = state {
                            *progress = *snapshot;
                        }
                    })
                },
            )
            .await;

        self.settle(outcome)
    }

    /// Request a structured profile for one company
    pub async fn enrich_profile(
        &mut self,
        input: CompanyInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<EnrichmentResult> {
        let previous = self.state();
        self.publish(SessionState::Enriching {
            job_id: None,
            progress: JobProgress::default(),
        });

        let outcome = self
            .gateway(SubmissionMode::SingleProfile)
            .submit(SubmissionRequest::SingleProfile(input), cancel, |_| {}, |_| {})
            .await;

        if matches!(outcome, Err(EnrichError::Validation(_))) {
            self.publish(previous);
            return outcome;
        }
        self.settle(outcome)
    }

    /// Drop any upload and return to `Idle`
    pub fn reset(&mut self) {
        self.upload = None;
        self.publish(SessionState::Idle);
    }

    fn mapping_upload(&mut self) -> EnrichResult<&mut Upload> {
        let mapping = matches!(&*self.state_tx.borrow(), SessionState::Mapping { .. });
        match self.upload.as_mut() {
            Some(upload) if mapping => Ok(upload),
            _ => Err(EnrichError::Conflict(
                "No uploaded file is awaiting column mapping".to_string(),
            )),
        }
    }

    /// Derive the request list from the confirmed mapping
    ///
    /// Validation failures keep the session in `Mapping` with the errors
    /// attached; other failures move it to `Failed`.
    async fn project_confirmed(&mut self) -> EnrichResult<Vec<EnrichmentRequest>> {
        let api = self.api.clone();
        let server_side = self.config.server_side_projection;
        let upload = self.mapping_upload()?;

        if let Err(e) = upload.mapping.validate_for_projection(upload.table.headers()) {
            let state = upload.mapping_state(e.validation_errors().cloned());
            self.publish(state);
            return Err(e);
        }

        if !server_side {
            return upload.table.project(&upload.mapping);
        }

        debug!(file = %upload.file_name, "Projecting rows on the enrichment service");
        let projected = api
            .upload(&upload.file_name, upload.content.clone(), &upload.mapping)
            .await;
        match projected {
            Ok(requests) => Ok(retain_named(requests)),
            Err(e) => {
                self.upload = None;
                self.publish(SessionState::failed(&e));
                Err(e)
            }
        }
    }

    fn gateway(&self, mode: SubmissionMode) -> SubmissionGateway {
        SubmissionGateway::new(
            mode,
            self.coordinator.clone(),
            self.api.clone(),
            self.event_bus.clone(),
        )
    }

    /// Publish the terminal state for a finished submission
    fn settle(&mut self, outcome: EnrichResult<EnrichmentResult>) -> EnrichResult<EnrichmentResult> {
        match outcome {
            Ok(result) => {
                self.upload = None;
                self.publish(SessionState::Completed(result.clone()));
                Ok(result)
            }
            Err(EnrichError::Validation(errors)) if self.upload.is_some() => {
                // Every row was dropped by projection
                if let Some(upload) = &self.upload {
                    self.publish(upload.mapping_state(Some(errors.clone())));
                }
                Err(EnrichError::Validation(errors))
            }
            Err(e) => {
                self.upload = None;
                self.publish(SessionState::failed(&e));
                Err(e)
            }
        }
    }

    fn publish(&self, state: SessionState) {
        debug!(state = ?state, "Session state changed");
        self.state_tx.send_replace(state);
    }
}
