//! Pipeline services, leaves first

pub mod channel;
pub mod column_inference;
pub mod enrichment_api;
pub mod progress_coordinator;
pub mod result_reconciler;
pub mod submission_gateway;
pub mod tabular_ingest;

pub use channel::{ChannelConnector, ChannelEvent, DuplexChannel, WsConnector};
pub use column_inference::infer_column_mapping;
pub use enrichment_api::{EnrichmentApi, HttpEnrichmentApi};
pub use progress_coordinator::ProgressCoordinator;
pub use result_reconciler::{reconcile_bulk, reconcile_profile, reconcile_value};
pub use submission_gateway::{
    validate_bulk, validate_profile, SubmissionGateway, SubmissionMode, SubmissionRequest,
};
pub use tabular_ingest::{IngestOptions, TabularData};
