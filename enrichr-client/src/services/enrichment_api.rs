//! One-shot HTTP endpoints of the enrichment service
//!
//! - `POST /upload` - multipart file + column mapping → projected companies
//! - `POST /icp_enrich` - single company input → structured profile

use crate::config::ClientConfig;
use crate::error::{EnrichError, EnrichResult};
use crate::models::company::text_of;
use crate::models::{ColumnMapping, CompanyInput, EnrichmentRequest, StructuredProfile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

const UPLOAD_PATH: &str = "/upload";
const PROFILE_PATH: &str = "/icp_enrich";
const USER_AGENT: &str = concat!("enrichr/", env!("CARGO_PKG_VERSION"));

/// Longest upstream error body carried into an error message
const MAX_ERROR_CONTEXT: usize = 512;

/// One-shot calls against the enrichment service
#[async_trait]
pub trait EnrichmentApi: Send + Sync {
    /// Upload a delimited file and let the service project it through `mapping`
    async fn upload(
        &self,
        file_name: &str,
        content: Vec<u8>,
        mapping: &ColumnMapping,
    ) -> EnrichResult<Vec<EnrichmentRequest>>;

    /// Request a structured profile for one company
    async fn enrich_profile(&self, input: &CompanyInput) -> EnrichResult<StructuredProfile>;
}

#[derive(Deserialize)]
struct UploadResponse {
    companies: Vec<Map<String, Value>>,
}

/// `/icp_enrich` body; the service reports workflow failures as
/// `{"error": ...}` with a 2xx status
#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    enriched_data: Option<StructuredProfile>,
    #[serde(default)]
    error: Option<Value>,
}

impl ProfileResponse {
    fn into_profile(self, status: u16) -> EnrichResult<StructuredProfile> {
        if let Some(message) = self.error.filter(|e| !e.is_null()) {
            return Err(EnrichError::UpstreamHttp {
                status,
                context: format!("{} failed: {}", PROFILE_PATH, text_of(Some(&message))),
            });
        }
        self.enriched_data.ok_or_else(|| {
            EnrichError::Parse("Invalid profile response: missing enriched_data".to_string())
        })
    }
}

/// reqwest-backed [`EnrichmentApi`]
#[derive(Debug, Clone)]
pub struct HttpEnrichmentApi {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpEnrichmentApi {
    pub fn new(config: ClientConfig) -> EnrichResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EnrichError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Map a non-2xx response to `UpstreamHttp`, keeping a bounded body excerpt
    async fn check_status(
        response: reqwest::Response,
        endpoint: &str,
    ) -> EnrichResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(MAX_ERROR_CONTEXT).collect();
        error!(endpoint = %endpoint, status = status.as_u16(), "Enrichment service returned error");

        Err(EnrichError::UpstreamHttp {
            status: status.as_u16(),
            context: format!("{} failed: {}", endpoint, excerpt),
        })
    }
}

#[async_trait]
impl EnrichmentApi for HttpEnrichmentApi {
    async fn upload(
        &self,
        file_name: &str,
        content: Vec<u8>,
        mapping: &ColumnMapping,
    ) -> EnrichResult<Vec<EnrichmentRequest>> {
        let url = self.config.endpoint(UPLOAD_PATH)?;
        let mapping_json = serde_json::to_string(mapping)
            .map_err(|e| EnrichError::Parse(format!("Failed to encode column mapping: {}", e)))?;

        let file_part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| EnrichError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("file", file_part)
            .text("column_mapping", mapping_json);

        debug!(url = %url, file = %file_name, "Uploading company file");

        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EnrichError::Transport(format!("Upload request failed: {}", e)))?;
        let response = Self::check_status(response, UPLOAD_PATH).await?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Parse(format!("Invalid upload response: {}", e)))?;

        Ok(body
            .companies
            .iter()
            .map(|record| EnrichmentRequest {
                name: text_of(record.get("name")),
                website: text_of(record.get("website")),
            })
            .collect())
    }

    async fn enrich_profile(&self, input: &CompanyInput) -> EnrichResult<StructuredProfile> {
        let url = self.config.endpoint(PROFILE_PATH)?;
        debug!(url = %url, company = %input.company_name, "Requesting structured profile");

        let response = self
            .http_client
            .post(url)
            .json(input)
            .send()
            .await
            .map_err(|e| EnrichError::Transport(format!("Profile request failed: {}", e)))?;
        let response = Self::check_status(response, PROFILE_PATH).await?;
        let status = response.status().as_u16();

        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Parse(format!("Invalid profile response: {}", e)))?;

        let profile = body.into_profile(status);
        if let Err(e) = &profile {
            error!(endpoint = PROFILE_PATH, "Enrichment service reported failure: {}", e);
        }
        profile
    }
}
