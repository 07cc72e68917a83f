//! HTTP client for the inference server.

use crate::error::{ClientError, Result};
use crate::types::{GenerateRequest, GenerateResponse};
use core_model::ContextSnapshot;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "http://localhost:1366/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct InferenceClient {
    endpoint: String,
    http: Client,
}

impl InferenceClient {
    pub fn builder() -> InferenceClientBuilder {
        InferenceClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one generate request and decode the answer into a snapshot.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<ContextSnapshot> {
        let start = Instant::now();
        debug!(
            target: "client.http",
            context_len = request.context.len(),
            batch_size = request.batch_size,
            params = request.params.len(),
            "generate_request"
        );
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "client.http", status = status.as_u16(), "generate_status");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let decoded = GenerateResponse::from_value(&value);
        if matches!(decoded, GenerateResponse::Unrecognized) {
            warn!(target: "client.http", body_len = bytes.len(), "generate_response_unrecognized");
        }
        let snapshot = decoded.into_snapshot();
        debug!(
            target: "client.http",
            tokens = snapshot.token_count(),
            attention_rows = snapshot.attention.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generate_response"
        );
        Ok(snapshot)
    }
}

pub struct InferenceClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl Default for InferenceClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceClientBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            timeout: None,
        }
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<InferenceClient> {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(InferenceClient { endpoint, http })
    }
}
