//! HTTP client for the ENTSO-E transparency platform.
//!
//! Wraps a shared [`reqwest::Client`] with:
//! - query building for the generation and physical-flow documents
//! - retry logic with exponential backoff for transient failures
//! - mapping of the platform's "No matching data found" 400 response to
//!   [`EntsoeError::NoMatchingDataFound`]
//! - token redaction in all logged URLs

use crate::entsoe::types::{Area, GenerationResponse, PhysicalFlowResponse, TimeInterval};
use crate::entsoe::{EntsoeClient, EntsoeError, EntsoeResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default API endpoint of the transparency platform.
const DEFAULT_API_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Document type for actual generation per production type.
const DOCUMENT_TYPE_ACTUAL_GENERATION_PER_TYPE: &str = "A75";

/// Document type for the aggregated energy data report (physical flows).
const DOCUMENT_TYPE_AGGREGATED_ENERGY_DATA_REPORT: &str = "A11";

/// Process type for realised values.
const PROCESS_TYPE_REALISED: &str = "A16";

/// Maximum number of retries for failed requests.
/// 5 retries with exponential backoff rides out transient network issues
/// without stalling a stuck run for more than about a minute.
const MAX_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Calculate exponential backoff delay for a retry attempt (0-indexed).
fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS
        .saturating_mul(2u64.saturating_pow(retry_count))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// HTTP implementation of [`EntsoeClient`].
pub struct EntsoeHttpClient {
    client: reqwest::Client,
    base_url: String,
    security_token: String,
}

impl EntsoeHttpClient {
    /// Create a new client for the default endpoint.
    ///
    /// # Errors
    /// Returns [`EntsoeError::MissingToken`] when `security_token` is empty.
    pub fn new(security_token: impl Into<String>) -> EntsoeResult<Self> {
        let security_token = security_token.into();
        if security_token.is_empty() {
            return Err(EntsoeError::MissingToken);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            security_token,
        })
    }

    /// Override the API endpoint. Used to point tests at a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Execute a GET against the platform and deserialize the XML body.
    ///
    /// Retries network errors, 429s, and 5xx responses with exponential
    /// backoff. A 400 whose body contains "No matching data found" is the
    /// platform's way of saying the window holds nothing and maps to
    /// [`EntsoeError::NoMatchingDataFound`] without retrying.
    async fn get_document<T>(&self, params: &[(&str, String)]) -> EntsoeResult<T>
    where
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            let response = match self
                .client
                .get(&self.base_url)
                .query(&[("securityToken", self.security_token.as_str())])
                .query(params)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = MAX_RETRIES + 1,
                        error = %e,
                        "Network error while querying the transparency platform"
                    );
                    last_error = Some(EntsoeError::Network(redact(&e.to_string(), &self.security_token)));
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = Some(EntsoeError::Network(redact(&e.to_string(), &self.security_token)));
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            if status.is_success() {
                return quick_xml::de::from_str(&body)
                    .map_err(|e| EntsoeError::Parse(e.to_string()));
            }

            debug!(status = status.as_u16(), body_len = body.len(), "Non-success response");

            if status.as_u16() == 400 && body.contains("No matching data found") {
                return Err(EntsoeError::NoMatchingDataFound);
            }

            if status.as_u16() == 429 || status.is_server_error() {
                warn!(
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES + 1,
                    status = status.as_u16(),
                    "Retryable status from the transparency platform"
                );
                last_error = Some(EntsoeError::UnexpectedStatus {
                    status: status.as_u16(),
                });
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(calculate_backoff(attempt)).await;
                    continue;
                }
                break;
            }

            return Err(EntsoeError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        Err(last_error.unwrap_or(EntsoeError::Network("retries exhausted".to_string())))
    }
}

/// Replace the security token wherever it leaked into a message.
fn redact(message: &str, token: &str) -> String {
    message.replace(token, "***")
}

#[async_trait]
impl EntsoeClient for EntsoeHttpClient {
    async fn get_aggregated_generation_per_type(
        &self,
        area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<GenerationResponse> {
        info!(
            area = %area,
            interval = %time_interval.format_as_parameter(),
            "Getting aggregated generation per type"
        );

        let params = [
            (
                "documentType",
                DOCUMENT_TYPE_ACTUAL_GENERATION_PER_TYPE.to_string(),
            ),
            ("processType", PROCESS_TYPE_REALISED.to_string()),
            ("in_Domain", area.as_eic_code().to_string()),
            ("timeInterval", time_interval.format_as_parameter()),
        ];

        self.get_document(&params).await
    }

    async fn get_physical_cross_border_flow(
        &self,
        in_area: Area,
        out_area: Area,
        time_interval: &TimeInterval,
    ) -> EntsoeResult<PhysicalFlowResponse> {
        info!(
            in_area = %in_area,
            out_area = %out_area,
            interval = %time_interval.format_as_parameter(),
            "Getting physical cross-border flow"
        );

        let params = [
            (
                "documentType",
                DOCUMENT_TYPE_AGGREGATED_ENERGY_DATA_REPORT.to_string(),
            ),
            ("in_Domain", in_area.as_eic_code().to_string()),
            ("out_Domain", out_area.as_eic_code().to_string()),
            ("timeInterval", time_interval.format_as_parameter()),
        ];

        self.get_document(&params).await
    }
}
