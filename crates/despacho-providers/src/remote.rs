//! Remote OCR provider
//!
//! HTTP client for cloud OCR services exposing a JSON analyze endpoint.
//! The concrete cloud backends differ only in endpoint, credentials, pricing
//! and declared formats, so both fallback slots are instances of this one
//! provider with different configuration. Construction is explicit; an
//! instance without credentials is simply never registered.

use crate::quality::Enrichment;
use async_trait::async_trait;
use despacho_domain::traits::{ExtractionProvider, ProviderError};
use despacho_domain::{ExtractionResult, Quality, RawDocument};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default request timeout for OCR calls (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration of one remote OCR backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOcrConfig {
    /// Stable provider name used in logs and attempt records
    pub name: String,

    /// API base URL
    pub endpoint: String,

    /// Bearer token
    pub api_key: String,

    /// Extensions this backend accepts (lowercased, with dot)
    pub formats: Vec<String>,

    /// Estimated cost per megabyte of input
    pub cost_per_mb: f64,

    /// Quality to report when the service returns no page confidences
    pub default_quality: f64,

    /// Retry attempts per call
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl RemoteOcrConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("remote OCR provider name must not be empty".to_string());
        }
        if self.endpoint.is_empty() {
            return Err(format!("{}: endpoint must not be empty", self.name));
        }
        if !(0.0..=1.0).contains(&self.default_quality) {
            return Err(format!(
                "{}: default_quality must be in [0, 1]",
                self.name
            ));
        }
        Ok(())
    }
}

/// Analyze-endpoint response shape shared by the OCR backends we call
#[derive(Deserialize)]
struct OcrResponse {
    text: String,
    #[serde(default)]
    pages: Vec<OcrPage>,
    #[serde(default)]
    tables: usize,
    #[serde(default)]
    figures: usize,
}

#[derive(Deserialize)]
struct OcrPage {
    #[serde(default)]
    confidence: Option<f64>,
}

/// HTTP OCR client
pub struct RemoteOcrProvider {
    config: RemoteOcrConfig,
    formats: Vec<String>,
    client: reqwest::Client,
}

impl RemoteOcrProvider {
    /// Create a provider from its configuration
    pub fn new(config: RemoteOcrConfig) -> Result<Self, ProviderError> {
        config
            .validate()
            .map_err(ProviderError::Unavailable)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let formats: Vec<String> = config.formats.iter().map(|f| f.to_ascii_lowercase()).collect();

        Ok(Self {
            config,
            formats,
            client,
        })
    }

    fn cost_for(&self, bytes: usize) -> f64 {
        (bytes as f64 / (1024.0 * 1024.0)) * self.config.cost_per_mb
    }

    async fn request_once(&self, document: &RawDocument) -> Result<OcrResponse, ProviderError> {
        let url = format!("{}/v1/analyze", self.config.endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .query(&[("filename", document.file_name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(document.bytes.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                } else {
                    ProviderError::Communication(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Communication(format!(
                "HTTP {status}: {text}"
            )));
        }

        response
            .json::<OcrResponse>()
            .await
            .map_err(|e| ProviderError::Communication(format!("bad payload: {e}")))
    }
}

#[async_trait]
impl ExtractionProvider for RemoteOcrProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supported_formats(&self) -> &[String] {
        &self.formats
    }

    async fn extract(&self, document: &RawDocument) -> Result<ExtractionResult, ProviderError> {
        let started = Instant::now();

        let mut attempts = 0;
        let mut last_error = None;
        let parsed = loop {
            match self.request_once(document).await {
                Ok(parsed) => break parsed,
                Err(e) => {
                    warn!(
                        provider = %self.config.name,
                        attempt = attempts + 1,
                        "OCR attempt failed: {e}"
                    );
                    last_error = Some(e);
                }
            }
            attempts += 1;
            if attempts >= self.config.max_retries {
                return Err(last_error
                    .unwrap_or_else(|| ProviderError::Communication("max retries".to_string())));
            }
            tokio::time::sleep(Duration::from_secs(2u64.pow(attempts - 1))).await;
        };

        // Quality comes from the service's own page confidences when it
        // reports them; otherwise fall back to the configured default.
        let confidences: Vec<f64> = parsed
            .pages
            .iter()
            .filter_map(|p| p.confidence)
            .collect();
        let quality = if confidences.is_empty() {
            Quality::clamped(self.config.default_quality)
        } else {
            Quality::clamped(confidences.iter().sum::<f64>() / confidences.len() as f64)
        };

        let enrichment = Enrichment {
            pages: parsed.pages.len(),
            tables: parsed.tables,
            figures: parsed.figures,
        };

        debug!(
            provider = %self.config.name,
            chars = parsed.text.len(),
            pages = enrichment.pages,
            quality = quality.value(),
            "remote OCR completed"
        );

        Ok(ExtractionResult::ok(
            parsed.text,
            quality,
            self.config.name.clone(),
            started.elapsed(),
            self.cost_for(document.len()),
        )
        .with_metadata("pages", enrichment.pages.to_string())
        .with_metadata("tables", enrichment.tables.to_string())
        .with_metadata("figures", enrichment.figures.to_string()))
    }
}
