//! Trait definitions for provider seams
//!
//! These traits define the boundaries between the pipeline and its pluggable
//! backends. Implementations live in the infrastructure crates
//! (`despacho-providers`, `despacho-llm`).

use crate::document::RawDocument;
use crate::extraction::ExtractionResult;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors a single extraction-provider attempt can surface.
///
/// Fallback is driven by the orchestrator inspecting these results; a
/// provider error never propagates past the orchestrator on its own.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider exists but is not usable (missing credentials, engine absent)
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The attempt exceeded the configured per-provider timeout
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    /// The provider does not handle this file format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Network or API communication failure
    #[error("communication error: {0}")]
    Communication(String),

    /// Anything else
    #[error("provider error: {0}")]
    Other(String),
}

/// A pluggable backend that turns raw document bytes into text.
///
/// Implementations are constructed explicitly and registered into an ordered
/// list at startup; there is no runtime discovery.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Stable provider name used in logs and attempt records
    fn name(&self) -> &str;

    /// File extensions (lowercased, with dot) this provider handles
    fn supported_formats(&self) -> &[String];

    /// Whether this provider runs locally, without paid network calls.
    ///
    /// The orchestrator tries offline providers first unless the format is
    /// on the prefer-cloud list.
    fn offline(&self) -> bool {
        false
    }

    /// Whether the provider handles the given extension
    fn supports(&self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        self.supported_formats().iter().any(|f| *f == ext)
    }

    /// Extract text from the document
    async fn extract(&self, document: &RawDocument) -> Result<ExtractionResult, ProviderError>;
}

/// Errors a text-generation call can surface
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Network or API communication error
    #[error("communication error: {0}")]
    Communication(String),

    /// The provider answered but the payload was not usable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimited,

    /// Requested model is not available
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider is not configured (missing key or endpoint)
    #[error("provider not configured: {0}")]
    Unconfigured(String),

    /// Anything else
    #[error("generation error: {0}")]
    Other(String),
}

/// One completed text-generation call
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated text
    pub text: String,

    /// Prompt tokens consumed (estimated when the API does not report usage)
    pub tokens_in: u64,

    /// Completion tokens produced
    pub tokens_out: u64,

    /// Estimated cost of the call
    pub cost: f64,

    /// Wall-clock time of the call
    pub elapsed: Duration,
}

/// A pluggable text-generation backend (LLM).
///
/// Used by the classifier's zero-shot stage and by the field extractor.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Stable provider name used in logs
    fn name(&self) -> &str;

    /// Model identifier the provider will invoke
    fn model(&self) -> &str;

    /// Generate a completion for the prompt
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Generation, GenerationError>;
}
