//! Despacho Extraction Provider Layer
//!
//! Implementations of the `ExtractionProvider` trait from `despacho-domain`,
//! the heuristic text-quality scorer, and the fallback orchestrator that
//! decides which provider's output to keep.
//!
//! # Providers
//!
//! - `LocalEngineProvider`: offline extraction (PDF text layer, plain text)
//! - `RemoteOcrProvider`: HTTP OCR service client; one instance per
//!   configured cloud backend
//! - `MockExtractionProvider`: scripted provider for testing fallback logic

#![warn(missing_docs)]

pub mod local;
pub mod orchestrator;
pub mod quality;
pub mod remote;

use async_trait::async_trait;
use despacho_domain::traits::{ExtractionProvider, ProviderError};
use despacho_domain::{ExtractionResult, Quality, RawDocument};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use local::LocalEngineProvider;
pub use orchestrator::{ExtractionFailed, ExtractionOutcome, OrchestratorConfig, ProviderOrchestrator};
pub use quality::{Enrichment, QualityScorer, ScoreWeights};
pub use remote::{RemoteOcrConfig, RemoteOcrProvider};

/// Scripted behavior of a [`MockExtractionProvider`]
#[derive(Debug, Clone)]
enum MockBehavior {
    Succeed { text: String, quality: f64 },
    Fail { error: String },
}

/// Deterministic extraction provider for testing orchestration.
///
/// Always returns the scripted outcome and counts invocations, so tests can
/// assert fallback order ("provider 3 was never called").
#[derive(Debug, Clone)]
pub struct MockExtractionProvider {
    name: String,
    formats: Vec<String>,
    offline: bool,
    behavior: MockBehavior,
    call_count: Arc<Mutex<usize>>,
}

fn default_formats() -> Vec<String> {
    [".pdf", ".txt", ".png", ".jpg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl MockExtractionProvider {
    /// A provider that succeeds with the given text and quality
    pub fn succeeding(name: impl Into<String>, text: impl Into<String>, quality: f64) -> Self {
        Self {
            name: name.into(),
            formats: default_formats(),
            offline: false,
            behavior: MockBehavior::Succeed {
                text: text.into(),
                quality,
            },
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// A provider whose every attempt fails with the given error
    pub fn failing(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formats: default_formats(),
            offline: false,
            behavior: MockBehavior::Fail {
                error: error.into(),
            },
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Restrict the supported formats
    pub fn with_formats(mut self, formats: &[&str]) -> Self {
        self.formats = formats.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Mark this mock as a local/offline provider
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Number of times `extract` was called (shared across clones)
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ExtractionProvider for MockExtractionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_formats(&self) -> &[String] {
        &self.formats
    }

    fn offline(&self) -> bool {
        self.offline
    }

    async fn extract(&self, _document: &RawDocument) -> Result<ExtractionResult, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        match &self.behavior {
            MockBehavior::Succeed { text, quality } => Ok(ExtractionResult::ok(
                text.clone(),
                Quality::new(*quality),
                self.name.clone(),
                Duration::from_millis(1),
                0.0,
            )),
            MockBehavior::Fail { error } => Err(ProviderError::Other(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_succeeding() {
        let provider = MockExtractionProvider::succeeding("mock", "texto", 0.9);
        let doc = RawDocument::new(vec![1], "a.pdf");
        let result = provider.extract(&doc).await.unwrap();
        assert!(result.success);
        assert_eq!(result.quality.value(), 0.9);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let provider = MockExtractionProvider::failing("mock", "sem texto");
        let doc = RawDocument::new(vec![1], "a.pdf");
        assert!(provider.extract(&doc).await.is_err());
    }

    #[test]
    fn test_mock_format_restriction() {
        let provider =
            MockExtractionProvider::succeeding("mock", "t", 0.5).with_formats(&[".png"]);
        assert!(provider.supports(".png"));
        assert!(!provider.supports(".pdf"));
    }
}
