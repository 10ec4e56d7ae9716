//! Text-extraction attempt results

use crate::score::Quality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The outcome of a single provider's attempt to turn bytes into text.
///
/// The orchestrator produces one of these per attempt and keeps the best
/// result seen before returning.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted plain text (possibly markdown-flavoured)
    pub text: String,

    /// Heuristic quality score of the extracted text
    pub quality: Quality,

    /// Name of the provider that produced this result
    pub provider: String,

    /// Wall-clock time the attempt took
    pub elapsed: Duration,

    /// Estimated cost of the attempt (local providers report 0.0)
    pub cost: f64,

    /// Whether the provider considered the attempt successful
    pub success: bool,

    /// Provider-reported failure reason, when `success` is false
    pub error: Option<String>,

    /// Free-form provider metadata (page counts, detected tables, ...)
    pub metadata: BTreeMap<String, String>,
}

impl ExtractionResult {
    /// Build a successful result
    pub fn ok(
        text: impl Into<String>,
        quality: Quality,
        provider: impl Into<String>,
        elapsed: Duration,
        cost: f64,
    ) -> Self {
        Self {
            text: text.into(),
            quality,
            provider: provider.into(),
            elapsed,
            cost,
            success: true,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Build a failed result carrying the provider's error message
    pub fn failed(provider: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            quality: Quality::ZERO,
            provider: provider.into(),
            elapsed,
            cost: 0.0,
            success: false,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One entry in the orchestrator's attempt history.
///
/// Carried inside the terminal extraction error so callers can see every
/// provider that was tried and why each one was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Provider name
    pub provider: String,

    /// Time spent on the attempt
    pub elapsed: Duration,

    /// Quality reached, when the attempt produced text at all
    pub quality: Option<f64>,

    /// Failure reason, when the attempt produced nothing usable
    pub error: Option<String>,
}

impl AttemptRecord {
    /// Record an attempt that produced scored text
    pub fn scored(provider: impl Into<String>, elapsed: Duration, quality: Quality) -> Self {
        Self {
            provider: provider.into(),
            elapsed,
            quality: Some(quality.value()),
            error: None,
        }
    }

    /// Record an attempt that failed outright
    pub fn failure(provider: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            elapsed,
            quality: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_result() {
        let r = ExtractionResult::ok(
            "texto",
            Quality::new(0.8),
            "local",
            Duration::from_millis(5),
            0.0,
        );
        assert!(r.success);
        assert!(r.error.is_none());
        assert_eq!(r.quality.value(), 0.8);
    }

    #[test]
    fn test_failed_result() {
        let r = ExtractionResult::failed("ocr-a", Duration::from_secs(1), "timeout");
        assert!(!r.success);
        assert_eq!(r.quality.value(), 0.0);
        assert_eq!(r.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_metadata_builder() {
        let r = ExtractionResult::ok("t", Quality::new(0.5), "p", Duration::ZERO, 0.0)
            .with_metadata("pages", "3");
        assert_eq!(r.metadata.get("pages").map(String::as_str), Some("3"));
    }
}
