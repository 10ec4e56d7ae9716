//! Local/offline extraction engine
//!
//! Handles formats that can be decoded without a paid service: PDFs with an
//! embedded text layer (via `pdf-extract`) and plain text-ish files. Scanned
//! PDFs have no text layer and fail here, which pushes the orchestrator to a
//! cloud OCR fallback.

use crate::quality::QualityScorer;
use async_trait::async_trait;
use despacho_domain::traits::{ExtractionProvider, ProviderError};
use despacho_domain::{ExtractionResult, RawDocument};
use std::time::Instant;
use tracing::debug;

/// Offline extraction provider; zero cost per document
pub struct LocalEngineProvider {
    scorer: QualityScorer,
    formats: Vec<String>,
}

impl LocalEngineProvider {
    /// Create the provider with the given quality scorer
    pub fn new(scorer: QualityScorer) -> Self {
        Self {
            scorer,
            formats: [".pdf", ".txt", ".md", ".csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for LocalEngineProvider {
    fn default() -> Self {
        Self::new(QualityScorer::default())
    }
}

#[async_trait]
impl ExtractionProvider for LocalEngineProvider {
    fn name(&self) -> &str {
        "local-engine"
    }

    fn supported_formats(&self) -> &[String] {
        &self.formats
    }

    fn offline(&self) -> bool {
        true
    }

    async fn extract(&self, document: &RawDocument) -> Result<ExtractionResult, ProviderError> {
        let started = Instant::now();
        let extension = document.extension();

        let text = match extension.as_str() {
            ".pdf" => pdf_extract::extract_text_from_mem(&document.bytes)
                .map_err(|e| ProviderError::Other(format!("PDF text layer: {e}")))?,
            ".txt" | ".md" | ".csv" => String::from_utf8_lossy(&document.bytes).into_owned(),
            other => return Err(ProviderError::UnsupportedFormat(other.to_string())),
        };

        if text.trim().is_empty() {
            // Scanned or image-only source; let a cloud OCR provider try
            return Err(ProviderError::Other(
                "no text layer in document".to_string(),
            ));
        }

        debug!(
            file = %document.file_name,
            chars = text.len(),
            "local engine decoded text layer"
        );

        let quality = self.scorer.score(&text, None, &extension, true);
        Ok(
            ExtractionResult::ok(text, quality, self.name(), started.elapsed(), 0.0)
                .with_metadata("format", extension)
                .with_metadata("text_layer", "native"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let provider = LocalEngineProvider::default();
        let doc = RawDocument::new(
            "Comprovante de transferência PIX, agência 1234 e conta 5678."
                .as_bytes()
                .to_vec(),
            "comprovante.txt",
        );

        let result = provider.extract(&doc).await.unwrap();
        assert!(result.success);
        assert!(result.text.contains("PIX"));
        assert_eq!(result.cost, 0.0);
        // Native text layer gets the quality floor even for short inputs
        assert!(result.quality.value() >= 0.4);
    }

    #[tokio::test]
    async fn test_empty_payload_fails() {
        let provider = LocalEngineProvider::default();
        let doc = RawDocument::new(b"   ".to_vec(), "vazio.txt");
        let result = provider.extract(&doc).await;
        assert!(matches!(result, Err(ProviderError::Other(_))));
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let provider = LocalEngineProvider::default();
        let doc = RawDocument::new(vec![0xFF, 0xD8], "foto.jpg");
        let result = provider.extract(&doc).await;
        assert!(matches!(result, Err(ProviderError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_malformed_pdf_fails() {
        let provider = LocalEngineProvider::default();
        let doc = RawDocument::new(b"not a pdf at all".to_vec(), "falso.pdf");
        assert!(provider.extract(&doc).await.is_err());
    }

    #[test]
    fn test_supports() {
        let provider = LocalEngineProvider::default();
        assert!(provider.supports(".pdf"));
        assert!(provider.supports(".TXT"));
        assert!(!provider.supports(".png"));
        assert!(provider.offline());
    }
}
