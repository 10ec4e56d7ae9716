//! Despacho Text-Generation Provider Layer
//!
//! Implementations of the `TextGenerator` trait from `despacho-domain`.
//! The classifier and the field extractor consume these behind an ordered
//! fallback list; construction is always explicit.
//!
//! # Providers
//!
//! - `MockGenerator`: deterministic mock for testing
//! - `ChatCompletionsProvider`: OpenAI-compatible chat-completions API over HTTP

#![warn(missing_docs)]

pub mod chat;

use async_trait::async_trait;
use despacho_domain::traits::{Generation, GenerationError, TextGenerator};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use chat::ChatCompletionsProvider;

/// Deterministic text-generation mock.
///
/// Returns pre-configured responses without network calls. Responses are
/// matched by substring against the prompt, so tests can key on a fragment
/// of document text rather than reproducing whole prompts.
///
/// # Examples
///
/// ```
/// use despacho_llm::MockGenerator;
/// use despacho_domain::traits::TextGenerator;
///
/// # tokio_test::block_on(async {
/// let mut gen = MockGenerator::new("CNH");
/// gen.add_response("agência", "Comprovante Bancário");
///
/// let out = gen.generate("texto com agência e conta", 0.1, 50).await.unwrap();
/// assert_eq!(out.text, "Comprovante Bancário");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockGenerator {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    call_count: Arc<Mutex<usize>>,
    fail_all: bool,
}

impl MockGenerator {
    /// Create a mock that answers every prompt with a fixed response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail_all: false,
        }
    }

    /// Create a mock whose every call fails with a communication error
    pub fn failing() -> Self {
        Self {
            default_response: String::new(),
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail_all: true,
        }
    }

    /// Answer prompts containing `fragment` with `response`.
    ///
    /// Fragments are checked in insertion order; the first match wins.
    pub fn add_response(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((fragment.into(), response.into()));
    }

    /// Number of times `generate` was called (shared across clones)
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Generation, GenerationError> {
        *self.call_count.lock().unwrap() += 1;

        if self.fail_all {
            return Err(GenerationError::Communication("mock failure".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        let text = responses
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(Generation {
            tokens_in: (prompt.len() / 4) as u64,
            tokens_out: (text.len() / 4) as u64,
            cost: 0.0,
            elapsed: Duration::ZERO,
            text,
        })
    }
}

/// Per-1K-token pricing for the models we route to.
///
/// Approximations; used for usage reporting, not billing truth.
pub(crate) fn price_table() -> HashMap<&'static str, (f64, f64)> {
    HashMap::from([
        ("gpt-4o-mini", (0.000_15, 0.000_6)),
        ("gpt-4o", (0.005, 0.015)),
        ("gpt-4-turbo", (0.01, 0.03)),
        ("gpt-3.5-turbo", (0.001, 0.002)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_response() {
        let gen = MockGenerator::new("resposta fixa");
        let out = gen.generate("qualquer prompt", 0.1, 50).await.unwrap();
        assert_eq!(out.text, "resposta fixa");
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_fragment_matching() {
        let mut gen = MockGenerator::new("padrão");
        gen.add_response("pix", "Comprovante Bancário");
        gen.add_response("habilitação", "CNH");

        assert_eq!(
            gen.generate("transferência via pix", 0.1, 50).await.unwrap().text,
            "Comprovante Bancário"
        );
        assert_eq!(
            gen.generate("carteira de habilitação", 0.1, 50).await.unwrap().text,
            "CNH"
        );
        assert_eq!(
            gen.generate("nada conhecido", 0.1, 50).await.unwrap().text,
            "padrão"
        );
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let gen = MockGenerator::failing();
        let result = gen.generate("prompt", 0.1, 50).await;
        assert!(matches!(result, Err(GenerationError::Communication(_))));
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_shared_call_count_across_clones() {
        let gen1 = MockGenerator::new("x");
        let gen2 = gen1.clone();
        gen1.generate("a", 0.0, 1).await.unwrap();
        assert_eq!(gen2.call_count(), 1);
    }
}
