//! Three-stage adaptive classification

use crate::keywords::keywords_for;
use crate::prompt::classification_prompt;
use despacho_domain::traits::TextGenerator;
use despacho_domain::{
    ClassificationMethod, ClassificationResult, Confidence, DocumentType,
};
use despacho_index::VectorStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Classifier thresholds and stage parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum confidence for the adaptive stage to terminate the chain
    pub adaptive_threshold: f64,

    /// Neighbors requested from the general collection
    pub neighbors: usize,

    /// Minimum neighbors required before the adaptive stage votes at all
    pub min_neighbors: usize,

    /// Fixed confidence assigned to any non-error LLM answer
    pub llm_confidence: f64,

    /// Sampling temperature for the classification call
    pub temperature: f32,

    /// Completion budget for the classification call (the answer is a label)
    pub max_tokens: u32,

    /// Texts shorter than this skip the adaptive stage (too little signal)
    pub min_text_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            adaptive_threshold: 0.8,
            neighbors: 5,
            min_neighbors: 3,
            llm_confidence: 0.85,
            temperature: 0.1,
            max_tokens: 50,
            min_text_len: 50,
        }
    }
}

impl ClassifierConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.adaptive_threshold) {
            return Err("adaptive_threshold must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.llm_confidence) {
            return Err("llm_confidence must be in [0, 1]".to_string());
        }
        if self.min_neighbors == 0 || self.neighbors < self.min_neighbors {
            return Err("neighbors must be >= min_neighbors >= 1".to_string());
        }
        Ok(())
    }
}

/// The adaptive → LLM → rule-based classification chain
pub struct AdaptiveClassifier {
    index: Arc<VectorStore>,
    generators: Vec<Arc<dyn TextGenerator>>,
    config: ClassifierConfig,
}

impl AdaptiveClassifier {
    /// Build a classifier.
    ///
    /// `generators` is the LLM fallback chain in priority order; it may be
    /// empty, in which case classification goes straight from the adaptive
    /// stage to the keyword rules.
    pub fn new(
        index: Arc<VectorStore>,
        generators: Vec<Arc<dyn TextGenerator>>,
        config: ClassifierConfig,
    ) -> Self {
        Self {
            index,
            generators,
            config,
        }
    }

    /// Classify a document. Never fails: the rule-based stage terminates
    /// every chain, worst case with `Unclassified` at confidence zero.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let cleaned = preprocess(text);

        if cleaned.len() >= self.config.min_text_len {
            if let Some(result) = self.adaptive_stage(&cleaned) {
                info!(
                    document_type = %result.document_type,
                    confidence = result.confidence.value(),
                    "classified by nearest-neighbor vote"
                );
                return result;
            }
        }

        if let Some(result) = self.llm_stage(&cleaned).await {
            info!(
                document_type = %result.document_type,
                method = ?result.method,
                "classified by LLM"
            );
            return result;
        }

        let result = self.rule_stage(&cleaned);
        info!(
            document_type = %result.document_type,
            confidence = result.confidence.value(),
            "classified by keyword rules"
        );
        result
    }

    /// Weighted nearest-neighbor vote over the general collection
    fn adaptive_stage(&self, text: &str) -> Option<ClassificationResult> {
        let neighbors = match self.index.search(text, self.config.neighbors) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!("adaptive stage search failed: {e}");
                return None;
            }
        };

        if neighbors.len() < self.config.min_neighbors {
            debug!(
                found = neighbors.len(),
                needed = self.config.min_neighbors,
                "too few neighbors for adaptive classification"
            );
            return None;
        }

        let mut votes: BTreeMap<DocumentType, f64> = BTreeMap::new();
        let mut similarities = Vec::with_capacity(neighbors.len());
        for neighbor in &neighbors {
            let weight =
                neighbor.similarity as f64 * neighbor.record.confidence.value();
            *votes.entry(neighbor.record.document_type).or_default() += weight;
            similarities.push(neighbor.similarity as f64);
        }

        let (winner, winning_vote) = votes
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(ty, vote)| (*ty, *vote))?;
        let total: f64 = votes.values().sum();
        if total <= 0.0 {
            return None;
        }

        let avg_similarity = similarities.iter().sum::<f64>() / similarities.len() as f64;
        let confidence = ((winning_vote / total) * avg_similarity).min(0.95);

        debug!(
            winner = %winner,
            confidence,
            avg_similarity,
            "adaptive vote computed"
        );

        if confidence < self.config.adaptive_threshold {
            return None;
        }

        let mut result = ClassificationResult::new(
            winner,
            Confidence::clamped(confidence),
            ClassificationMethod::Adaptive,
        );
        result.supporting_records = neighbors
            .iter()
            .map(|n| n.record.id.as_uuid())
            .collect();
        Some(result)
    }

    /// Zero-shot LLM classification, providers tried in declared order
    async fn llm_stage(&self, text: &str) -> Option<ClassificationResult> {
        if self.generators.is_empty() {
            return None;
        }

        let prompt = classification_prompt(text);

        for (i, generator) in self.generators.iter().enumerate() {
            match generator
                .generate(&prompt, self.config.temperature, self.config.max_tokens)
                .await
            {
                Ok(generation) => {
                    let label = generation.text.trim();
                    let document_type = DocumentType::from_label(label);
                    if !document_type.is_known() {
                        warn!(
                            provider = generator.name(),
                            answer = label,
                            "LLM answered with an unknown type label"
                        );
                    }
                    let method = if i == 0 {
                        ClassificationMethod::LlmPrimary
                    } else {
                        ClassificationMethod::LlmFallback
                    };
                    return Some(ClassificationResult::new(
                        document_type,
                        Confidence::clamped(self.config.llm_confidence),
                        method,
                    ));
                }
                Err(e) => {
                    warn!(provider = generator.name(), "LLM classification failed: {e}");
                    continue;
                }
            }
        }

        None
    }

    /// Terminal keyword-matching stage; always produces a result
    fn rule_stage(&self, text: &str) -> ClassificationResult {
        let lowered = text.to_lowercase();

        let mut best: Option<(DocumentType, usize, usize)> = None;
        for ty in DocumentType::known() {
            let keywords = keywords_for(*ty);
            let matched = keywords.iter().filter(|k| lowered.contains(**k)).count();
            if matched == 0 {
                continue;
            }
            let better = match best {
                Some((_, best_matched, _)) => matched > best_matched,
                None => true,
            };
            if better {
                best = Some((*ty, matched, keywords.len()));
            }
        }

        match best {
            Some((ty, matched, total)) => {
                let confidence = (matched as f64 / total as f64).min(0.7);
                ClassificationResult::new(
                    ty,
                    Confidence::clamped(confidence),
                    ClassificationMethod::RuleBased,
                )
            }
            None => ClassificationResult::unclassified(ClassificationMethod::RuleBased),
        }
    }
}

/// Collapse whitespace and drop noise lines before classification
fn preprocess(text: &str) -> String {
    let mut cleaned = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.len() > 3 {
            cleaned.push(line);
        }
    }
    cleaned
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
