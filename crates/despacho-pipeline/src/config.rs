//! Pipeline configuration

use despacho_classify::ClassifierConfig;
use despacho_extract::ExtractorConfig;
use despacho_providers::{OrchestratorConfig, ScoreWeights};
use serde::{Deserialize, Serialize};

/// Aggregated configuration for one pipeline deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where the vector store journals live
    pub index_dir: String,

    /// Embedding dimension the store is opened with
    pub embedding_dimension: usize,

    /// Quality-scorer weights (tunable, not calibrated constants)
    pub quality_weights: ScoreWeights,

    /// Provider orchestration policy
    pub orchestrator: OrchestratorConfig,

    /// Classifier thresholds
    pub classifier: ClassifierConfig,

    /// Extractor knobs
    pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            index_dir: "./data/vector_store".to_string(),
            embedding_dimension: 384,
            quality_weights: ScoreWeights::default(),
            orchestrator: OrchestratorConfig::default(),
            classifier: ClassifierConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        if self.index_dir.is_empty() {
            return Err("index_dir must not be empty".to_string());
        }
        if self.embedding_dimension == 0 {
            return Err("embedding_dimension must be greater than 0".to_string());
        }
        self.orchestrator.validate()?;
        self.classifier.validate()?;
        self.extractor.validate()?;
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("failed to parse TOML: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("failed to serialize TOML: {e}"))
    }
}
