//! Adaptive field extraction

use crate::chunking::TextChunker;
use crate::error::ExtractError;
use crate::parser::{parse_fields, salvage_fields};
use crate::prompt::PromptBuilder;
use crate::schema::{FieldKind, FieldSchema, SchemaRegistry};
use despacho_domain::traits::TextGenerator;
use despacho_domain::{Confidence, DocumentType, ExtractedFields, ExtractionMethod, FieldValue};
use despacho_index::VectorStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Field captured when the model's response cannot be parsed at all
const RAW_CAPTURE_FIELD: &str = "resposta_bruta";

/// Extractor knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Texts longer than this go through chunking + consolidation
    pub chunk_threshold: usize,

    /// Payload budget per chunk
    pub max_chunk_size: usize,

    /// Trailing-context overlap between chunks (chars)
    pub chunk_overlap: usize,

    /// Prompt budget for the direct (non-chunked) path, in chars
    pub prompt_budget: usize,

    /// Similar same-type documents to include as in-prompt examples
    pub examples_k: usize,

    /// Sampling temperature for extraction calls
    pub temperature: f32,

    /// Completion budget for extraction calls
    pub max_tokens: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 8000,
            max_chunk_size: 3000,
            chunk_overlap: 200,
            prompt_budget: 3000,
            examples_k: 3,
            temperature: 0.0,
            max_tokens: 800,
        }
    }
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        if self.max_chunk_size > self.chunk_threshold {
            return Err("max_chunk_size cannot exceed chunk_threshold".to_string());
        }
        if self.prompt_budget == 0 {
            return Err("prompt_budget must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Schema-driven extractor biased by nearest-neighbor examples
pub struct AdaptiveExtractor {
    index: Arc<VectorStore>,
    generator: Arc<dyn TextGenerator>,
    registry: SchemaRegistry,
    chunker: TextChunker,
    config: ExtractorConfig,
}

impl AdaptiveExtractor {
    /// Build an extractor over the given index, generator and schema set
    pub fn new(
        index: Arc<VectorStore>,
        generator: Arc<dyn TextGenerator>,
        registry: SchemaRegistry,
        config: ExtractorConfig,
    ) -> Self {
        let chunker = TextChunker::new(config.max_chunk_size, config.chunk_overlap);
        Self {
            index,
            generator,
            registry,
            chunker,
            config,
        }
    }

    /// Extract structured fields for a classified document.
    ///
    /// The only hard error is `SchemaNotFound`; model failures and
    /// unparseable responses degrade into low-confidence results instead.
    pub async fn extract_fields(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<ExtractedFields, ExtractError> {
        let schema = self
            .registry
            .get(document_type)
            .ok_or(ExtractError::SchemaNotFound(document_type))?;

        if text.len() > self.config.chunk_threshold {
            info!(
                %document_type,
                chars = text.len(),
                "document exceeds chunk threshold, extracting per chunk"
            );
            return Ok(self.extract_chunked(text, schema).await);
        }

        Ok(self.extract_direct(text, schema).await)
    }

    /// Direct path: one prompt, optionally biased by similar examples
    async fn extract_direct(&self, text: &str, schema: &FieldSchema) -> ExtractedFields {
        let document_type = schema.document_type;
        let truncated = truncate_chars(text, self.config.prompt_budget);

        let examples = match self
            .index
            .search_type(&truncated, document_type, self.config.examples_k)
        {
            Ok(neighbors) => neighbors
                .into_iter()
                .filter(|n| n.record.verified)
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!("example lookup failed: {e}");
                Vec::new()
            }
        };
        let used_examples = !examples.is_empty();

        let prompt = PromptBuilder::new(schema, &truncated)
            .with_examples(examples.iter())
            .build();

        let response = match self
            .generator
            .generate(&prompt, self.config.temperature, self.config.max_tokens)
            .await
        {
            Ok(generation) => generation.text,
            Err(e) => {
                warn!(%document_type, "extraction call failed: {e}");
                return ExtractedFields::empty(
                    document_type,
                    Confidence::clamped(0.3),
                    ExtractionMethod::FallbackBasic,
                );
            }
        };

        match parse_fields(&response, schema) {
            Ok(fields) => {
                info!(
                    %document_type,
                    fields = fields.len(),
                    examples = used_examples,
                    "schema parse succeeded"
                );
                ExtractedFields {
                    document_type,
                    fields,
                    confidence: Confidence::clamped(0.85),
                    method: ExtractionMethod::Adaptive,
                }
            }
            Err(parse_error) => {
                debug!("strict parse failed ({parse_error}), salvaging");
                let salvaged = salvage_fields(&response, schema);
                if salvaged.is_empty() {
                    // Raw capture instead of silent data loss
                    let mut fields = BTreeMap::new();
                    fields.insert(
                        RAW_CAPTURE_FIELD.to_string(),
                        FieldValue::Text(response),
                    );
                    ExtractedFields {
                        document_type,
                        fields,
                        confidence: Confidence::clamped(0.25),
                        method: ExtractionMethod::FallbackBasic,
                    }
                } else {
                    let confidence: f64 =
                        0.6 + if used_examples { 0.2 } else { 0.0 } + 0.1;
                    ExtractedFields {
                        document_type,
                        fields: salvaged,
                        confidence: Confidence::clamped(confidence.min(0.95)),
                        method: ExtractionMethod::Adaptive,
                    }
                }
            }
        }
    }

    /// Chunked path: schema-only prompt per chunk, then consolidation
    async fn extract_chunked(&self, text: &str, schema: &FieldSchema) -> ExtractedFields {
        let document_type = schema.document_type;
        let chunks = self.chunker.chunk(text);
        let total = chunks.len();

        let mut per_chunk = Vec::with_capacity(total);
        let mut successful = 0usize;
        for chunk in &chunks {
            let prompt = PromptBuilder::new(schema, &chunk.content).build();
            let fields = match self
                .generator
                .generate(&prompt, self.config.temperature, self.config.max_tokens)
                .await
            {
                Ok(generation) => parse_fields(&generation.text, schema)
                    .unwrap_or_else(|_| salvage_fields(&generation.text, schema)),
                Err(e) => {
                    warn!(chunk = chunk.index, "chunk extraction failed: {e}");
                    BTreeMap::new()
                }
            };
            if !fields.is_empty() {
                successful += 1;
            }
            debug!(chunk = chunk.index, fields = fields.len(), "chunk extracted");
            per_chunk.push(fields);
        }

        let fields = consolidate_fields(schema, &per_chunk);
        let confidence = if total == 0 {
            0.0
        } else {
            (successful as f64 / total as f64).min(0.9)
        };

        info!(
            %document_type,
            chunks = total,
            successful,
            fields = fields.len(),
            "chunked extraction consolidated"
        );

        ExtractedFields {
            document_type,
            fields,
            confidence: Confidence::clamped(confidence),
            method: ExtractionMethod::Chunked,
        }
    }
}

/// Merge per-chunk field maps.
///
/// List fields concatenate across chunks. Scalar fields keep the first
/// non-empty value in chunk order; when a later chunk disagrees, the
/// strictly longer value wins. The longer-wins rule is a heuristic (more
/// detail tends to be the more complete capture), not a correctness
/// guarantee.
pub fn consolidate_fields(
    schema: &FieldSchema,
    per_chunk: &[BTreeMap<String, FieldValue>],
) -> BTreeMap<String, FieldValue> {
    let mut merged: BTreeMap<String, FieldValue> = BTreeMap::new();

    for chunk_fields in per_chunk {
        for (name, value) in chunk_fields {
            let Some(spec) = schema.field(name) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match spec.kind {
                FieldKind::List => {
                    let entry = merged
                        .entry(name.clone())
                        .or_insert_with(|| FieldValue::List(Vec::new()));
                    if let FieldValue::List(items) = entry {
                        match value {
                            FieldValue::List(new_items) => items.extend(new_items.clone()),
                            FieldValue::Text(s) => items.push(s.clone()),
                        }
                    }
                }
                FieldKind::Scalar => match merged.get(name) {
                    None => {
                        merged.insert(name.clone(), value.clone());
                    }
                    Some(existing) if existing != value && value.len() > existing.len() => {
                        merged.insert(name.clone(), value.clone());
                    }
                    Some(_) => {}
                },
            }
        }
    }

    merged
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
