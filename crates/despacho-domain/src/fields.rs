//! Structured field extraction outputs

use crate::document::DocumentType;
use crate::score::Confidence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single extracted field value.
///
/// Scalar fields hold one string; list fields accumulate values across
/// chunks during consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A single scalar value
    Text(String),
    /// An ordered list of values
    List(Vec<String>),
}

impl FieldValue {
    /// Character length of the value (sum over entries for lists).
    ///
    /// Used by chunk consolidation's longer-value-wins rule.
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Text(s) => s.len(),
            FieldValue::List(items) => items.iter().map(String::len).sum(),
        }
    }

    /// Whether the value carries no content
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// Which extraction path produced the fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Direct schema-driven extraction, possibly biased by similar examples
    Adaptive,
    /// Per-chunk extraction consolidated across an oversized document
    Chunked,
    /// Degraded path: raw response captured instead of parsed fields
    FallbackBasic,
}

/// Structured fields extracted for one document.
///
/// Fields present in the schema but absent from the model's response are
/// simply absent from the map, so consumers can tell "not found" from
/// "found empty".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// The document type whose schema drove the extraction
    pub document_type: DocumentType,

    /// Extracted values keyed by schema field name
    pub fields: BTreeMap<String, FieldValue>,

    /// Confidence in the extracted values
    pub confidence: Confidence,

    /// Path that produced the values
    pub method: ExtractionMethod,
}

impl ExtractedFields {
    /// Build an empty result for the given type
    pub fn empty(document_type: DocumentType, confidence: Confidence, method: ExtractionMethod) -> Self {
        Self {
            document_type,
            fields: BTreeMap::new(),
            confidence,
            method,
        }
    }

    /// Number of populated fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
