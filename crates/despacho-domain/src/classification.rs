//! Classification outcomes

use crate::document::DocumentType;
use crate::score::Confidence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which stage of the classifier produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationMethod {
    /// Nearest-neighbor vote over previously seen documents
    Adaptive,
    /// First configured text-generation provider
    LlmPrimary,
    /// Any later text-generation provider in the fallback chain
    LlmFallback,
    /// Terminal keyword-table stage
    RuleBased,
    /// Unexpected internal failure; type is `Unclassified`
    Error,
}

/// Result of classifying one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Resolved document type, or the `Unclassified` sentinel
    pub document_type: DocumentType,

    /// Confidence in the resolved type
    pub confidence: Confidence,

    /// Stage that produced the result
    pub method: ClassificationMethod,

    /// Vector records that supported an adaptive decision (empty otherwise)
    pub supporting_records: Vec<Uuid>,
}

impl ClassificationResult {
    /// Build a result with no supporting neighbor records
    pub fn new(
        document_type: DocumentType,
        confidence: Confidence,
        method: ClassificationMethod,
    ) -> Self {
        Self {
            document_type,
            confidence,
            method,
            supporting_records: Vec::new(),
        }
    }

    /// The terminal "nothing matched" result
    pub fn unclassified(method: ClassificationMethod) -> Self {
        Self::new(DocumentType::Unclassified, Confidence::ZERO, method)
    }
}
