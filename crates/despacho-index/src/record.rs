//! Immutable vector records

use despacho_domain::{Confidence, DocumentType, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stored text prefix length; full documents are not duplicated into the index
pub const TEXT_PREFIX_LEN: usize = 1000;

/// Identifier of a vector record.
///
/// UUIDv7: time-ordered, so ids are monotonic across the append-only arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One immutable entry in a vector collection.
///
/// Records are only ever appended. A human correction produces a *new*
/// verified record; the original is flagged via `superseded_by` and stays in
/// the index (nearest-neighbor voting naturally prefers the verified copy
/// through its higher confidence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record identifier
    pub id: RecordId,

    /// Embedding vector of the source text
    pub embedding: Vec<f32>,

    /// Leading slice of the source text (up to [`TEXT_PREFIX_LEN`] chars)
    pub text_prefix: String,

    /// Document type this record is filed under
    pub document_type: DocumentType,

    /// Structured fields extracted for the document
    pub fields: BTreeMap<String, FieldValue>,

    /// Confidence at insertion time (1.0 for verified feedback)
    pub confidence: Confidence,

    /// Whether a human verified this record's type and fields
    pub verified: bool,

    /// How many times this record was returned as a neighbor
    pub usage_count: u32,

    /// Newer record that supersedes this one, if any
    pub superseded_by: Option<RecordId>,

    /// Insertion time (seconds since the Unix epoch)
    pub created_at: u64,
}

impl VectorRecord {
    /// Build a fresh, unverified record
    pub fn new(
        embedding: Vec<f32>,
        text: &str,
        document_type: DocumentType,
        fields: BTreeMap<String, FieldValue>,
        confidence: Confidence,
    ) -> Self {
        Self {
            id: RecordId::new(),
            embedding,
            text_prefix: truncate_chars(text, TEXT_PREFIX_LEN),
            document_type,
            fields,
            confidence,
            verified: false,
            usage_count: 0,
            superseded_by: None,
            created_at: now_secs(),
        }
    }

    /// Build the verified replacement for `original` after human feedback
    pub fn verified_from(
        original: &VectorRecord,
        correct_type: DocumentType,
        correct_fields: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            embedding: original.embedding.clone(),
            text_prefix: original.text_prefix.clone(),
            document_type: correct_type,
            fields: correct_fields,
            confidence: Confidence::FULL,
            verified: true,
            usage_count: 0,
            superseded_by: None,
            created_at: now_secs(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_monotonic() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert!(a <= b);
    }

    #[test]
    fn test_text_prefix_truncation() {
        let long = "á".repeat(2000);
        let record = VectorRecord::new(
            vec![0.0; 4],
            &long,
            DocumentType::Cnh,
            BTreeMap::new(),
            Confidence::new(0.9),
        );
        assert_eq!(record.text_prefix.chars().count(), TEXT_PREFIX_LEN);
        assert!(!record.verified);
        assert_eq!(record.usage_count, 0);
    }

    #[test]
    fn test_verified_from_resets_provenance() {
        let original = VectorRecord::new(
            vec![0.1; 4],
            "texto original",
            DocumentType::Cnh,
            BTreeMap::new(),
            Confidence::new(0.6),
        );
        let mut fields = BTreeMap::new();
        fields.insert("categoria".to_string(), FieldValue::Text("B".to_string()));

        let corrected =
            VectorRecord::verified_from(&original, DocumentType::ComprovanteBancario, fields);

        assert_ne!(corrected.id, original.id);
        assert_eq!(corrected.embedding, original.embedding);
        assert_eq!(corrected.document_type, DocumentType::ComprovanteBancario);
        assert!(corrected.verified);
        assert_eq!(corrected.confidence, Confidence::FULL);
    }
}
