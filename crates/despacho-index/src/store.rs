//! Append-only vector collections with on-disk journals
//!
//! Two logical collections per deployment: the **general** collection (all
//! types, used by the classifier) and one collection **per document type**
//! (used by the extractor for in-prompt examples). Each collection pairs an
//! in-memory HNSW index with an append-only JSON-lines journal; startup
//! replays the journal to rebuild the index.
//!
//! Writes are serialized per collection (single writer); searches take the
//! read side and only briefly upgrade to bump usage counters.

use crate::embedding::{EmbeddingError, EmbeddingModel};
use crate::record::{RecordId, VectorRecord};
use despacho_domain::{Confidence, DocumentType, FieldValue};
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// HNSW parameters; sized for hundreds of thousands of records
const HNSW_M: usize = 16;
const HNSW_EF_CONSTRUCTION: usize = 200;
const HNSW_EF_SEARCH: usize = 64;
const HNSW_MAX_ELEMENTS: usize = 1_000_000;

/// Errors that can occur during vector store operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Embedding generation failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Journal I/O failure
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Journal entry could not be (de)serialized
    #[error("journal entry error: {0}")]
    Journal(#[from] serde_json::Error),

    /// Embedding dimension does not match the store
    #[error("invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was opened with
        expected: usize,
        /// Dimension provided
        actual: usize,
    },

    /// Record id not present in the general collection
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The `Unclassified` sentinel cannot be indexed
    #[error("cannot index a record without a known document type")]
    UnclassifiedRecord,
}

/// A search hit: the record plus its similarity to the query
#[derive(Debug, Clone)]
pub struct Neighbor {
    /// The stored record (snapshot at search time)
    pub record: VectorRecord,

    /// Cosine similarity to the query, higher is closer
    pub similarity: f32,
}

/// Journal entries; one JSON object per line, append-only
#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Add(Box<VectorRecord>),
    Supersede { id: RecordId, by: RecordId },
}

/// One collection: HNSW index + record arena + journal
struct Collection {
    name: String,
    hnsw: Hnsw<'static, f32, DistCosine>,
    records: Vec<VectorRecord>,
    index_of: HashMap<RecordId, usize>,
    journal_path: PathBuf,
}

impl Collection {
    fn open(name: &str, journal_path: PathBuf) -> Result<Self, IndexError> {
        let nb_layer = 16.min((HNSW_MAX_ELEMENTS as f32).ln().trunc() as usize);
        let hnsw = Hnsw::<'static, f32, DistCosine>::new(
            HNSW_M,
            HNSW_MAX_ELEMENTS,
            nb_layer,
            HNSW_EF_CONSTRUCTION,
            DistCosine {},
        );

        let mut collection = Self {
            name: name.to_string(),
            hnsw,
            records: Vec::new(),
            index_of: HashMap::new(),
            journal_path,
        };
        collection.replay()?;
        Ok(collection)
    }

    /// Rebuild the in-memory state from the journal
    fn replay(&mut self) -> Result<(), IndexError> {
        if !self.journal_path.exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&self.journal_path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(&line)? {
                JournalEntry::Add(record) => self.attach(*record),
                JournalEntry::Supersede { id, by } => {
                    if let Some(&idx) = self.index_of.get(&id) {
                        self.records[idx].superseded_by = Some(by);
                    }
                }
            }
        }

        debug!(
            collection = %self.name,
            records = self.records.len(),
            "journal replayed"
        );
        Ok(())
    }

    /// Insert into the in-memory structures only
    fn attach(&mut self, record: VectorRecord) {
        let internal_id = self.records.len();
        self.hnsw.insert((&record.embedding, internal_id));
        self.index_of.insert(record.id, internal_id);
        self.records.push(record);
    }

    fn append_journal(&self, entry: &JournalEntry) -> Result<(), IndexError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Append a record: journal first, then in-memory attach
    fn insert(&mut self, record: VectorRecord) -> Result<(), IndexError> {
        self.append_journal(&JournalEntry::Add(Box::new(record.clone())))?;
        self.attach(record);
        Ok(())
    }

    fn supersede(&mut self, id: RecordId, by: RecordId) -> Result<(), IndexError> {
        if let Some(&idx) = self.index_of.get(&id) {
            self.append_journal(&JournalEntry::Supersede { id, by })?;
            self.records[idx].superseded_by = Some(by);
        }
        Ok(())
    }

    fn knn(&self, query: &[f32], k: usize) -> Vec<(RecordId, f32)> {
        if self.records.is_empty() {
            return Vec::new();
        }
        self.hnsw
            .search(query, k, HNSW_EF_SEARCH)
            .into_iter()
            .filter_map(|n| {
                self.records
                    .get(n.d_id)
                    .map(|r| (r.id, 1.0 - n.distance))
            })
            .collect()
    }

    fn get(&self, id: &RecordId) -> Option<&VectorRecord> {
        self.index_of.get(id).map(|&idx| &self.records[idx])
    }

    fn bump_usage(&mut self, id: &RecordId) {
        if let Some(&idx) = self.index_of.get(id) {
            self.records[idx].usage_count += 1;
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// The adaptive pipeline's shared similarity store.
///
/// Thread-safe: collections sit behind `RwLock`s, so searches across
/// documents run concurrently while writes stay single-writer per
/// collection. `add` and `update_with_feedback` are atomic single-record
/// appends — an abandoned pipeline never leaves a partial record behind.
pub struct VectorStore {
    embedder: Arc<dyn EmbeddingModel>,
    general: RwLock<Collection>,
    by_type: BTreeMap<DocumentType, RwLock<Collection>>,
}

impl VectorStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// One journal file per collection lives under the root; existing
    /// journals are replayed.
    pub fn open(
        dir: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, IndexError> {
        let root = dir.as_ref();
        fs::create_dir_all(root)?;

        let general = Collection::open("general", root.join("general.jsonl"))?;

        let mut by_type = BTreeMap::new();
        for ty in DocumentType::known() {
            let slug = type_slug(*ty);
            let collection = Collection::open(&slug, root.join(format!("{slug}.jsonl")))?;
            by_type.insert(*ty, RwLock::new(collection));
        }

        info!(
            root = %root.display(),
            records = general.len(),
            "vector store opened"
        );

        Ok(Self {
            embedder,
            general: RwLock::new(general),
            by_type,
        })
    }

    /// Embed `text` and insert a record into the general collection and the
    /// matching per-type collection. Returns the new record's id.
    pub fn add(
        &self,
        text: &str,
        document_type: DocumentType,
        fields: BTreeMap<String, FieldValue>,
        confidence: Confidence,
    ) -> Result<RecordId, IndexError> {
        if !document_type.is_known() {
            return Err(IndexError::UnclassifiedRecord);
        }

        let embedding = self.embed(text)?;
        let record = VectorRecord::new(embedding, text, document_type, fields, confidence);
        let id = record.id;

        self.general.write().unwrap().insert(record.clone())?;
        if let Some(lock) = self.by_type.get(&document_type) {
            lock.write().unwrap().insert(record)?;
        }

        debug!(%id, %document_type, "record added to vector store");
        Ok(id)
    }

    /// Nearest neighbors in the general collection (classification lookups)
    pub fn search(&self, text: &str, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let query = self.embed(text)?;
        Ok(self.search_collection(&self.general, &query, k))
    }

    /// Nearest neighbors of the same document type (extraction examples)
    pub fn search_type(
        &self,
        text: &str,
        document_type: DocumentType,
        k: usize,
    ) -> Result<Vec<Neighbor>, IndexError> {
        let Some(lock) = self.by_type.get(&document_type) else {
            return Ok(Vec::new());
        };
        let query = self.embed(text)?;
        Ok(self.search_collection(lock, &query, k))
    }

    /// Apply a human correction to an existing record.
    ///
    /// A new verified record (confidence 1.0) is appended to the general
    /// collection and to the *correct* type's collection; the original is
    /// flagged as superseded wherever it appears, never deleted. Repeating
    /// the same feedback appends another verified copy — the observable
    /// state (`verified = true`, confidence 1.0) does not drift.
    pub fn update_with_feedback(
        &self,
        id: RecordId,
        correct_type: DocumentType,
        correct_fields: BTreeMap<String, FieldValue>,
    ) -> Result<RecordId, IndexError> {
        if !correct_type.is_known() {
            return Err(IndexError::UnclassifiedRecord);
        }

        let (original, previous_type) = {
            let general = self.general.read().unwrap();
            let record = general.get(&id).ok_or(IndexError::NotFound(id))?;
            (record.clone(), record.document_type)
        };

        let corrected = VectorRecord::verified_from(&original, correct_type, correct_fields);
        let corrected_id = corrected.id;

        {
            let mut general = self.general.write().unwrap();
            general.insert(corrected.clone())?;
            general.supersede(id, corrected_id)?;
        }

        if let Some(lock) = self.by_type.get(&correct_type) {
            lock.write().unwrap().insert(corrected)?;
        }
        if previous_type != correct_type {
            if let Some(lock) = self.by_type.get(&previous_type) {
                lock.write().unwrap().supersede(id, corrected_id)?;
            }
        }

        info!(
            original = %id,
            corrected = %corrected_id,
            from = %previous_type,
            to = %correct_type,
            "feedback applied"
        );
        Ok(corrected_id)
    }

    /// Fetch a record snapshot from the general collection
    pub fn get(&self, id: RecordId) -> Option<VectorRecord> {
        self.general.read().unwrap().get(&id).cloned()
    }

    /// Number of records in the general collection
    pub fn len(&self) -> usize {
        self.general.read().unwrap().len()
    }

    /// Whether the general collection is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records filed under the given type
    pub fn len_for_type(&self, document_type: DocumentType) -> usize {
        self.by_type
            .get(&document_type)
            .map(|lock| lock.read().unwrap().len())
            .unwrap_or(0)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let embedding = self.embedder.embed(text)?;
        if embedding.len() != self.embedder.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn search_collection(
        &self,
        lock: &RwLock<Collection>,
        query: &[f32],
        k: usize,
    ) -> Vec<Neighbor> {
        let hits = {
            let collection = lock.read().unwrap();
            collection.knn(query, k)
        };

        if hits.is_empty() {
            return Vec::new();
        }

        // Usage counters are advisory; bump them in a short write section
        // (in memory only, like the rest of the per-search bookkeeping).
        let mut collection = lock.write().unwrap();
        let mut neighbors = Vec::with_capacity(hits.len());
        for (id, similarity) in hits {
            collection.bump_usage(&id);
            if let Some(record) = collection.get(&id) {
                neighbors.push(Neighbor {
                    record: record.clone(),
                    similarity,
                });
            } else {
                warn!(%id, "search hit vanished from collection");
            }
        }
        neighbors.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        neighbors
    }
}

/// File-name slug for a type collection ("Comprovante Bancário" -> "comprovante_bancario")
fn type_slug(ty: DocumentType) -> String {
    ty.label()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            'á' | 'à' | 'â' | 'ã' => Some('a'),
            'é' | 'ê' => Some('e'),
            'í' => Some('i'),
            'ó' | 'ô' | 'õ' => Some('o'),
            'ú' => Some('u'),
            'ç' => Some('c'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            'Á' | 'À' | 'Â' | 'Ã' => Some('a'),
            'É' | 'Ê' => Some('e'),
            'Í' => Some('i'),
            'Ó' | 'Ô' | 'Õ' => Some('o'),
            'Ú' => Some('u'),
            'Ç' => Some('c'),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> VectorStore {
        VectorStore::open(dir.path(), Arc::new(HashEmbedder::new(128))).unwrap()
    }

    fn cnh_fields() -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert(
            "nome_completo".to_string(),
            FieldValue::Text("João da Silva".to_string()),
        );
        fields
    }

    #[test]
    fn test_add_and_search() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store
            .add(
                "carteira nacional de habilitação categoria B",
                DocumentType::Cnh,
                cnh_fields(),
                Confidence::new(0.9),
            )
            .unwrap();
        store
            .add(
                "comprovante de transferência pix agência conta",
                DocumentType::ComprovanteBancario,
                BTreeMap::new(),
                Confidence::new(0.8),
            )
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.len_for_type(DocumentType::Cnh), 1);

        let hits = store
            .search("carteira de habilitação categoria B", 2)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.document_type, DocumentType::Cnh);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_search_type_scopes_to_collection() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store
            .add(
                "matrícula cei da obra inss",
                DocumentType::CeiObra,
                BTreeMap::new(),
                Confidence::new(0.9),
            )
            .unwrap();

        let hits = store
            .search_type("matrícula cei obra", DocumentType::Cnh, 3)
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .search_type("matrícula cei obra", DocumentType::CeiObra, 3)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_rejects_unclassified() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let result = store.add(
            "texto",
            DocumentType::Unclassified,
            BTreeMap::new(),
            Confidence::ZERO,
        );
        assert!(matches!(result, Err(IndexError::UnclassifiedRecord)));
    }

    #[test]
    fn test_feedback_supersedes_without_deleting() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let id = store
            .add(
                "documento ambíguo com agência e conta",
                DocumentType::Cnh,
                BTreeMap::new(),
                Confidence::new(0.5),
            )
            .unwrap();

        let corrected_id = store
            .update_with_feedback(id, DocumentType::ComprovanteBancario, BTreeMap::new())
            .unwrap();

        // Original remains, flagged; corrected copy is verified at 1.0
        let original = store.get(id).unwrap();
        assert_eq!(original.superseded_by, Some(corrected_id));

        let corrected = store.get(corrected_id).unwrap();
        assert!(corrected.verified);
        assert_eq!(corrected.confidence, Confidence::FULL);
        assert_eq!(
            corrected.document_type,
            DocumentType::ComprovanteBancario
        );
        assert_eq!(store.len_for_type(DocumentType::ComprovanteBancario), 1);
    }

    #[test]
    fn test_feedback_is_idempotent_in_effect() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let id = store
            .add(
                "fatura telefônica operadora minutos",
                DocumentType::FaturaTelefonica,
                BTreeMap::new(),
                Confidence::new(0.7),
            )
            .unwrap();

        let first = store
            .update_with_feedback(id, DocumentType::FaturaTelefonica, BTreeMap::new())
            .unwrap();
        let second = store
            .update_with_feedback(id, DocumentType::FaturaTelefonica, BTreeMap::new())
            .unwrap();

        for corrected_id in [first, second] {
            let record = store.get(corrected_id).unwrap();
            assert!(record.verified);
            assert_eq!(record.confidence, Confidence::FULL);
        }
    }

    #[test]
    fn test_feedback_unknown_record() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let result =
            store.update_with_feedback(RecordId::new(), DocumentType::Cnh, BTreeMap::new());
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[test]
    fn test_journal_replay_restores_state() {
        let dir = TempDir::new().unwrap();
        let id;
        let corrected_id;
        {
            let store = open_store(&dir);
            id = store
                .add(
                    "contrato social sociedade capital social sócios",
                    DocumentType::ContratoSocial,
                    BTreeMap::new(),
                    Confidence::new(0.8),
                )
                .unwrap();
            corrected_id = store
                .update_with_feedback(id, DocumentType::ContratoSocial, BTreeMap::new())
                .unwrap();
        }

        // Reopen: journal replay must restore records and supersede links
        let store = open_store(&dir);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(id).unwrap().superseded_by, Some(corrected_id));
        assert!(store.get(corrected_id).unwrap().verified);

        let hits = store.search("contrato social capital", 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_bumps_usage_count() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let id = store
            .add(
                "alvará municipal licença funcionamento",
                DocumentType::AlvaraMunicipal,
                BTreeMap::new(),
                Confidence::new(0.9),
            )
            .unwrap();

        store.search("alvará municipal", 1).unwrap();
        store.search("licença de funcionamento", 1).unwrap();
        assert_eq!(store.get(id).unwrap().usage_count, 2);
    }

    #[test]
    fn test_type_slug() {
        assert_eq!(
            type_slug(DocumentType::ComprovanteBancario),
            "comprovante_bancario"
        );
        assert_eq!(type_slug(DocumentType::Cnh), "cnh");
        assert_eq!(
            type_slug(DocumentType::NotaFiscalServico),
            "nota_fiscal_de_servicos_eletronica"
        );
    }
}
