//! Despacho Vector Index
//!
//! Embedding-based similarity store backing the adaptive classifier and
//! extractor. One **general** collection serves classification lookups; one
//! **per-type** collection serves extraction-example lookups.
//!
//! # Architecture
//!
//! - In-memory HNSW index per collection (cosine distance)
//! - Append-only arena of immutable records keyed by monotonic UUIDv7 ids
//! - JSON-lines journal per collection on disk; replayed on startup
//! - Feedback never mutates a record in place: corrections append a new
//!   verified record and flag the old one as superseded

#![warn(missing_docs)]

pub mod embedding;
pub mod record;
pub mod store;

pub use embedding::{cosine_similarity, EmbeddingError, EmbeddingModel, HashEmbedder, RemoteEmbedder};
pub use record::{RecordId, VectorRecord};
pub use store::{IndexError, Neighbor, VectorStore};
