//! Despacho Adaptive Field Extractor
//!
//! Schema-driven structured extraction, biased by nearest-neighbor examples
//! of the same document type and hardened against oversized documents
//! (chunking + consolidation) and unparseable model output (raw capture at
//! reduced confidence instead of failure).

#![warn(missing_docs)]

pub mod chunking;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use chunking::{ChunkType, DocumentChunk, TextChunker};
pub use error::{ExtractError, ParseError};
pub use extractor::{AdaptiveExtractor, ExtractorConfig};
pub use schema::{FieldKind, FieldSchema, FieldSpec, SchemaRegistry};
