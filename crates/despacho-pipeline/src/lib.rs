//! Despacho Document Pipeline
//!
//! Wires the stages together: provider-orchestrated text extraction →
//! adaptive classification → schema-driven field extraction → vector-index
//! learning → outcome reporting. Invoked as an in-process library by the
//! surrounding service; quota checking, persistence and transport are
//! external collaborators consumed through narrow seams.
//!
//! # Stage model
//!
//! Per document the stages are strictly sequential (later stages need
//! earlier outputs, and cost-sensitive stages must not run speculatively).
//! Across documents, processing is embarrassingly parallel: the only shared
//! mutable state is the vector store, which serializes its own writes.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod processor;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use processor::{DocumentProcessor, ProcessingReport, ResultSink};
