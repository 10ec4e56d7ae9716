//! Error types for field extraction

use despacho_domain::DocumentType;
use thiserror::Error;

/// Errors surfaced by the extractor.
///
/// Of these, only `SchemaNotFound` reaches the pipeline's caller; everything
/// else is absorbed into degraded results.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No field schema registered for the requested document type
    #[error("no field schema registered for document type '{0}'")]
    SchemaNotFound(DocumentType),
}

/// The model's response could not be parsed as structured data.
///
/// Recovered locally by capturing the raw response at reduced confidence;
/// never propagated to the caller.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Not valid JSON at all
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON, but not the object shape the schema expects
    #[error("response is not a JSON object")]
    NotAnObject,
}
