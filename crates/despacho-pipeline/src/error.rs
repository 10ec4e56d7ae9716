//! Pipeline error taxonomy
//!
//! Only extraction failure (all providers down), a missing schema and quota
//! denial reach the caller; everything else inside the stages degrades to
//! low-confidence results.

use despacho_extract::ExtractError;
use despacho_index::IndexError;
use despacho_providers::ExtractionFailed;
use thiserror::Error;

/// Hard errors a `process` call can surface
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pre-checked quota decision denied this document
    #[error("document was not admitted by the quota check")]
    NotAdmitted,

    /// Every extraction provider failed; carries the full attempt history
    #[error(transparent)]
    Extraction(#[from] ExtractionFailed),

    /// Field extraction was requested for a type without a schema
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Vector index failure during an explicit feedback call
    #[error(transparent)]
    Index(#[from] IndexError),
}
