//! The document processor

use crate::error::PipelineError;
use despacho_classify::AdaptiveClassifier;
use despacho_domain::{
    AttemptRecord, ClassificationResult, ExtractedFields, ExtractionResult, FieldValue,
    RawDocument,
};
use despacho_extract::AdaptiveExtractor;
use despacho_index::{RecordId, VectorStore};
use despacho_providers::ProviderOrchestrator;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Everything the pipeline knows about one processed document.
///
/// Handed to the [`ResultSink`] collaborator for persistence/billing and
/// returned to the caller.
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    /// Pipeline-assigned document id
    pub document_id: Uuid,

    /// Original file name
    pub file_name: String,

    /// The extraction result that was kept
    pub extraction: ExtractionResult,

    /// Every provider attempt, in order
    pub attempts: Vec<AttemptRecord>,

    /// Whether the kept result met the quality threshold
    pub met_quality_threshold: bool,

    /// Classification outcome (possibly `Unclassified`)
    pub classification: ClassificationResult,

    /// Structured fields; absent when the document stayed unclassified
    pub fields: Option<ExtractedFields>,

    /// Vector record added for future adaptive lookups, when learning ran
    pub learned_record: Option<RecordId>,

    /// Aggregate provider cost of the kept extraction
    pub total_cost: f64,

    /// End-to-end processing time
    pub elapsed: Duration,
}

/// Persistence collaborator seam.
///
/// The surrounding service implements this to store results and record
/// usage/cost; the pipeline only reports through it and treats failures as
/// non-fatal.
pub trait ResultSink: Send + Sync {
    /// Persist one processed document's outcome
    fn record_outcome(&self, report: &ProcessingReport) -> anyhow::Result<()>;
}

/// Sequential per-document pipeline over shared stage components
pub struct DocumentProcessor {
    orchestrator: ProviderOrchestrator,
    classifier: AdaptiveClassifier,
    extractor: AdaptiveExtractor,
    index: Arc<VectorStore>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl DocumentProcessor {
    /// Assemble a processor from its stages
    pub fn new(
        orchestrator: ProviderOrchestrator,
        classifier: AdaptiveClassifier,
        extractor: AdaptiveExtractor,
        index: Arc<VectorStore>,
    ) -> Self {
        Self {
            orchestrator,
            classifier,
            extractor,
            index,
            sink: None,
        }
    }

    /// Attach the persistence collaborator
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Process one document end to end.
    ///
    /// `admitted` is the pre-checked quota decision; the pipeline does not
    /// consult quota state itself. Stages run sequentially. A document that
    /// cannot be classified still produces a best-effort report; only
    /// extraction failure, a missing schema or quota denial are hard errors.
    pub async fn process(
        &self,
        document: RawDocument,
        admitted: bool,
    ) -> Result<ProcessingReport, PipelineError> {
        if !admitted {
            return Err(PipelineError::NotAdmitted);
        }

        let started = Instant::now();
        let document_id = Uuid::now_v7();
        info!(
            %document_id,
            file = %document.file_name,
            bytes = document.len(),
            "processing document"
        );

        // 1. Text extraction with provider fallback
        let outcome = self.orchestrator.extract(&document).await?;

        // 2. Classification (never fails)
        let classification = self.classifier.classify(&outcome.result.text).await;

        // 3. Structured field extraction for classified documents
        let fields = if classification.document_type.is_known() {
            Some(
                self.extractor
                    .extract_fields(&outcome.result.text, classification.document_type)
                    .await?,
            )
        } else {
            info!(%document_id, "document unclassified; skipping field extraction");
            None
        };

        // 4. Learn: feed the result back into the vector index so future
        //    documents of this type classify adaptively. Best-effort.
        let learned_record = if classification.document_type.is_known() {
            let field_map: BTreeMap<String, FieldValue> = fields
                .as_ref()
                .map(|f| f.fields.clone())
                .unwrap_or_default();
            match self.index.add(
                &outcome.result.text,
                classification.document_type,
                field_map,
                classification.confidence,
            ) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(%document_id, "vector index learning failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        let report = ProcessingReport {
            document_id,
            file_name: document.file_name,
            total_cost: outcome.result.cost,
            extraction: outcome.result,
            attempts: outcome.attempts,
            met_quality_threshold: outcome.met_threshold,
            classification,
            fields,
            learned_record,
            elapsed: started.elapsed(),
        };

        // 5. Report to the persistence collaborator; its failures must not
        //    fail a document that was processed successfully.
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record_outcome(&report) {
                warn!(%document_id, "result sink failed: {e}");
            }
        }

        info!(
            %document_id,
            document_type = %report.classification.document_type,
            confidence = report.classification.confidence.value(),
            cost = report.total_cost,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "document processed"
        );
        Ok(report)
    }

    /// Apply a human correction to a previously learned record.
    ///
    /// Rewrites the record in the vector index as verified (confidence 1.0);
    /// future nearest-neighbor lookups will prefer the corrected copy.
    pub fn apply_feedback(
        &self,
        record: RecordId,
        correct_type: despacho_domain::DocumentType,
        correct_fields: BTreeMap<String, FieldValue>,
    ) -> Result<RecordId, PipelineError> {
        let corrected = self
            .index
            .update_with_feedback(record, correct_type, correct_fields)?;
        info!(original = %record, %corrected, "feedback applied to vector index");
        Ok(corrected)
    }

    /// Shared vector store handle (e.g. for statistics endpoints)
    pub fn index(&self) -> &Arc<VectorStore> {
        &self.index
    }
}
