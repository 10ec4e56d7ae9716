//! End-to-end pipeline tests over mock providers and generators

use despacho_classify::{AdaptiveClassifier, ClassifierConfig};
use despacho_domain::traits::{ExtractionProvider, TextGenerator};
use despacho_domain::{ClassificationMethod, DocumentType, FieldValue, RawDocument};
use despacho_extract::{AdaptiveExtractor, ExtractorConfig, SchemaRegistry};
use despacho_index::{HashEmbedder, VectorStore};
use despacho_llm::MockGenerator;
use despacho_pipeline::{DocumentProcessor, PipelineError, ProcessingReport, ResultSink};
use despacho_providers::{MockExtractionProvider, OrchestratorConfig, ProviderOrchestrator};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct RecordingSink {
    reports: Mutex<Vec<ProcessingReport>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl ResultSink for RecordingSink {
    fn record_outcome(&self, report: &ProcessingReport) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

fn build_processor(
    dir: &TempDir,
    providers: Vec<MockExtractionProvider>,
    classifier_generators: Vec<Arc<dyn TextGenerator>>,
    extractor_generator: MockGenerator,
) -> DocumentProcessor {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let index =
        Arc::new(VectorStore::open(dir.path(), Arc::new(HashEmbedder::new(128))).unwrap());

    let orchestrator = ProviderOrchestrator::new(
        providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn ExtractionProvider>)
            .collect(),
        OrchestratorConfig::default(),
    );

    let classifier = AdaptiveClassifier::new(
        index.clone(),
        classifier_generators,
        ClassifierConfig::default(),
    );

    let extractor = AdaptiveExtractor::new(
        index.clone(),
        Arc::new(extractor_generator),
        SchemaRegistry::builtin(),
        ExtractorConfig::default(),
    );

    DocumentProcessor::new(orchestrator, classifier, extractor, index)
}

fn bank_receipt_text() -> String {
    "Comprovante de transferência PIX realizado com sucesso. \
     Banco Alfa S.A., agência 0001, conta corrente 12345-6. \
     Valor de R$ 500,00 transferido ao favorecido Fulano de Tal. \
     Código de autenticação A1B2C3D4. Operação registrada e \
     confirmada pela instituição financeira na data de hoje."
        .to_string()
}

fn cnh_text(mirror: &str) -> String {
    format!(
        "CARTEIRA NACIONAL DE HABILITAÇÃO\n\
         Nome completo João Pedro Alves da Silva\n\
         Registro de habilitação número 0123456789 categoria B\n\
         CPF 111.222.333-44 data de nascimento 01/01/1990\n\
         Primeira habilitação em 10/05/2010 válida até 10/05/2030\n\
         Órgão expedidor DETRAN SP espelho número {mirror}\n"
    )
    .repeat(5)
}

#[tokio::test]
async fn test_scenario_rule_based_bank_receipt() {
    // No vector history, no LLM providers: the keyword stage must decide
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding("p1", bank_receipt_text(), 0.9)],
        vec![],
        MockGenerator::new(r#"{"banco": "Banco Alfa S.A.", "agencia": "0001"}"#),
    );

    let doc = RawDocument::new(b"%PDF".to_vec(), "comprovante.pdf");
    let report = processor.process(doc, true).await.unwrap();

    assert_eq!(
        report.classification.document_type,
        DocumentType::ComprovanteBancario
    );
    assert_eq!(report.classification.method, ClassificationMethod::RuleBased);
    assert!(report.classification.confidence.value() > 0.0);

    let fields = report.fields.unwrap();
    assert_eq!(
        fields.fields.get("banco"),
        Some(&FieldValue::Text("Banco Alfa S.A.".to_string()))
    );
    assert!(report.learned_record.is_some());
}

#[tokio::test]
async fn test_scenario_adaptive_after_feedback() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding("p1", cnh_text("999"), 0.9)],
        vec![],
        MockGenerator::new(r#"{"categoria": "B"}"#),
    );

    // Seed history: two processed near-duplicates plus one human-verified
    // correction, so the adaptive stage has enough neighbors to vote.
    for mirror in ["111", "222"] {
        let seed = processor
            .index()
            .add(
                &cnh_text(mirror),
                DocumentType::Cnh,
                BTreeMap::new(),
                despacho_domain::Confidence::new(0.9),
            )
            .unwrap();
        if mirror == "111" {
            processor
                .apply_feedback(seed, DocumentType::Cnh, BTreeMap::new())
                .unwrap();
        }
    }

    let doc = RawDocument::new(b"%PDF".to_vec(), "cnh.pdf");
    let report = processor.process(doc, true).await.unwrap();

    assert_eq!(report.classification.document_type, DocumentType::Cnh);
    assert_eq!(report.classification.method, ClassificationMethod::Adaptive);
    assert!(
        report.classification.confidence.value() >= 0.8,
        "adaptive confidence was {}",
        report.classification.confidence.value()
    );
    assert!(!report.classification.supporting_records.is_empty());
}

#[tokio::test]
async fn test_scenario_all_providers_fail() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![
            MockExtractionProvider::failing("p1", "indisponível"),
            MockExtractionProvider::failing("p2", "tempo esgotado"),
            MockExtractionProvider::failing("p3", "sem texto"),
        ],
        vec![],
        MockGenerator::new("{}"),
    );

    let doc = RawDocument::new(b"%PDF".to_vec(), "documento.pdf");
    let error = processor.process(doc, true).await.unwrap_err();

    match error {
        PipelineError::Extraction(failed) => {
            assert_eq!(failed.attempts.len(), 3);
            assert!(failed.attempts.iter().all(|a| a.error.is_some()));
        }
        other => panic!("expected extraction failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unclassified_document_is_best_effort_not_error() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding(
            "p1",
            "texto genérico sem nenhuma palavra-chave reconhecível aqui",
            0.9,
        )],
        vec![],
        MockGenerator::new("{}"),
    );

    let doc = RawDocument::new(b"x".to_vec(), "misterio.pdf");
    let report = processor.process(doc, true).await.unwrap();

    assert_eq!(
        report.classification.document_type,
        DocumentType::Unclassified
    );
    assert_eq!(report.classification.confidence.value(), 0.0);
    assert!(report.fields.is_none());
    assert!(report.learned_record.is_none());
}

#[tokio::test]
async fn test_low_quality_extraction_still_processes() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![
            MockExtractionProvider::succeeding("p1", bank_receipt_text(), 0.4),
            MockExtractionProvider::succeeding("p2", bank_receipt_text(), 0.5),
        ],
        vec![],
        MockGenerator::new("{}"),
    );

    let doc = RawDocument::new(b"x".to_vec(), "borrado.pdf");
    let report = processor.process(doc, true).await.unwrap();

    // Best-seen result kept with a low-confidence flag, not an error
    assert!(!report.met_quality_threshold);
    assert_eq!(report.extraction.provider, "p2");
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(
        report.classification.document_type,
        DocumentType::ComprovanteBancario
    );
}

#[tokio::test]
async fn test_quota_denial_short_circuits() {
    let dir = TempDir::new().unwrap();
    let provider = MockExtractionProvider::succeeding("p1", bank_receipt_text(), 0.9);
    let probe = provider.clone();
    let processor = build_processor(&dir, vec![provider], vec![], MockGenerator::new("{}"));

    let doc = RawDocument::new(b"x".to_vec(), "negado.pdf");
    let error = processor.process(doc, false).await.unwrap_err();

    assert!(matches!(error, PipelineError::NotAdmitted));
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test]
async fn test_sink_receives_reports() {
    let dir = TempDir::new().unwrap();
    let sink = RecordingSink::new();
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding("p1", bank_receipt_text(), 0.9)],
        vec![],
        MockGenerator::new(r#"{"banco": "Banco Alfa S.A."}"#),
    )
    .with_sink(sink.clone());

    let doc = RawDocument::new(b"x".to_vec(), "comprovante.pdf");
    processor.process(doc, true).await.unwrap();

    assert_eq!(sink.count(), 1);
    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports[0].file_name, "comprovante.pdf");
    assert!(reports[0].elapsed.as_nanos() > 0);
}

#[tokio::test]
async fn test_feedback_corrects_future_classification() {
    let dir = TempDir::new().unwrap();
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding("p1", bank_receipt_text(), 0.9)],
        vec![],
        MockGenerator::new("{}"),
    );

    let doc = RawDocument::new(b"x".to_vec(), "comprovante.pdf");
    let report = processor.process(doc, true).await.unwrap();
    let learned = report.learned_record.unwrap();

    // Human says this was actually an NFS-e
    let mut correct = BTreeMap::new();
    correct.insert(
        "numero_nota".to_string(),
        FieldValue::Text("2024/000123".to_string()),
    );
    processor
        .apply_feedback(learned, DocumentType::NotaFiscalServico, correct)
        .unwrap();

    let index = processor.index();
    assert_eq!(index.len_for_type(DocumentType::NotaFiscalServico), 1);
    // The original record stays, flagged as superseded
    let original = index.get(learned).unwrap();
    assert!(original.superseded_by.is_some());
}

#[tokio::test]
async fn test_llm_stage_used_when_index_cold() {
    let dir = TempDir::new().unwrap();
    let llm = MockGenerator::new("Contrato Social");
    let processor = build_processor(
        &dir,
        vec![MockExtractionProvider::succeeding(
            "p1",
            // No rule keywords needed; the LLM decides
            "documento societário digitalizado para análise e arquivamento",
            0.9,
        )],
        vec![Arc::new(llm)],
        MockGenerator::new(r#"{"razao_social": "Alfa Ltda"}"#),
    );

    let doc = RawDocument::new(b"x".to_vec(), "contrato.pdf");
    let report = processor.process(doc, true).await.unwrap();

    assert_eq!(
        report.classification.document_type,
        DocumentType::ContratoSocial
    );
    assert_eq!(
        report.classification.method,
        ClassificationMethod::LlmPrimary
    );
    assert_eq!(report.classification.confidence.value(), 0.85);
}
