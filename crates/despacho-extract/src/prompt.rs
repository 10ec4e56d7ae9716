//! Extraction prompt engineering

use crate::schema::{FieldKind, FieldSchema};
use despacho_index::Neighbor;

const EXTRACTION_INSTRUCTIONS: &str = "Extraia os campos estruturados do documento abaixo.\n\
Responda com um objeto JSON contendo APENAS os campos listados.\n\
Omita campos que não aparecem no documento; não invente valores.\n\
Campos marcados como lista devem ser arrays JSON de strings.";

const OUTPUT_FORMAT_REMINDER: &str = "Responda APENAS com o objeto JSON, \
sem blocos de código markdown e sem explicações.";

/// How much of each similar document's text goes into the prompt
const EXAMPLE_TEXT_BUDGET: usize = 200;

/// Builds prompts for schema-driven field extraction
pub struct PromptBuilder<'a> {
    schema: &'a FieldSchema,
    text: &'a str,
    examples: Vec<&'a Neighbor>,
}

impl<'a> PromptBuilder<'a> {
    /// Start a prompt for the given schema and document text
    pub fn new(schema: &'a FieldSchema, text: &'a str) -> Self {
        Self {
            schema,
            text,
            examples: Vec::new(),
        }
    }

    /// Add similar verified documents as in-prompt examples.
    ///
    /// Biases the model toward the house style of previously corrected
    /// extractions of the same type.
    pub fn with_examples(mut self, examples: impl IntoIterator<Item = &'a Neighbor>) -> Self {
        self.examples = examples.into_iter().collect();
        self
    }

    /// Whether any examples were attached
    pub fn has_examples(&self) -> bool {
        !self.examples.is_empty()
    }

    /// Render the full prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(4096);
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\nTipo do documento: ");
        prompt.push_str(self.schema.document_type.label());

        prompt.push_str("\n\nCampos:\n");
        for field in &self.schema.fields {
            let kind = match field.kind {
                FieldKind::Scalar => "texto",
                FieldKind::List => "lista",
            };
            prompt.push_str(&format!("- {} ({kind}): {}\n", field.name, field.description));
        }

        if !self.examples.is_empty() {
            prompt.push_str("\nExemplos de documentos semelhantes já verificados:\n");
            for neighbor in &self.examples {
                let snippet: String = neighbor
                    .record
                    .text_prefix
                    .chars()
                    .take(EXAMPLE_TEXT_BUDGET)
                    .collect();
                let fields = serde_json::to_string(&neighbor.record.fields)
                    .unwrap_or_else(|_| "{}".to_string());
                prompt.push_str(&format!("Documento: {snippet}...\nCampos: {fields}\n\n"));
            }
        }

        prompt.push_str("\nTexto do documento:\n---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use despacho_domain::{Confidence, DocumentType, FieldValue};
    use despacho_index::VectorRecord;
    use std::collections::BTreeMap;

    fn cnh_neighbor() -> Neighbor {
        let mut fields = BTreeMap::new();
        fields.insert(
            "categoria".to_string(),
            FieldValue::Text("B".to_string()),
        );
        Neighbor {
            record: VectorRecord::new(
                vec![0.0; 4],
                "carteira nacional de habilitação exemplo",
                DocumentType::Cnh,
                fields,
                Confidence::FULL,
            ),
            similarity: 0.92,
        }
    }

    #[test]
    fn test_prompt_lists_schema_fields() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get(DocumentType::Cnh).unwrap();
        let prompt = PromptBuilder::new(schema, "texto da cnh").build();

        assert!(prompt.contains("CNH"));
        assert!(prompt.contains("nome_completo"));
        assert!(prompt.contains("categoria"));
        assert!(prompt.contains("texto da cnh"));
        assert!(prompt.contains("APENAS com o objeto JSON"));
    }

    #[test]
    fn test_prompt_marks_list_fields() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get(DocumentType::ContratoSocial).unwrap();
        let prompt = PromptBuilder::new(schema, "texto").build();
        assert!(prompt.contains("socios (lista)"));
        assert!(prompt.contains("razao_social (texto)"));
    }

    #[test]
    fn test_prompt_includes_examples() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get(DocumentType::Cnh).unwrap();
        let neighbor = cnh_neighbor();
        let builder = PromptBuilder::new(schema, "texto").with_examples([&neighbor]);

        assert!(builder.has_examples());
        let prompt = builder.build();
        assert!(prompt.contains("já verificados"));
        assert!(prompt.contains("carteira nacional de habilitação exemplo"));
        assert!(prompt.contains("\"categoria\":\"B\""));
    }

    #[test]
    fn test_prompt_without_examples_omits_section() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get(DocumentType::Cnh).unwrap();
        let prompt = PromptBuilder::new(schema, "texto").build();
        assert!(!prompt.contains("já verificados"));
    }
}
