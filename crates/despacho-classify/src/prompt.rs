//! Classification prompt construction and text sampling

use despacho_domain::DocumentType;

/// Above this length, prompts sample the document instead of truncating it
const SAMPLING_THRESHOLD: usize = 5000;

/// Sample window sizes (head, middle, tail) in characters
const SAMPLE_WINDOW: usize = 800;

/// Plain truncation budget for shorter documents
const TRUNCATION_BUDGET: usize = 2000;

const INSTRUCTIONS: &str = "Você é um classificador de documentos empresariais.\n\
Analise o texto abaixo e responda com EXATAMENTE um dos tipos listados,\n\
sem explicações adicionais. Se nenhum tipo se aplicar, responda\n\
\"Documento Não Classificado\".";

/// Build the zero-shot classification prompt.
///
/// Enumerates every known type with its description, then appends a bounded
/// sample of the document text.
pub fn classification_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nTipos de documento:\n");
    for ty in DocumentType::known() {
        prompt.push_str(&format!("- {}: {}\n", ty.label(), ty.description()));
    }
    prompt.push_str("\nTexto do documento:\n---\n");
    prompt.push_str(&sample_text(text));
    prompt.push_str("\n---\n\nTipo do documento:");
    prompt
}

/// Bound the document text for prompting.
///
/// Long documents are sampled head + middle + tail so the prompt keeps
/// signal from the whole document while bounding token cost; shorter ones
/// are simply truncated.
pub fn sample_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= SAMPLING_THRESHOLD {
        return chars.into_iter().take(TRUNCATION_BUDGET).collect();
    }

    let head: String = chars[..SAMPLE_WINDOW].iter().collect();
    let middle_start = len / 2 - SAMPLE_WINDOW / 2;
    let middle: String = chars[middle_start..middle_start + SAMPLE_WINDOW]
        .iter()
        .collect();
    let tail: String = chars[len - SAMPLE_WINDOW..].iter().collect();

    format!("{head}\n...\n{middle}\n...\n{tail}")
}
