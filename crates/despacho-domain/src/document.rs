//! Ingested documents and the supported document-type set

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ingested document: raw bytes plus the original file name.
///
/// A `RawDocument` exists only between ingress and text extraction; the core
/// never persists it. Persistence of anything derived from it is the job of
/// the surrounding service.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Raw byte payload as uploaded
    pub bytes: Vec<u8>,

    /// Original file name, used to derive the extension
    pub file_name: String,
}

impl RawDocument {
    /// Create a new raw document
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    /// Lowercased file extension including the leading dot, or `""` if none
    pub fn extension(&self) -> String {
        match self.file_name.rfind('.') {
            Some(idx) => self.file_name[idx..].to_ascii_lowercase(),
            None => String::new(),
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The closed set of business document types the pipeline understands.
///
/// `Unclassified` is the sentinel for documents no stage could place; it is
/// never a valid extraction target. Display labels are the Portuguese names
/// the classification prompt and the rule tables work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Bank transfer/deposit receipt
    ComprovanteBancario,
    /// CEI registration of a construction site
    CeiObra,
    /// Municipal business registration
    InscricaoMunicipal,
    /// Liability/responsibility agreement
    TermoResponsabilidade,
    /// Municipal operating permit
    AlvaraMunicipal,
    /// Articles of incorporation
    ContratoSocial,
    /// CNPJ registration card
    CartaoCnpj,
    /// National driver's license
    Cnh,
    /// Phone bill
    FaturaTelefonica,
    /// Electronic service invoice (NFS-e)
    NotaFiscalServico,
    /// Sentinel: no stage could classify the document
    Unclassified,
}

impl DocumentType {
    /// All known (classifiable) types, excluding the `Unclassified` sentinel
    pub fn known() -> &'static [DocumentType] {
        &[
            DocumentType::ComprovanteBancario,
            DocumentType::CeiObra,
            DocumentType::InscricaoMunicipal,
            DocumentType::TermoResponsabilidade,
            DocumentType::AlvaraMunicipal,
            DocumentType::ContratoSocial,
            DocumentType::CartaoCnpj,
            DocumentType::Cnh,
            DocumentType::FaturaTelefonica,
            DocumentType::NotaFiscalServico,
        ]
    }

    /// Display label, as used in prompts and stored results
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::ComprovanteBancario => "Comprovante Bancário",
            DocumentType::CeiObra => "CEI da Obra",
            DocumentType::InscricaoMunicipal => "Inscrição Municipal",
            DocumentType::TermoResponsabilidade => "Termo de Responsabilidade",
            DocumentType::AlvaraMunicipal => "Alvará Municipal",
            DocumentType::ContratoSocial => "Contrato Social",
            DocumentType::CartaoCnpj => "Cartão CNPJ",
            DocumentType::Cnh => "CNH",
            DocumentType::FaturaTelefonica => "Fatura Telefônica",
            DocumentType::NotaFiscalServico => "Nota Fiscal de Serviços Eletrônica",
            DocumentType::Unclassified => "Documento Não Classificado",
        }
    }

    /// Short description used when enumerating types in an LLM prompt
    pub fn description(&self) -> &'static str {
        match self {
            DocumentType::ComprovanteBancario => {
                "comprovante de transferência, depósito ou pagamento bancário (PIX, TED, DOC)"
            }
            DocumentType::CeiObra => "matrícula CEI de obra de construção civil junto ao INSS",
            DocumentType::InscricaoMunicipal => {
                "comprovante de inscrição municipal de empresa junto à prefeitura"
            }
            DocumentType::TermoResponsabilidade => {
                "termo formal assumindo obrigações ou responsabilidades"
            }
            DocumentType::AlvaraMunicipal => {
                "alvará de funcionamento ou licença emitida pelo município"
            }
            DocumentType::ContratoSocial => {
                "contrato social de constituição ou alteração de sociedade"
            }
            DocumentType::CartaoCnpj => "cartão CNPJ com dados cadastrais da empresa",
            DocumentType::Cnh => "carteira nacional de habilitação",
            DocumentType::FaturaTelefonica => "fatura de serviços de telefonia",
            DocumentType::NotaFiscalServico => "nota fiscal eletrônica de prestação de serviços",
            DocumentType::Unclassified => "documento que não se encaixa em nenhum tipo conhecido",
        }
    }

    /// Whether this is a real (classifiable) type rather than the sentinel
    pub fn is_known(&self) -> bool {
        !matches!(self, DocumentType::Unclassified)
    }

    /// Resolve a free-form label (typically an LLM answer) to a known type.
    ///
    /// Matching is case- and accent-insensitive, and accepts the label either
    /// as an exact match or contained inside a longer answer. Anything that
    /// does not resolve maps to `Unclassified`.
    pub fn from_label(label: &str) -> DocumentType {
        let needle = fold(label);
        if needle.is_empty() {
            return DocumentType::Unclassified;
        }
        for ty in Self::known() {
            if fold(ty.label()) == needle {
                return *ty;
            }
        }
        for ty in Self::known() {
            if needle.contains(&fold(ty.label())) {
                return *ty;
            }
        }
        DocumentType::Unclassified
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercase and strip the Portuguese diacritics we expect in labels
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .filter_map(|c| {
            let c = match c {
                'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
                'é' | 'ê' | 'É' | 'Ê' => 'e',
                'í' | 'Í' => 'i',
                'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'o',
                'ú' | 'Ú' => 'u',
                'ç' | 'Ç' => 'c',
                other => other,
            };
            if c.is_alphanumeric() || c.is_whitespace() || c == '-' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        let doc = RawDocument::new(vec![1, 2, 3], "Comprovante.PDF");
        assert_eq!(doc.extension(), ".pdf");

        let doc = RawDocument::new(vec![], "noextension");
        assert_eq!(doc.extension(), "");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_known_excludes_sentinel() {
        assert_eq!(DocumentType::known().len(), 10);
        assert!(!DocumentType::known().contains(&DocumentType::Unclassified));
    }

    #[test]
    fn test_from_label_exact() {
        assert_eq!(
            DocumentType::from_label("Comprovante Bancário"),
            DocumentType::ComprovanteBancario
        );
        assert_eq!(DocumentType::from_label("CNH"), DocumentType::Cnh);
    }

    #[test]
    fn test_from_label_accent_insensitive() {
        assert_eq!(
            DocumentType::from_label("comprovante bancario"),
            DocumentType::ComprovanteBancario
        );
        assert_eq!(
            DocumentType::from_label("ALVARA MUNICIPAL"),
            DocumentType::AlvaraMunicipal
        );
    }

    #[test]
    fn test_from_label_substring() {
        assert_eq!(
            DocumentType::from_label("O documento é um Contrato Social."),
            DocumentType::ContratoSocial
        );
    }

    #[test]
    fn test_from_label_unknown() {
        assert_eq!(
            DocumentType::from_label("Receita de bolo"),
            DocumentType::Unclassified
        );
        assert_eq!(DocumentType::from_label(""), DocumentType::Unclassified);
    }
}
