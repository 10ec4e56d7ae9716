//! Static keyword tables for the terminal rule-based stage

use despacho_domain::DocumentType;

/// Keywords that indicate the given document type.
///
/// Matching is done on lowercased text; multi-word entries match as
/// substrings.
pub fn keywords_for(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::ComprovanteBancario => &[
            "banco",
            "transferência",
            "depósito",
            "pix",
            "ted",
            "agência",
            "conta",
        ],
        DocumentType::CeiObra => &["cei", "obra", "construção", "matrícula cei", "inss"],
        DocumentType::InscricaoMunicipal => &["inscrição municipal", "prefeitura", "município"],
        DocumentType::TermoResponsabilidade => {
            &["responsabilidade", "termo", "obrigação", "compromisso"]
        }
        DocumentType::AlvaraMunicipal => &["alvará", "licença", "autorização municipal"],
        DocumentType::CartaoCnpj => &["cnpj", "razão social", "nome fantasia", "cnae"],
        DocumentType::ContratoSocial => {
            &["contrato social", "sociedade", "sócios", "capital social"]
        }
        DocumentType::Cnh => &["cnh", "habilitação", "carteira nacional", "categoria"],
        DocumentType::FaturaTelefonica => &["fatura", "telefone", "ligações", "minutos"],
        DocumentType::NotaFiscalServico => &["nfs-e", "nota fiscal", "serviços", "iss"],
        DocumentType::Unclassified => &[],
    }
}
