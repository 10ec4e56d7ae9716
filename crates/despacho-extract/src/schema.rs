//! Field schemas per document type
//!
//! Each known document type has a registered schema describing the fields
//! the extractor should pull out. Registration is explicit; the built-in
//! registry covers every type the classifier can produce.

use despacho_domain::DocumentType;
use std::collections::BTreeMap;

/// Whether a field holds one value or a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single scalar value
    Scalar,
    /// Ordered list of values (consolidation concatenates these)
    List,
}

/// One field the schema asks for
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name, as it must appear in the model's JSON answer
    pub name: &'static str,

    /// Human description, included in the prompt
    pub description: &'static str,

    /// Scalar or list
    pub kind: FieldKind,
}

impl FieldSpec {
    fn scalar(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Scalar,
        }
    }

    fn list(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::List,
        }
    }
}

/// The full field schema of one document type
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Type this schema belongs to
    pub document_type: DocumentType,

    /// Requested fields, in prompt order
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Look up a field spec by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Registry of schemas, keyed by document type
pub struct SchemaRegistry {
    schemas: BTreeMap<DocumentType, FieldSchema>,
}

impl SchemaRegistry {
    /// Registry with the built-in schema set for all known types
    pub fn builtin() -> Self {
        let mut schemas = BTreeMap::new();
        for schema in builtin_schemas() {
            schemas.insert(schema.document_type, schema);
        }
        Self { schemas }
    }

    /// Schema for the given type, if registered
    pub fn get(&self, document_type: DocumentType) -> Option<&FieldSchema> {
        self.schemas.get(&document_type)
    }

    /// Register (or replace) a schema
    pub fn register(&mut self, schema: FieldSchema) {
        self.schemas.insert(schema.document_type, schema);
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_schemas() -> Vec<FieldSchema> {
    use DocumentType::*;
    vec![
        FieldSchema {
            document_type: Cnh,
            fields: vec![
                FieldSpec::scalar("nome_completo", "Nome completo do portador"),
                FieldSpec::scalar("numero_registro", "Número do registro da CNH"),
                FieldSpec::scalar("cpf", "CPF do portador"),
                FieldSpec::scalar("data_nascimento", "Data de nascimento (DD/MM/AAAA)"),
                FieldSpec::scalar("categoria", "Categoria da habilitação (A, B, C, D, E)"),
                FieldSpec::scalar("data_primeira_habilitacao", "Data da primeira habilitação"),
                FieldSpec::scalar("data_validade", "Data de validade da CNH"),
                FieldSpec::scalar("orgao_expedidor", "Órgão que expediu a CNH"),
                FieldSpec::scalar("numero_espelho", "Número do espelho/segurança"),
            ],
        },
        FieldSchema {
            document_type: ComprovanteBancario,
            fields: vec![
                FieldSpec::scalar("banco", "Nome do banco"),
                FieldSpec::scalar("agencia", "Número da agência"),
                FieldSpec::scalar("conta", "Número da conta"),
                FieldSpec::scalar("tipo_operacao", "Tipo da operação (transferência, depósito, PIX)"),
                FieldSpec::scalar("valor", "Valor da operação"),
                FieldSpec::scalar("data_operacao", "Data da operação"),
                FieldSpec::scalar("codigo_autenticacao", "Código de autenticação"),
                FieldSpec::scalar("favorecido", "Nome do favorecido/destinatário"),
                FieldSpec::scalar("documento_favorecido", "CPF/CNPJ do favorecido"),
            ],
        },
        FieldSchema {
            document_type: CartaoCnpj,
            fields: vec![
                FieldSpec::scalar("cnpj", "Número do CNPJ"),
                FieldSpec::scalar("razao_social", "Razão social da empresa"),
                FieldSpec::scalar("nome_fantasia", "Nome fantasia"),
                FieldSpec::scalar("data_abertura", "Data de abertura da empresa"),
                FieldSpec::scalar("cnae_principal", "Código CNAE principal"),
                FieldSpec::scalar("natureza_juridica", "Natureza jurídica"),
                FieldSpec::scalar("endereco_completo", "Endereço completo"),
                FieldSpec::scalar("situacao_cadastral", "Situação cadastral atual"),
                FieldSpec::scalar("data_situacao", "Data da situação cadastral"),
            ],
        },
        FieldSchema {
            document_type: CeiObra,
            fields: vec![
                FieldSpec::scalar("numero_cei", "Número da matrícula CEI"),
                FieldSpec::scalar("endereco_obra", "Endereço completo da obra"),
                FieldSpec::scalar("proprietario_nome", "Nome do proprietário"),
                FieldSpec::scalar("proprietario_documento", "CPF/CNPJ do proprietário"),
                FieldSpec::scalar("responsavel_tecnico", "Nome do responsável técnico"),
                FieldSpec::scalar("numero_art", "Número da ART"),
                FieldSpec::scalar("data_inicio", "Data de início da obra"),
                FieldSpec::scalar("tipo_obra", "Tipo da obra"),
            ],
        },
        FieldSchema {
            document_type: InscricaoMunicipal,
            fields: vec![
                FieldSpec::scalar("numero_inscricao", "Número da inscrição municipal"),
                FieldSpec::scalar("razao_social", "Razão social"),
                FieldSpec::scalar("nome_fantasia", "Nome fantasia"),
                FieldSpec::scalar("cnpj", "CNPJ da empresa"),
                FieldSpec::scalar("endereco", "Endereço do estabelecimento"),
                FieldSpec::scalar("atividade_principal", "Atividade econômica principal"),
                FieldSpec::scalar("data_inscricao", "Data da inscrição"),
                FieldSpec::scalar("situacao", "Situação da inscrição"),
            ],
        },
        FieldSchema {
            document_type: TermoResponsabilidade,
            fields: vec![
                FieldSpec::scalar("responsavel_nome", "Nome do responsável"),
                FieldSpec::scalar("responsavel_documento", "CPF/CNPJ do responsável"),
                FieldSpec::scalar("objeto_responsabilidade", "Objeto da responsabilidade"),
                FieldSpec::scalar("descricao_obrigacoes", "Descrição das obrigações"),
                FieldSpec::scalar("prazo_validade", "Prazo de validade"),
                FieldSpec::scalar("data_assinatura", "Data da assinatura"),
                FieldSpec::list("testemunhas", "Nomes das testemunhas"),
            ],
        },
        FieldSchema {
            document_type: AlvaraMunicipal,
            fields: vec![
                FieldSpec::scalar("numero_alvara", "Número do alvará"),
                FieldSpec::scalar("razao_social", "Razão social da empresa"),
                FieldSpec::scalar("cnpj", "CNPJ"),
                FieldSpec::scalar("endereco", "Endereço do estabelecimento"),
                FieldSpec::list("atividades_permitidas", "Lista de atividades permitidas"),
                FieldSpec::scalar("data_emissao", "Data de emissão"),
                FieldSpec::scalar("data_validade", "Data de validade"),
                FieldSpec::scalar("orgao_emissor", "Órgão emissor"),
            ],
        },
        FieldSchema {
            document_type: ContratoSocial,
            fields: vec![
                FieldSpec::scalar("razao_social", "Razão social da empresa"),
                FieldSpec::scalar("nome_fantasia", "Nome fantasia"),
                FieldSpec::scalar("cnpj", "CNPJ (se for alteração)"),
                FieldSpec::scalar("objeto_social", "Objeto social"),
                FieldSpec::scalar("capital_social", "Valor do capital social"),
                FieldSpec::scalar("endereco_sede", "Endereço da sede"),
                FieldSpec::list("socios", "Lista de sócios com participação"),
                FieldSpec::list("administradores", "Lista de administradores"),
                FieldSpec::scalar("data_constituicao", "Data de constituição"),
            ],
        },
        FieldSchema {
            document_type: FaturaTelefonica,
            fields: vec![
                FieldSpec::scalar("operadora", "Nome da operadora"),
                FieldSpec::scalar("numero_linha", "Número da linha"),
                FieldSpec::scalar("periodo_referencia", "Período de referência"),
                FieldSpec::scalar("valor_total", "Valor total da fatura"),
                FieldSpec::scalar("data_vencimento", "Data de vencimento"),
                FieldSpec::scalar("consumo_dados", "Consumo de dados"),
                FieldSpec::scalar("chamadas_locais", "Quantidade/valor de chamadas locais"),
                FieldSpec::list("servicos_adicionais", "Serviços adicionais cobrados"),
            ],
        },
        FieldSchema {
            document_type: NotaFiscalServico,
            fields: vec![
                FieldSpec::scalar("numero_nota", "Número da nota fiscal"),
                FieldSpec::scalar("prestador_nome", "Nome do prestador"),
                FieldSpec::scalar("prestador_cnpj", "CNPJ do prestador"),
                FieldSpec::scalar("tomador_nome", "Nome do tomador"),
                FieldSpec::scalar("tomador_documento", "CPF/CNPJ do tomador"),
                FieldSpec::scalar("descricao_servicos", "Descrição dos serviços"),
                FieldSpec::scalar("valor_servicos", "Valor dos serviços"),
                FieldSpec::scalar("iss", "Valor do ISS"),
                FieldSpec::scalar("valor_total", "Valor total da nota"),
                FieldSpec::scalar("data_emissao", "Data de emissão"),
            ],
        },
    ]
}
