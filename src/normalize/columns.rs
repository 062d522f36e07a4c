//! Fixed translation tables from the CVM column names to canonical fields.
//!
//! Columns not listed here are dropped during normalization.

/// Canonical fields of the consolidated family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsolidatedColumn {
    CompanyTaxId,
    CompanyName,
    ReferenceDate,
    Version,
    CompanyType,
    Company,
    PositionType,
    MovementType,
    MovementDescription,
    OperationType,
    AssetType,
    SecurityCharacteristic,
    Intermediary,
    MovementDate,
    Quantity,
    UnitPrice,
    Volume,
}

/// Canonical fields of the individual family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndividualColumn {
    CompanyTaxId,
    CompanyName,
    ReferenceDate,
    Version,
    CvmCode,
    Category,
    Type,
    DeliveryDate,
    PresentationType,
    RestatementReason,
    DeliveryProtocol,
    DownloadLink,
}

pub const CONSOLIDATED_COLUMNS: &[(&str, ConsolidatedColumn)] = &[
    ("CNPJ_Companhia", ConsolidatedColumn::CompanyTaxId),
    ("Nome_Companhia", ConsolidatedColumn::CompanyName),
    ("Data_Referencia", ConsolidatedColumn::ReferenceDate),
    ("Versao", ConsolidatedColumn::Version),
    ("Tipo_Empresa", ConsolidatedColumn::CompanyType),
    ("Empresa", ConsolidatedColumn::Company),
    ("Tipo_Cargo", ConsolidatedColumn::PositionType),
    ("Tipo_Movimentacao", ConsolidatedColumn::MovementType),
    ("Descricao_Movimentacao", ConsolidatedColumn::MovementDescription),
    ("Tipo_Operacao", ConsolidatedColumn::OperationType),
    ("Tipo_Ativo", ConsolidatedColumn::AssetType),
    (
        "Caracteristica_Valor_Mobiliario",
        ConsolidatedColumn::SecurityCharacteristic,
    ),
    ("Intermediario", ConsolidatedColumn::Intermediary),
    ("Data_Movimentacao", ConsolidatedColumn::MovementDate),
    ("Quantidade", ConsolidatedColumn::Quantity),
    ("Preco_Unitario", ConsolidatedColumn::UnitPrice),
    ("Volume", ConsolidatedColumn::Volume),
];

pub const INDIVIDUAL_COLUMNS: &[(&str, IndividualColumn)] = &[
    ("CNPJ_Companhia", IndividualColumn::CompanyTaxId),
    ("Nome_Companhia", IndividualColumn::CompanyName),
    ("Data_Referencia", IndividualColumn::ReferenceDate),
    ("Versao", IndividualColumn::Version),
    ("Codigo_CVM", IndividualColumn::CvmCode),
    ("Categoria", IndividualColumn::Category),
    ("Tipo", IndividualColumn::Type),
    ("Data_Entrega", IndividualColumn::DeliveryDate),
    ("Tipo_Apresentacao", IndividualColumn::PresentationType),
    ("Motivo_Reapresentacao", IndividualColumn::RestatementReason),
    ("Protocolo_Entrega", IndividualColumn::DeliveryProtocol),
    ("Link_Download", IndividualColumn::DownloadLink),
];

fn lookup<C: Copy>(table: &[(&str, C)], raw: &str) -> Option<C> {
    table
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, column)| *column)
}

impl ConsolidatedColumn {
    pub fn from_raw(raw: &str) -> Option<Self> {
        lookup(CONSOLIDATED_COLUMNS, raw)
    }
}

impl IndividualColumn {
    pub fn from_raw(raw: &str) -> Option<Self> {
        lookup(INDIVIDUAL_COLUMNS, raw)
    }
}
