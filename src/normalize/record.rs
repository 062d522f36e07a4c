use super::columns::{ConsolidatedColumn, IndividualColumn};
use super::family::FamilyKind;

/// A canonical row type: a fixed field set filled from translated columns.
pub trait CanonicalRow: Default {
    type Column: Copy;

    /// Translate a raw header; `None` drops the column.
    fn column(raw: &str) -> Option<Self::Column>;

    fn set(&mut self, column: Self::Column, value: String);
}

/// A consolidated-family row after field translation.
///
/// Values are the trimmed cell text. `None` means the column was absent from
/// the file or the cell was empty; nothing is parsed at this stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedFields {
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub reference_date: Option<String>,
    pub version: Option<String>,
    pub company_type: Option<String>,
    pub company: Option<String>,
    pub position_type: Option<String>,
    pub movement_type: Option<String>,
    pub movement_description: Option<String>,
    pub operation_type: Option<String>,
    pub asset_type: Option<String>,
    pub security_characteristic: Option<String>,
    pub intermediary: Option<String>,
    pub movement_date: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub volume: Option<String>,
}

/// An individual-family row after field translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualFields {
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub reference_date: Option<String>,
    pub version: Option<String>,
    pub cvm_code: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub delivery_date: Option<String>,
    pub presentation_type: Option<String>,
    pub restatement_reason: Option<String>,
    pub delivery_protocol: Option<String>,
    pub download_link: Option<String>,
}

/// A translated row tagged with its family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalRecord {
    Consolidated(ConsolidatedFields),
    Individual(IndividualFields),
}

impl CanonicalRecord {
    pub fn family(&self) -> FamilyKind {
        match self {
            CanonicalRecord::Consolidated(_) => FamilyKind::Consolidated,
            CanonicalRecord::Individual(_) => FamilyKind::Individual,
        }
    }
}

impl CanonicalRow for ConsolidatedFields {
    type Column = ConsolidatedColumn;

    fn column(raw: &str) -> Option<ConsolidatedColumn> {
        ConsolidatedColumn::from_raw(raw)
    }

    fn set(&mut self, column: ConsolidatedColumn, value: String) {
        let slot = match column {
            ConsolidatedColumn::CompanyTaxId => &mut self.company_tax_id,
            ConsolidatedColumn::CompanyName => &mut self.company_name,
            ConsolidatedColumn::ReferenceDate => &mut self.reference_date,
            ConsolidatedColumn::Version => &mut self.version,
            ConsolidatedColumn::CompanyType => &mut self.company_type,
            ConsolidatedColumn::Company => &mut self.company,
            ConsolidatedColumn::PositionType => &mut self.position_type,
            ConsolidatedColumn::MovementType => &mut self.movement_type,
            ConsolidatedColumn::MovementDescription => &mut self.movement_description,
            ConsolidatedColumn::OperationType => &mut self.operation_type,
            ConsolidatedColumn::AssetType => &mut self.asset_type,
            ConsolidatedColumn::SecurityCharacteristic => &mut self.security_characteristic,
            ConsolidatedColumn::Intermediary => &mut self.intermediary,
            ConsolidatedColumn::MovementDate => &mut self.movement_date,
            ConsolidatedColumn::Quantity => &mut self.quantity,
            ConsolidatedColumn::UnitPrice => &mut self.unit_price,
            ConsolidatedColumn::Volume => &mut self.volume,
        };
        *slot = Some(value);
    }
}

impl CanonicalRow for IndividualFields {
    type Column = IndividualColumn;

    fn column(raw: &str) -> Option<IndividualColumn> {
        IndividualColumn::from_raw(raw)
    }

    fn set(&mut self, column: IndividualColumn, value: String) {
        let slot = match column {
            IndividualColumn::CompanyTaxId => &mut self.company_tax_id,
            IndividualColumn::CompanyName => &mut self.company_name,
            IndividualColumn::ReferenceDate => &mut self.reference_date,
            IndividualColumn::Version => &mut self.version,
            IndividualColumn::CvmCode => &mut self.cvm_code,
            IndividualColumn::Category => &mut self.category,
            IndividualColumn::Type => &mut self.kind,
            IndividualColumn::DeliveryDate => &mut self.delivery_date,
            IndividualColumn::PresentationType => &mut self.presentation_type,
            IndividualColumn::RestatementReason => &mut self.restatement_reason,
            IndividualColumn::DeliveryProtocol => &mut self.delivery_protocol,
            IndividualColumn::DownloadLink => &mut self.download_link,
        };
        *slot = Some(value);
    }
}
