use chrono::NaiveDate;
use serde::Serialize;

use super::parse::{parse_date, parse_decimal, parse_version};
use super::ConsolidateError;
use crate::normalize::{ConsolidatedFields, FamilyKind, IndividualFields};

/// A typed, versioned disclosure that can be collapsed to its latest version.
pub trait Disclosure: Sized {
    /// Canonical row this disclosure is typed from.
    type Fields;
    /// Identity key. Its ordering starts with the reference date.
    type Key: Ord;
    const FAMILY: FamilyKind;

    /// Parse dates, version and numbers. `index` is the position in the
    /// family's concatenated input, for error reporting. Unparseable numeric
    /// cells become absent and are counted in `bad_numbers`.
    fn from_fields(
        fields: Self::Fields,
        index: usize,
        bad_numbers: &mut usize,
    ) -> Result<Self, ConsolidateError>;

    fn identity_key(&self) -> Self::Key;
    fn version(&self) -> Option<f64>;
    fn reference_date(&self) -> NaiveDate;
    fn company_tax_id(&self) -> Option<&str>;
    fn company_name(&self) -> Option<&str>;
}

/// One securities movement from a consolidated extract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradeMovement {
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub reference_date: NaiveDate,
    pub version: Option<f64>,
    pub company_type: Option<String>,
    pub company: Option<String>,
    pub position_type: Option<String>,
    pub movement_type: Option<String>,
    pub movement_description: Option<String>,
    pub operation_type: Option<String>,
    pub asset_type: Option<String>,
    pub security_characteristic: Option<String>,
    pub intermediary: Option<String>,
    pub movement_date: Option<NaiveDate>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub volume: Option<f64>,
    pub family_kind: FamilyKind,
}

/// One filing entry from an individual extract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndividualFiling {
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub reference_date: NaiveDate,
    pub version: Option<f64>,
    pub cvm_code: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub presentation_type: Option<String>,
    pub restatement_reason: Option<String>,
    pub delivery_protocol: Option<String>,
    pub download_link: Option<String>,
    pub family_kind: FamilyKind,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MovementKey {
    pub reference_date: NaiveDate,
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub movement_date: Option<NaiveDate>,
    pub movement_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilingKey {
    pub reference_date: NaiveDate,
    pub company_tax_id: Option<String>,
    pub company_name: Option<String>,
    pub cvm_code: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
}

fn required_date(
    family: FamilyKind,
    field: &'static str,
    value: Option<String>,
    index: usize,
) -> Result<NaiveDate, ConsolidateError> {
    let value = value.ok_or(ConsolidateError::MissingDate {
        family,
        field,
        index,
    })?;
    match parse_date(&value) {
        Some(d) => Ok(d),
        None => Err(ConsolidateError::InvalidDate {
            family,
            field,
            value,
            index,
        }),
    }
}

fn optional_date(
    family: FamilyKind,
    field: &'static str,
    value: Option<String>,
    index: usize,
) -> Result<Option<NaiveDate>, ConsolidateError> {
    match value {
        None => Ok(None),
        Some(v) => match parse_date(&v) {
            Some(d) => Ok(Some(d)),
            None => Err(ConsolidateError::InvalidDate {
                family,
                field,
                value: v,
                index,
            }),
        },
    }
}

fn number(value: Option<String>, bad_numbers: &mut usize) -> Option<f64> {
    let raw = value?;
    let parsed = parse_decimal(&raw);
    if parsed.is_none() {
        *bad_numbers += 1;
    }
    parsed
}

impl Disclosure for TradeMovement {
    type Fields = ConsolidatedFields;
    type Key = MovementKey;
    const FAMILY: FamilyKind = FamilyKind::Consolidated;

    fn from_fields(
        f: ConsolidatedFields,
        index: usize,
        bad_numbers: &mut usize,
    ) -> Result<Self, ConsolidateError> {
        let reference_date =
            required_date(Self::FAMILY, "ReferenceDate", f.reference_date, index)?;
        let movement_date = optional_date(Self::FAMILY, "MovementDate", f.movement_date, index)?;
        Ok(Self {
            company_tax_id: f.company_tax_id,
            company_name: f.company_name,
            reference_date,
            version: f.version.as_deref().and_then(parse_version),
            company_type: f.company_type,
            company: f.company,
            position_type: f.position_type,
            movement_type: f.movement_type,
            movement_description: f.movement_description,
            operation_type: f.operation_type,
            asset_type: f.asset_type,
            security_characteristic: f.security_characteristic,
            intermediary: f.intermediary,
            movement_date,
            quantity: number(f.quantity, bad_numbers),
            unit_price: number(f.unit_price, bad_numbers),
            volume: number(f.volume, bad_numbers),
            family_kind: Self::FAMILY,
        })
    }

    fn identity_key(&self) -> MovementKey {
        MovementKey {
            reference_date: self.reference_date,
            company_tax_id: self.company_tax_id.clone(),
            company_name: self.company_name.clone(),
            movement_date: self.movement_date,
            movement_type: self.movement_type.clone(),
        }
    }

    fn version(&self) -> Option<f64> {
        self.version
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn company_tax_id(&self) -> Option<&str> {
        self.company_tax_id.as_deref()
    }

    fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }
}

impl Disclosure for IndividualFiling {
    type Fields = IndividualFields;
    type Key = FilingKey;
    const FAMILY: FamilyKind = FamilyKind::Individual;

    fn from_fields(
        f: IndividualFields,
        index: usize,
        _bad_numbers: &mut usize,
    ) -> Result<Self, ConsolidateError> {
        let reference_date =
            required_date(Self::FAMILY, "ReferenceDate", f.reference_date, index)?;
        let delivery_date = optional_date(Self::FAMILY, "DeliveryDate", f.delivery_date, index)?;
        Ok(Self {
            company_tax_id: f.company_tax_id,
            company_name: f.company_name,
            reference_date,
            version: f.version.as_deref().and_then(parse_version),
            cvm_code: f.cvm_code,
            category: f.category,
            kind: f.kind,
            delivery_date,
            presentation_type: f.presentation_type,
            restatement_reason: f.restatement_reason,
            delivery_protocol: f.delivery_protocol,
            download_link: f.download_link,
            family_kind: Self::FAMILY,
        })
    }

    fn identity_key(&self) -> FilingKey {
        FilingKey {
            reference_date: self.reference_date,
            company_tax_id: self.company_tax_id.clone(),
            company_name: self.company_name.clone(),
            cvm_code: self.cvm_code.clone(),
            category: self.category.clone(),
            kind: self.kind.clone(),
        }
    }

    fn version(&self) -> Option<f64> {
        self.version
    }

    fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    fn company_tax_id(&self) -> Option<&str> {
        self.company_tax_id.as_deref()
    }

    fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }
}
