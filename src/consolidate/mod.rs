//! Version resolution: collapse every logical disclosure to its latest
//! version and order the result by reference date.

pub mod disclosure;
pub mod parse;

pub use disclosure::{Disclosure, FilingKey, IndividualFiling, MovementKey, TradeMovement};

use chrono::NaiveDate;
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

use crate::normalize::FamilyKind;

/// Structural faults that abort a run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsolidateError {
    #[error("{family} record #{index}: {field} is missing")]
    MissingDate {
        family: FamilyKind,
        field: &'static str,
        index: usize,
    },
    #[error("{family} record #{index}: cannot parse {field} {value:?}")]
    InvalidDate {
        family: FamilyKind,
        field: &'static str,
        value: String,
        index: usize,
    },
}

/// A company as it appears in a disclosure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompanyRef {
    pub tax_id: String,
    pub name: String,
}

/// Deduplicated disclosures of one family: one row per identity key, each
/// in its highest version, ordered by reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable<T> {
    rows: Vec<T>,
}

impl<T> Default for ConsolidatedTable<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Disclosure> ConsolidatedTable<T> {
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct `CompanyTaxId` values; rows without one are not counted.
    pub fn unique_entities(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|r| r.company_tax_id())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn latest_reference_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.reference_date()).max()
    }

    /// Companies with a disclosure on `date`, sorted by name.
    pub fn companies_on(&self, date: NaiveDate) -> Vec<CompanyRef> {
        let distinct: BTreeSet<(String, String)> = self
            .rows
            .iter()
            .filter(|r| r.reference_date() == date)
            .map(|r| {
                (
                    r.company_name().unwrap_or_default().to_string(),
                    r.company_tax_id().unwrap_or_default().to_string(),
                )
            })
            .collect();
        distinct
            .into_iter()
            .map(|(name, tax_id)| CompanyRef { tax_id, name })
            .collect()
    }
}

/// Group by identity key and keep the highest version of each group.
///
/// A missing version ranks below every numeric one. Among records tied on the
/// maximum version, the first one encountered in `records` is kept. Output is
/// ordered by identity key, whose leading component is the reference date.
pub fn consolidate<T, I>(records: I) -> ConsolidatedTable<T>
where
    T: Disclosure,
    I: IntoIterator<Item = T>,
{
    let mut groups: BTreeMap<T::Key, T> = BTreeMap::new();
    for record in records {
        match groups.entry(record.identity_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.version() > slot.get().version() {
                    slot.insert(record);
                }
            }
        }
    }
    ConsolidatedTable {
        rows: groups.into_values().collect(),
    }
}

/// Type every canonical row of one family, then consolidate.
///
/// Fails on the first row whose reference or secondary date is missing
/// (reference only) or unparseable.
pub fn consolidate_family<T: Disclosure>(
    rows: Vec<T::Fields>,
) -> Result<ConsolidatedTable<T>, ConsolidateError> {
    let family = T::FAMILY;
    let input = rows.len();
    let mut bad_numbers = 0usize;

    let typed = rows
        .into_iter()
        .enumerate()
        .map(|(index, fields)| T::from_fields(fields, index, &mut bad_numbers))
        .collect::<Result<Vec<T>, _>>()?;

    if bad_numbers > 0 {
        warn!(%family, cells = bad_numbers, "unparseable numeric cells left empty");
    }

    let table = consolidate(typed);
    log_summary(family, input, &table);
    Ok(table)
}

fn log_summary<T: Disclosure>(family: FamilyKind, input: usize, table: &ConsolidatedTable<T>) {
    let versions = table.rows.iter().filter_map(|r| r.version());
    let (min_version, max_version) = versions.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |lo: f64| lo.min(v))),
            Some(hi.map_or(v, |hi: f64| hi.max(v))),
        )
    });
    let reference_dates = table
        .rows
        .iter()
        .map(|r| r.reference_date())
        .collect::<BTreeSet<_>>()
        .len();

    info!(
        %family,
        input,
        rows = table.len(),
        min_version = ?min_version,
        max_version = ?max_version,
        reference_dates,
        "consolidated"
    );
}
