//! Run summaries for people: console text and an HTML page with history.

pub mod console;
pub mod html;

pub use console::render_console;
pub use html::{publish, render_html};

use chrono::NaiveDateTime;

use crate::{consolidate::CompanyRef, normalize::FamilyKind, pipeline::RunOutcome};

/// Counts shown for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySummary {
    pub family: FamilyKind,
    pub total_records: u64,
    pub new_records: i64,
    pub unique_companies: u64,
}

/// Everything a report renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    pub run_time: NaiveDateTime,
    /// `YYYY-MM` of the newest consolidated reference date.
    pub latest_period: Option<String>,
    pub families: Vec<FamilySummary>,
    /// Companies with consolidated disclosures in the latest period, by name.
    pub latest_companies: Vec<CompanyRef>,
    pub skipped_files: usize,
}

impl ReportData {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let latest = outcome.consolidated.latest_reference_date();
        let families = FamilyKind::ALL
            .into_iter()
            .map(|family| {
                let delta = outcome.delta.family(family);
                FamilySummary {
                    family,
                    total_records: delta.total_records,
                    new_records: delta.new_records,
                    unique_companies: delta.unique_entities,
                }
            })
            .collect();

        Self {
            run_time: outcome.run_time,
            latest_period: latest.map(|d| d.format("%Y-%m").to_string()),
            families,
            latest_companies: latest
                .map(|d| outcome.consolidated.companies_on(d))
                .unwrap_or_default(),
            skipped_files: outcome.skipped.len(),
        }
    }

    pub fn latest_period_label(&self) -> &str {
        self.latest_period.as_deref().unwrap_or("n/a")
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn sample() -> ReportData {
        ReportData {
            run_time: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(10, 5, 0)
                .unwrap(),
            latest_period: Some("2025-01".into()),
            families: vec![
                FamilySummary {
                    family: FamilyKind::Consolidated,
                    total_records: 1_234_567,
                    new_records: -30,
                    unique_companies: 412,
                },
                FamilySummary {
                    family: FamilyKind::Individual,
                    total_records: 9,
                    new_records: 9,
                    unique_companies: 3,
                },
            ],
            latest_companies: vec![
                CompanyRef {
                    tax_id: "11.111.111/0001-11".into(),
                    name: "ACME <S.A.>".into(),
                },
                CompanyRef {
                    tax_id: "22.222.222/0001-22".into(),
                    name: "BETA & FILHOS".into(),
                },
            ],
            skipped_files: 1,
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-30), "-30");
        assert_eq!(group_thousands(-12_345), "-12,345");
    }

    #[test]
    fn missing_period_has_a_label() {
        let data = ReportData {
            latest_period: None,
            ..sample()
        };
        assert_eq!(data.latest_period_label(), "n/a");
        assert_eq!(sample().latest_period_label(), "2025-01");
    }
}
