//! Schema normalization: decode CVM extracts and map their columns onto the
//! canonical field set of each family.

pub mod columns;
pub mod family;
pub mod record;

pub use family::FamilyKind;
pub use record::{CanonicalRecord, CanonicalRow, ConsolidatedFields, IndividualFields};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::{fs, path::Path};
use tracing::{debug, error, info, instrument};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One delimited text file as handed over by retrieval, still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path or archive entry name; drives family classification.
    pub name: String,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents =
            fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), contents))
    }
}

/// A file dropped by the normalizer, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Never emit individual-family rows.
    pub consolidated_only: bool,
}

/// Canonical rows of one run, split by family, in file-then-row order.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub consolidated: Vec<ConsolidatedFields>,
    pub individual: Vec<IndividualFields>,
    pub skipped: Vec<SkippedFile>,
    pub files_read: usize,
}

impl NormalizedBatch {
    fn push(&mut self, record: CanonicalRecord) {
        match record {
            CanonicalRecord::Consolidated(fields) => self.consolidated.push(fields),
            CanonicalRecord::Individual(fields) => self.individual.push(fields),
        }
    }
}

/// Decode every file and translate its rows.
///
/// A file that fails to decode is skipped as a whole and reported in
/// `NormalizedBatch::skipped`; the remaining files are unaffected.
#[instrument(level = "info", skip_all)]
pub fn normalize<I>(files: I, options: NormalizeOptions) -> NormalizedBatch
where
    I: IntoIterator<Item = SourceFile>,
{
    let mut batch = NormalizedBatch::default();

    for file in files {
        let family = FamilyKind::classify(&file.name);
        if options.consolidated_only && family == FamilyKind::Individual {
            debug!(file = %file.name, "consolidated-only mode, skipping individual file");
            continue;
        }

        match decode_file(&file, family) {
            Ok(records) => {
                info!(file = %file.name, %family, rows = records.len(), "processing file");
                batch.files_read += 1;
                for record in records {
                    batch.push(record);
                }
            }
            Err(e) => {
                error!(file = %file.name, error = %e, "error processing file, skipping");
                batch.skipped.push(SkippedFile {
                    name: file.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    batch
}

fn decode_file(file: &SourceFile, family: FamilyKind) -> Result<Vec<CanonicalRecord>, csv::Error> {
    Ok(match family {
        FamilyKind::Consolidated => decode_rows::<ConsolidatedFields>(&file.contents)?
            .into_iter()
            .map(CanonicalRecord::Consolidated)
            .collect(),
        FamilyKind::Individual => decode_rows::<IndividualFields>(&file.contents)?
            .into_iter()
            .map(CanonicalRecord::Individual)
            .collect(),
    })
}

/// Windows-1252 characters for bytes 0x80..=0x9F. Unassigned bytes keep
/// their Latin-1 (C1 control) code point.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Windows-1252: Latin-1 everywhere except 0x80..=0x9F, where the
/// typographic characters (`€`, curly quotes, dashes) live.
pub fn decode_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
            _ => char::from(b),
        })
        .collect()
}

/// Parse `;`-separated text with a header row into canonical rows of `R`.
/// Any malformed row fails the whole file.
pub fn decode_rows<R: CanonicalRow>(bytes: &[u8]) -> Result<Vec<R>, csv::Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = decode_cp1252(bytes);

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    // column index -> canonical field, resolved once per file
    let plan: Vec<Option<R::Column>> = rdr.headers()?.iter().map(R::column).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut row = R::default();
        for (column, value) in plan.iter().zip(record.iter()) {
            if let Some(column) = column {
                if !value.is_empty() {
                    row.set(*column, value.to_string());
                }
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
