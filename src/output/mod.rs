//! Persistence of consolidated tables: one CSV (and optionally one Parquet
//! file) per family.

pub mod csv_file;
pub mod parquet_file;

pub use csv_file::write_csv;
pub use parquet_file::{write_parquet, ArrowTable};

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::consolidate::{ConsolidatedTable, Disclosure};
use crate::normalize::FamilyKind;

/// File stem of a family's output, shared by CSV and Parquet.
pub fn file_stem(family: FamilyKind) -> String {
    format!("Brazil_Stock_Trading_{}", family.as_str())
}

/// Write one family's table under `dir`. An empty table writes nothing.
/// Returns the paths written.
pub fn write_table<T>(
    table: &ConsolidatedTable<T>,
    dir: &Path,
    with_parquet: bool,
) -> Result<Vec<PathBuf>>
where
    T: Disclosure + Serialize + ArrowTable,
{
    let family = T::FAMILY;
    if table.is_empty() {
        info!(%family, "no rows, nothing written");
        return Ok(Vec::new());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let stem = file_stem(family);
    let csv_path = dir.join(format!("{}.csv", stem));
    write_csv(table.rows(), &csv_path)?;
    info!(%family, rows = table.len(), path = %csv_path.display(), "saved csv");
    let mut written = vec![csv_path];

    if with_parquet {
        let parquet_path = dir.join(format!("{}.parquet", stem));
        write_parquet(table.rows(), &parquet_path)?;
        info!(%family, path = %parquet_path.display(), "saved parquet");
        written.push(parquet_path);
    }
    Ok(written)
}
