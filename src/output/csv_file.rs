use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

/// Byte-order mark so spreadsheet tools pick UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `rows` as comma-separated UTF-8 with a BOM and a header row taken
/// from the serialized field names. Written to a temp file, then renamed.
pub fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let tmp_path = path.with_extension("csv.tmp");
    let file =
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(UTF8_BOM)?;

    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing row to {}", tmp_path.display()))?;
    }
    let mut out = wtr
        .into_inner()
        .map_err(|e| anyhow!("flushing {}: {}", tmp_path.display(), e.error()))?;
    out.flush()?;
    drop(out);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{consolidate_family, TradeMovement};
    use crate::normalize::ConsolidatedFields;
    use tempfile::tempdir;

    #[test]
    fn writes_bom_header_and_non_ascii_text() {
        let rows = vec![ConsolidatedFields {
            company_tax_id: Some("00.000.000/0001-91".into()),
            company_name: Some("CIA SÃO JOSÉ".into()),
            reference_date: Some("2024-01-01".into()),
            version: Some("2".into()),
            movement_type: Some("Compra à vista".into()),
            movement_date: Some("2024-01-15".into()),
            quantity: Some("150".into()),
            unit_price: Some("10,5".into()),
            ..Default::default()
        }];
        let table = consolidate_family::<TradeMovement>(rows).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(table.rows(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("CompanyTaxId,CompanyName,ReferenceDate,Version,"));
        assert!(header.ends_with(",FamilyKind"));
        let row = lines.next().unwrap();
        assert!(row.contains("CIA SÃO JOSÉ"));
        assert!(row.contains("2024-01-01,2,"));
        assert!(row.contains("Compra à vista"));
        assert!(row.ends_with(",Consolidated"));
        assert!(!dir.path().join("out.csv.tmp").exists());
    }
}
