use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::Arc,
};

use crate::consolidate::{Disclosure, IndividualFiling, TradeMovement};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A consolidated row type with a fixed Arrow layout.
pub trait ArrowTable: Sized {
    fn schema() -> Schema;
    /// One array per schema field, in schema order.
    fn to_arrays(rows: &[Self]) -> Vec<ArrayRef>;
}

fn date32(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn utf8<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> Option<&'a str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn dates<T>(rows: &[T], f: impl Fn(&T) -> Option<NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from(
        rows.iter().map(|r| f(r).map(date32)).collect::<Vec<_>>(),
    ))
}

fn floats<T>(rows: &[T], f: impl Fn(&T) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn versions<T: Disclosure>(rows: &[T]) -> ArrayRef {
    floats(rows, |r| r.version())
}

fn family<T: Disclosure>(rows: &[T]) -> ArrayRef {
    Arc::new(StringArray::from(vec![T::FAMILY.as_str(); rows.len()]))
}

fn text(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true)
}

impl ArrowTable for TradeMovement {
    fn schema() -> Schema {
        Schema::new(vec![
            text("CompanyTaxId"),
            text("CompanyName"),
            Field::new("ReferenceDate", DataType::Date32, false),
            Field::new("Version", DataType::Float64, true),
            text("CompanyType"),
            text("Company"),
            text("PositionType"),
            text("MovementType"),
            text("MovementDescription"),
            text("OperationType"),
            text("AssetType"),
            text("SecurityCharacteristic"),
            text("Intermediary"),
            Field::new("MovementDate", DataType::Date32, true),
            Field::new("Quantity", DataType::Float64, true),
            Field::new("UnitPrice", DataType::Float64, true),
            Field::new("Volume", DataType::Float64, true),
            Field::new("FamilyKind", DataType::Utf8, false),
        ])
    }

    fn to_arrays(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            utf8(rows, |r| r.company_tax_id.as_deref()),
            utf8(rows, |r| r.company_name.as_deref()),
            dates(rows, |r| Some(r.reference_date)),
            versions(rows),
            utf8(rows, |r| r.company_type.as_deref()),
            utf8(rows, |r| r.company.as_deref()),
            utf8(rows, |r| r.position_type.as_deref()),
            utf8(rows, |r| r.movement_type.as_deref()),
            utf8(rows, |r| r.movement_description.as_deref()),
            utf8(rows, |r| r.operation_type.as_deref()),
            utf8(rows, |r| r.asset_type.as_deref()),
            utf8(rows, |r| r.security_characteristic.as_deref()),
            utf8(rows, |r| r.intermediary.as_deref()),
            dates(rows, |r| r.movement_date),
            floats(rows, |r| r.quantity),
            floats(rows, |r| r.unit_price),
            floats(rows, |r| r.volume),
            family(rows),
        ]
    }
}

impl ArrowTable for IndividualFiling {
    fn schema() -> Schema {
        Schema::new(vec![
            text("CompanyTaxId"),
            text("CompanyName"),
            Field::new("ReferenceDate", DataType::Date32, false),
            Field::new("Version", DataType::Float64, true),
            text("CvmCode"),
            text("Category"),
            text("Type"),
            Field::new("DeliveryDate", DataType::Date32, true),
            text("PresentationType"),
            text("RestatementReason"),
            text("DeliveryProtocol"),
            text("DownloadLink"),
            Field::new("FamilyKind", DataType::Utf8, false),
        ])
    }

    fn to_arrays(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            utf8(rows, |r| r.company_tax_id.as_deref()),
            utf8(rows, |r| r.company_name.as_deref()),
            dates(rows, |r| Some(r.reference_date)),
            versions(rows),
            utf8(rows, |r| r.cvm_code.as_deref()),
            utf8(rows, |r| r.category.as_deref()),
            utf8(rows, |r| r.kind.as_deref()),
            dates(rows, |r| r.delivery_date),
            utf8(rows, |r| r.presentation_type.as_deref()),
            utf8(rows, |r| r.restatement_reason.as_deref()),
            utf8(rows, |r| r.delivery_protocol.as_deref()),
            utf8(rows, |r| r.download_link.as_deref()),
            family(rows),
        ]
    }
}

/// Write `rows` as a single SNAPPY-compressed Parquet file (temp + rename).
pub fn write_parquet<T: ArrowTable>(rows: &[T], path: &Path) -> Result<()> {
    let schema = Arc::new(T::schema());
    let batch = RecordBatch::try_new(schema.clone(), T::to_arrays(rows))
        .context("building record batch")?;

    let tmp_path = path.with_extension("parquet.tmp");
    let file =
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing Arrow writer")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}
