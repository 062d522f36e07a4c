//! One run of the core: normalize, consolidate, persist, track the delta.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::{
    config::Config,
    consolidate::{consolidate_family, ConsolidatedTable, IndividualFiling, TradeMovement},
    delta::{DeltaTracker, FamilyCounts, RunDelta, RunSnapshot},
    normalize::{normalize, FamilyKind, NormalizeOptions, SkippedFile, SourceFile},
    output::write_table,
};

/// Format of snapshot timestamps and report run times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a successful run hands to reporting.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_time: NaiveDateTime,
    pub consolidated: ConsolidatedTable<TradeMovement>,
    pub individual: ConsolidatedTable<IndividualFiling>,
    pub delta: RunDelta,
    pub skipped: Vec<SkippedFile>,
    pub outputs: Vec<PathBuf>,
}

fn snapshot(
    timestamp: String,
    consolidated: &ConsolidatedTable<TradeMovement>,
    individual: &ConsolidatedTable<IndividualFiling>,
) -> RunSnapshot {
    let mut snapshot = RunSnapshot {
        timestamp,
        ..Default::default()
    };
    let counts = [
        (FamilyKind::Consolidated, consolidated.len(), consolidated.unique_entities()),
        (FamilyKind::Individual, individual.len(), individual.unique_entities()),
    ];
    for (family, total, unique) in counts {
        snapshot.total_records.set(family, total as u64);
        snapshot.unique_companies.set(family, unique as u64);
    }
    snapshot
}

/// Run the core over an already retrieved batch.
///
/// Both families are typed and consolidated before anything is written, so a
/// structural fault leaves outputs and the stored snapshot untouched. The
/// snapshot is only replaced once every output has been saved.
#[instrument(level = "info", skip_all, fields(files = files.len()))]
pub fn run(files: Vec<SourceFile>, config: &Config, now: NaiveDateTime) -> Result<RunOutcome> {
    let batch = normalize(
        files,
        NormalizeOptions {
            consolidated_only: config.consolidated_only,
        },
    );
    info!(
        files_read = batch.files_read,
        skipped = batch.skipped.len(),
        consolidated_rows = batch.consolidated.len(),
        individual_rows = batch.individual.len(),
        "normalized"
    );

    let consolidated = consolidate_family::<TradeMovement>(batch.consolidated)
        .context("consolidating consolidated disclosures")?;
    let individual = consolidate_family::<IndividualFiling>(batch.individual)
        .context("consolidating individual disclosures")?;

    let mut outputs = write_table(&consolidated, &config.datasets_dir, config.write_parquet)?;
    outputs.extend(write_table(&individual, &config.datasets_dir, config.write_parquet)?);

    let current = snapshot(now.format(TIMESTAMP_FORMAT).to_string(), &consolidated, &individual);
    let delta = DeltaTracker::new(config.history_path()).record(&current)?;

    Ok(RunOutcome {
        run_time: now,
        consolidated,
        individual,
        delta,
        skipped: batch.skipped,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::ConsolidateError;
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    const CON_HEADER: &str =
        "CNPJ_Companhia;Nome_Companhia;Data_Referencia;Versao;Tipo_Movimentacao;Tipo_Ativo;Data_Movimentacao;Quantidade;Preco_Unitario";

    fn config(dir: &TempDir) -> Config {
        Config {
            datasets_dir: dir.path().join("datasets"),
            reports_dir: dir.path().join("reports"),
            zips_dir: dir.path().join("zips"),
            ..Default::default()
        }
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn con_file(name: &str, rows: &[&str]) -> SourceFile {
        let mut text = format!("{}\n", CON_HEADER);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        SourceFile::new(name, text.into_bytes())
    }

    #[test]
    fn end_to_end_keeps_latest_version_and_tracks_delta() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let files = vec![
            con_file(
                "vlmo_cia_aberta_con_2024.csv",
                &[
                    "11;ACME;2024-01-01;1;Compra;Ações;2024-01-10;100;10,00",
                    "11;ACME;2024-01-01;2;Compra;Ações;2024-01-10;150;10,00",
                    "22;BETA;2024-02-01;1;Venda;Ações;2024-02-03;50;1.234,50",
                ],
            ),
            // ragged row: the whole file is skipped
            con_file("vlmo_cia_aberta_con_2023.csv", &["33;GAMMA;2023-01-01;1;Compra"]),
            SourceFile::new(
                "vlmo_cia_aberta_2024.csv",
                b"CNPJ_Companhia;Nome_Companhia;Data_Referencia;Versao;Tipo\n11;ACME;2024-01-01;1;ITR\n".to_vec(),
            ),
        ];

        let outcome = run(files, &config, at(10)).unwrap();
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.consolidated.len(), 2);
        let first = &outcome.consolidated.rows()[0];
        assert_eq!(first.version, Some(2.0));
        assert_eq!(first.quantity, Some(150.0));
        assert_eq!(outcome.consolidated.rows()[1].unit_price, Some(1234.5));
        assert_eq!(outcome.individual.len(), 1);

        assert_eq!(outcome.delta.consolidated.new_records, 2);
        assert_eq!(outcome.delta.consolidated.unique_entities, 2);
        assert_eq!(outcome.delta.individual.total_records, 1);
        assert!(config.datasets_dir.join("Brazil_Stock_Trading_Consolidated.csv").exists());
        assert!(config.datasets_dir.join("Brazil_Stock_Trading_Individual.parquet").exists());

        let stored = DeltaTracker::new(config.history_path()).previous().unwrap();
        assert_eq!(stored.timestamp, "2025-03-01 10:00:00");
        assert_eq!(stored.total_records.get(FamilyKind::Consolidated), 2);

        // same input again: nothing new
        let again = vec![con_file(
            "vlmo_cia_aberta_con_2024.csv",
            &[
                "11;ACME;2024-01-01;2;Compra;Ações;2024-01-10;150;10,00",
                "22;BETA;2024-02-01;1;Venda;Ações;2024-02-03;50;1.234,50",
            ],
        )];
        let outcome = run(again, &config, at(11)).unwrap();
        assert_eq!(outcome.delta.consolidated.new_records, 0);
        assert_eq!(outcome.delta.individual.new_records, -1);
    }

    #[test]
    fn date_fault_aborts_before_any_write() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let files = vec![con_file(
            "vlmo_cia_aberta_con_2024.csv",
            &[
                "11;ACME;2024-01-01;1;Compra;Ações;2024-01-10;100;10,00",
                "22;BETA;not-a-date;1;Venda;Ações;2024-02-03;50;1,00",
            ],
        )];

        let err = run(files, &config, at(10)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConsolidateError>(),
            Some(ConsolidateError::InvalidDate { index: 1, .. })
        ));
        assert!(!config.datasets_dir.exists());
        assert!(!config.history_path().exists());
    }

    #[test]
    fn consolidated_only_run_leaves_individual_empty() {
        let dir = tempdir().unwrap();
        let config = Config {
            consolidated_only: true,
            write_parquet: false,
            ..config(&dir)
        };
        let files = vec![
            con_file("vlmo_cia_aberta_con_2024.csv", &["11;ACME;2024-01-01;1;Compra;Ações;;;"]),
            SourceFile::new(
                "vlmo_cia_aberta_2024.csv",
                b"CNPJ_Companhia;Nome_Companhia;Data_Referencia;Tipo\n11;ACME;2024-01-01;ITR\n".to_vec(),
            ),
        ];
        let outcome = run(files, &config, at(9)).unwrap();
        assert!(outcome.individual.is_empty());
        assert_eq!(
            outcome.outputs,
            vec![config.datasets_dir.join("Brazil_Stock_Trading_Consolidated.csv")]
        );
    }
}
