use anyhow::{Context, Result};
use askama::Template;
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::{group_thousands, ReportData};
use crate::consolidate::CompanyRef;

pub const LATEST_REPORT: &str = "latest_report.html";
pub const HISTORY_DIR: &str = "history";

struct FamilyRow {
    label: &'static str,
    total: String,
    new: String,
    unique: String,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    run_time: String,
    latest_period: &'a str,
    skipped_files: usize,
    families: Vec<FamilyRow>,
    companies: &'a [CompanyRef],
}

/// Render the report as a standalone HTML page. Interpolated text is escaped.
pub fn render_html(data: &ReportData) -> Result<String> {
    let page = ReportPage {
        run_time: data.run_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        latest_period: data.latest_period_label(),
        skipped_files: data.skipped_files,
        families: data
            .families
            .iter()
            .map(|f| FamilyRow {
                label: f.family.as_str(),
                total: group_thousands(f.total_records as i64),
                new: group_thousands(f.new_records),
                unique: group_thousands(f.unique_companies as i64),
            })
            .collect(),
        companies: &data.latest_companies,
    };
    page.render().context("rendering HTML report")
}

/// Write `latest_report.html` under `reports_dir`, keep a timestamped copy
/// in `history/` and prune the history to the newest `keep` copies.
/// Returns the path of the latest report.
pub fn publish(data: &ReportData, reports_dir: &Path, keep: usize) -> Result<PathBuf> {
    let history_dir = reports_dir.join(HISTORY_DIR);
    fs::create_dir_all(&history_dir)
        .with_context(|| format!("creating {}", history_dir.display()))?;

    let html = render_html(data)?;
    let latest = reports_dir.join(LATEST_REPORT);
    fs::write(&latest, &html).with_context(|| format!("writing {}", latest.display()))?;

    let backup = history_dir.join(format!("report_{}.html", data.run_time.format("%Y%m%d_%H%M%S")));
    fs::copy(&latest, &backup).with_context(|| format!("copying report to {}", backup.display()))?;
    info!(latest = %latest.display(), backup = %backup.display(), "report published");

    prune_history(&history_dir, keep)?;
    Ok(latest)
}

/// Remove all but the newest `keep` history copies. Names embed the
/// timestamp, so lexical order is chronological.
fn prune_history(history_dir: &Path, keep: usize) -> Result<()> {
    let pattern = history_dir.join("report_*.html");
    let mut backups: Vec<PathBuf> = glob(&pattern.to_string_lossy())
        .context("bad report history pattern")?
        .filter_map(|entry| entry.ok())
        .collect();
    backups.sort();

    let excess = backups.len().saturating_sub(keep);
    for old in &backups[..excess] {
        match fs::remove_file(old) {
            Ok(()) => debug!(path = %old.display(), "removed old report"),
            Err(e) => warn!(path = %old.display(), error = %e, "failed to remove old report"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn html_escapes_company_names() {
        let html = render_html(&sample()).unwrap();
        assert!(html.contains("ACME &lt;S.A.&gt;"));
        assert!(html.contains("BETA &amp; FILHOS"));
        assert!(!html.contains("ACME <S.A.>"));
        assert!(html.contains("1,234,567"));
        assert!(html.contains("Companies Reported in 2025-01"));
    }

    #[test]
    fn publish_keeps_newest_copies_only() {
        let dir = tempdir().unwrap();
        let mut data = sample();
        for _ in 0..4 {
            publish(&data, dir.path(), 2).unwrap();
            data.run_time += Duration::seconds(1);
        }

        assert!(dir.path().join(LATEST_REPORT).exists());
        let mut names: Vec<_> = fs::read_dir(dir.path().join(HISTORY_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["report_20250301_100502.html", "report_20250301_100503.html"]);
    }
}
