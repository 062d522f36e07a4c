use super::{group_thousands, FamilySummary, ReportData};

const RULE_WIDTH: usize = 50;

/// Plain-text summary for stdout.
pub fn render_console(data: &ReportData) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let period = data.latest_period_label();

    let mut lines = vec![
        String::new(),
        rule.clone(),
        "CVM Trading Disclosure Report".to_string(),
        rule.clone(),
        String::new(),
        format!("Run Time: {}", data.run_time.format("%Y-%m-%d %H:%M:%S")),
        format!("Latest Data Available: {}", period),
        String::new(),
    ];

    let sections: [(&str, fn(&FamilySummary) -> i64); 3] = [
        ("Total Records", |f| f.total_records as i64),
        ("New Records Since Last Run", |f| f.new_records),
        ("Unique Companies", |f| f.unique_companies as i64),
    ];
    for (title, value) in sections {
        lines.push(format!("{}:", title));
        lines.extend(
            data.families
                .iter()
                .map(|f| format!("  * {}: {}", f.family, group_thousands(value(f)))),
        );
        lines.push(String::new());
    }

    if data.skipped_files > 0 {
        lines.push(format!("Skipped files: {}", data.skipped_files));
        lines.push(String::new());
    }
    lines.push(format!(
        "Companies reported in {}: {}",
        period,
        data.latest_companies.len()
    ));
    lines.push(rule);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample;

    #[test]
    fn console_lists_every_family_with_grouped_counts() {
        let text = render_console(&sample());
        assert!(text.contains("Run Time: 2025-03-01 10:05:00"));
        assert!(text.contains("Latest Data Available: 2025-01"));
        assert!(text.contains("  * Consolidated: 1,234,567"));
        assert!(text.contains("  * Consolidated: -30"));
        assert!(text.contains("  * Individual: 9"));
        assert!(text.contains("Skipped files: 1"));
        assert!(text.contains("Companies reported in 2025-01: 2"));
    }

    #[test]
    fn clean_run_has_no_skipped_line_and_ends_with_rule() {
        let data = ReportData {
            skipped_files: 0,
            ..sample()
        };
        let text = render_console(&data);
        assert!(!text.contains("Skipped files"));
        assert!(text.starts_with("\n="));
        assert!(text.ends_with(&format!("{}\n", "=".repeat(RULE_WIDTH))));
    }
}
