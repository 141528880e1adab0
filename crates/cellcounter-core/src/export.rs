//! Result table rendering: CSV, clipboard text and JSON
//!
//! Numeric fields are rendered to 4 significant figures. The clipboard
//! format is tab-separated so it pastes straight into spreadsheets.

use std::path::Path;

use anyhow::{Context, Result};

use crate::results::ResultTable;

const HEADER: [&str; 6] = [
    "tab_label",
    "roi_label",
    "count",
    "concentration",
    "unit",
    "sample_volume",
];

/// Render to CSV: header, one row per ROI, one combined row.
pub fn to_csv(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str(&HEADER.join(","));
    out.push('\n');
    for row in &table.rows {
        let fields = [
            csv_field(&row.tab_label),
            csv_field(&row.roi_label),
            row.count.to_string(),
            sig_figs(row.concentration, 4),
            csv_field(row.unit),
            sig_figs(row.sample_volume_ml, 4),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Write the CSV rendering to a file.
pub fn write_csv(table: &ResultTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_csv(table))
        .with_context(|| format!("Failed to write CSV report to {:?}", path))
}

/// Tab-separated mirror of the on-screen result table, for clipboard copy.
pub fn to_clipboard_text(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str(&HEADER.join("\t"));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            row.tab_label,
            row.roi_label,
            row.count,
            sig_figs(row.concentration, 4),
            row.unit,
            sig_figs(row.sample_volume_ml, 4),
        ));
    }
    out
}

/// Pretty-printed JSON export of the result rows.
pub fn to_json(table: &ResultTable) -> Result<String> {
    serde_json::to_string_pretty(table).context("Failed to serialize result table")
}

/// Render a value to `figs` significant figures: positional notation in a
/// readable magnitude window, scientific outside it.
pub fn sig_figs(value: f64, figs: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    if (-4..6).contains(&magnitude) {
        let decimals = (figs as i32 - 1 - magnitude).max(0) as usize;
        format!("{value:.decimals$}")
    } else {
        format!("{value:.prec$e}", prec = figs - 1)
    }
}

fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultRow;

    fn sample_table() -> ResultTable {
        ResultTable {
            rows: vec![
                ResultRow {
                    tab_label: "tab 1".to_string(),
                    roi_label: "ROI 1".to_string(),
                    count: 50,
                    concentration: 500000.0,
                    unit: "cells/mL",
                    sample_volume_ml: 1.0,
                },
                ResultRow {
                    tab_label: "all".to_string(),
                    roi_label: "combined".to_string(),
                    count: 50,
                    concentration: 500000.0,
                    unit: "cells/mL",
                    sample_volume_ml: 1.0,
                },
            ],
        }
    }

    #[test]
    fn test_sig_figs() {
        assert_eq!(sig_figs(2000.0, 4), "2000");
        assert_eq!(sig_figs(1234.567, 4), "1235");
        assert_eq!(sig_figs(0.125, 4), "0.1250");
        assert_eq!(sig_figs(1234567.0, 4), "1.235e6");
        assert_eq!(sig_figs(0.0000123456, 4), "1.235e-5");
        assert_eq!(sig_figs(0.0, 4), "0");
    }

    #[test]
    fn test_csv_layout() {
        let csv = to_csv(&sample_table());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "tab_label,roi_label,count,concentration,unit,sample_volume"
        );
        assert_eq!(lines[1], "tab 1,ROI 1,50,500000,cells/mL,1.000");
        assert!(lines[2].starts_with("all,combined,"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_clipboard_text_is_tab_separated() {
        let text = to_clipboard_text(&sample_table());
        let first_row = text.lines().nth(1).unwrap();
        assert_eq!(first_row.split('\t').count(), 6);
    }
}
