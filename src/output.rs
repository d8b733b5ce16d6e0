use crate::error::Result;
use crate::reports::ReportTable;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

pub fn write_csv(path: &Path, table: &ReportTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.header)?;
    for r in &table.rows {
        wtr.write_record(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows of a report.
///
/// Wide period tables are cut to the leading `max_cols` columns so the
/// preview stays readable in a terminal.
pub fn render_preview(table: &ReportTable, max_rows: usize, max_cols: usize) -> String {
    if table.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let width = table.header.len().min(max_cols);
    let clipped = width < table.header.len();

    let mut builder = Builder::default();
    let mut header: Vec<String> = table.header.iter().take(width).cloned().collect();
    if clipped {
        header.push("...".into());
    }
    builder.push_record(header);
    for row in table.rows.iter().take(max_rows) {
        let mut rec: Vec<String> = row.iter().take(width).cloned().collect();
        if clipped {
            rec.push("...".into());
        }
        builder.push_record(rec);
    }
    builder.build().with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> ReportTable {
        ReportTable {
            header: vec!["Geo_Region".into(), "Mutation".into(), "2021/01".into(), "2021/02".into()],
            rows: vec![
                vec!["EU".into(), "A1".into(), "1".into(), "1".into()],
                vec!["NA".into(), "B2".into(), "0".into(), "1".into()],
            ],
            undated: 0,
        }
    }

    #[test]
    fn csv_has_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &table()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Geo_Region,Mutation,2021/01,2021/02\nEU,A1,1,1\nNA,B2,0,1\n");
    }

    #[test]
    fn preview_clips_rows_and_columns() {
        let s = render_preview(&table(), 1, 3);
        assert!(s.contains("Geo_Region"));
        assert!(s.contains("..."));
        assert!(s.contains("EU"));
        assert!(!s.contains("NA"));
        assert!(!s.contains("2021/02"));
    }

    #[test]
    fn empty_preview() {
        let mut t = table();
        t.rows.clear();
        assert_eq!(render_preview(&t, 5, 5), "(no rows)");
    }
}
