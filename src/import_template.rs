use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

/// Columns the server's `/import-excel/` endpoint requires.
pub const IMPORT_COLUMNS: [&str; 4] = ["Team Name", "Category", "Season", "Group"];

pub const DEFAULT_TEMPLATE_NAME: &str = "sample_team_import.xlsx";

pub fn template_rows() -> Vec<Vec<String>> {
    let mut rows = vec![IMPORT_COLUMNS.iter().map(|c| c.to_string()).collect()];
    for (team, category, season, group) in [
        ("ABAM FC", "senior_boys", "2025 SENIOR BOYS CUP", "Group A"),
        ("LAGURU", "senior_boys", "2025 SENIOR BOYS CUP", "Group B"),
        ("UMUOSU QUEENS", "girls", "2025 GIRLS CUP", "Group A"),
        ("EZIAMA JUNIORS", "junior_boys", "2025 JUNIOR BOYS CUP", "Group A"),
    ] {
        rows.push(vec![
            team.to_string(),
            category.to_string(),
            season.to_string(),
            group.to_string(),
        ]);
    }
    rows
}

/// Writes a one-sheet workbook with the import header and example rows.
/// Returns the number of example rows.
pub fn write_import_template(path: &Path) -> Result<usize> {
    let rows = template_rows();
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Teams")?;
        write_rows(sheet, &rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(rows.len().saturating_sub(1))
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_start_with_required_header() {
        let rows = template_rows();
        assert_eq!(rows[0], IMPORT_COLUMNS.map(String::from).to_vec());
        assert!(rows[1..].iter().all(|row| row.len() == IMPORT_COLUMNS.len()));
    }

    #[test]
    fn writes_xlsx_file() {
        let dir = std::env::temp_dir().join(format!("unity_cup_template_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(DEFAULT_TEMPLATE_NAME);

        let written = write_import_template(&path).expect("template written");

        assert_eq!(written, 4);
        let bytes = std::fs::read(&path).expect("read back");
        assert_eq!(&bytes[..2], b"PK");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
