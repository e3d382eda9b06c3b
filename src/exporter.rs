use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::Transaction;

pub const CSV_HEADERS: [&str; 6] = ["Date", "Type", "Category", "SubCategory", "Details", "Amount"];

const TEMPLATE_HEADERS: [&str; 5] = ["Date", "Type", "Category", "Details", "Amount"];
const TEMPLATE_ROWS: [[&str; 5]; 2] = [
    ["2026-01-20", "expense", "Food", "Lunch at Cafe", "15"],
    ["2026-01-20", "income", "Salary", "Month End Salary", "5000"],
];

/// `<dir>/<title lowercased>_<YYYY-MM-DD>.<ext>`
pub fn default_path(dir: &Path, title: &str, ext: &str, today: NaiveDate) -> PathBuf {
    dir.join(format!(
        "{}_{}.{ext}",
        title.trim().to_lowercase(),
        today.format("%Y-%m-%d")
    ))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn write_csv(rows: &[&Transaction], path: &Path) -> Result<usize> {
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CSV_HEADERS)?;
    for t in rows {
        wtr.write_record([
            t.date.format("%Y-%m-%d").to_string(),
            t.kind.as_str().to_string(),
            t.category.clone(),
            t.sub_category.clone().unwrap_or_default(),
            t.details.clone(),
            t.amount.to_string(),
        ])?;
    }
    wtr.flush()?;
    log::info!("exported {} transactions to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Sample import file with the columns the importer recognizes.
pub fn write_template(path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(TEMPLATE_HEADERS)?;
    for row in TEMPLATE_ROWS {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
