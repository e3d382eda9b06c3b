use std::path::{Path, PathBuf};

use crate::cli::{open_ledger, PeriodArgs};
use crate::error::Result;
use crate::exporter;

fn output_path(output: Option<String>, exports_dir: &Path, title: &str, ext: &str) -> PathBuf {
    output.map(PathBuf::from).unwrap_or_else(|| {
        exporter::default_path(exports_dir, title, ext, chrono::Local::now().date_naive())
    })
}

pub fn template(output: Option<String>) -> Result<()> {
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("import_template.csv"));
    exporter::write_template(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn csv(period: &PeriodArgs, title: &str, output: Option<String>) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let filter = period.filter()?;
    let rows = ledger.transactions_in(&filter);
    let path = output_path(output, &settings.exports_dir(), title, "csv");
    let count = exporter::write_csv(&rows, &path)?;
    println!("Wrote {count} transactions ({}) to {}", filter.label(), path.display());
    Ok(())
}

#[cfg(feature = "pdf")]
pub fn pdf(period: &PeriodArgs, title: &str, output: Option<String>) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let filter = period.filter()?;
    let rows = ledger.transactions_in(&filter);
    let bytes = crate::pdf::render_table(&rows, title, &filter.label())?;
    let path = output_path(output, &settings.exports_dir(), title, "pdf");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, bytes)?;
    log::info!("exported {} transactions to {}", rows.len(), path.display());
    println!("Wrote {}", path.display());
    Ok(())
}
