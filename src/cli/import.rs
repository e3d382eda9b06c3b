use std::path::PathBuf;

use colored::Colorize;

use crate::cli::categories::swatch;
use crate::cli::open_ledger;
use crate::error::Result;
use crate::importer::parse_tabular;

pub fn run(file: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    let (_, mut ledger) = open_ledger()?;

    let rows = parse_tabular(&file_path)?;
    let today = chrono::Local::now().date_naive();
    let plan = ledger.plan_import(&rows, today)?;

    let unmapped = plan.mapping.unmapped();
    if !unmapped.is_empty() {
        println!(
            "{}",
            format!("No column found for: {}", unmapped.join(", ")).yellow()
        );
    }

    let result = ledger.import(plan)?;
    for category in &result.categories_created {
        println!(
            "New category: {} {} ({})",
            swatch(&category.color),
            category.name,
            category.kind
        );
    }
    println!(
        "{} Imported {} transactions from {}",
        "\u{2713}".green(),
        result.imported,
        file_path.display()
    );
    Ok(())
}
