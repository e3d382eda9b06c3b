use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::models::{CategoryDraft, CategoryPatch, TxnType};
use crate::palette::rgb;

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A colored block for the category's hex color, or the hex text when it
/// cannot be parsed.
pub(crate) fn swatch(hex: &str) -> String {
    match rgb(hex) {
        Some((r, g, b)) => "\u{25A0}".truecolor(r, g, b).to_string(),
        None => hex.to_string(),
    }
}

pub fn add(name: &str, kind: &str, sub_category: Option<String>, notes: Option<String>) -> Result<()> {
    let (_, mut ledger) = open_ledger()?;
    let category = ledger.add_category(CategoryDraft {
        name: name.to_string(),
        kind: kind.parse()?,
        sub_category: non_empty(sub_category),
        notes: non_empty(notes),
    })?;
    println!(
        "Added category: {} {} ({})",
        swatch(&category.color),
        category.name,
        category.kind
    );
    Ok(())
}

pub fn edit(
    id: i64,
    name: Option<String>,
    kind: Option<String>,
    sub_category: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let (_, mut ledger) = open_ledger()?;
    let patch = CategoryPatch {
        name: name.map(|n| n.trim().to_string()),
        kind: kind.as_deref().map(str::parse::<TxnType>).transpose()?,
        sub_category: sub_category.map(|s| non_empty(Some(s))),
        notes: notes.map(|n| non_empty(Some(n))),
    };
    let category = ledger.update_category(id, patch)?;
    println!("Updated category #{}: {}", category.id, category.name);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (_, mut ledger) = open_ledger()?;
    let removed = ledger.delete_category(id)?;
    let still_used = ledger
        .transactions()
        .iter()
        .filter(|t| t.category == removed.name)
        .count();
    println!("Deleted category: {}", removed.name);
    if still_used > 0 {
        println!(
            "{}",
            format!("{still_used} transactions still reference '{}'", removed.name).yellow()
        );
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, ledger) = open_ledger()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "", "Name", "Type", "Sub Category", "Notes"]);
    for c in ledger.categories() {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(swatch(&c.color)),
            Cell::new(&c.name),
            Cell::new(c.kind),
            Cell::new(c.sub_category.as_deref().unwrap_or("")),
            Cell::new(c.notes.as_deref().unwrap_or("")),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
