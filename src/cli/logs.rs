use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;

pub fn run(limit: Option<usize>) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let entries = ledger.recent_logs(limit.unwrap_or(settings.log_window));
    if entries.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["When", "Activity"]);
    for entry in entries {
        let when = entry.timestamp.with_timezone(&chrono::Local);
        table.add_row(vec![
            Cell::new(when.format("%Y-%m-%d %H:%M")),
            Cell::new(&entry.message),
        ]);
    }
    println!("Recent Activity\n{table}");
    Ok(())
}
