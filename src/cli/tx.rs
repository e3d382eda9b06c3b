use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{open_ledger, parse_date_arg, PeriodArgs};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{NewTransaction, TransactionPatch, TxnType};

pub struct TxArgs {
    pub amount: f64,
    pub kind: String,
    pub category: String,
    pub details: String,
    pub sub_category: Option<String>,
    pub date: Option<String>,
}

pub fn add(args: TxArgs) -> Result<()> {
    let (settings, mut ledger) = open_ledger()?;
    let date = match args.date.as_deref() {
        Some(raw) => parse_date_arg(raw)?,
        None => chrono::Local::now().date_naive(),
    };
    let txn = ledger.add_transaction(NewTransaction {
        date,
        kind: args.kind.parse()?,
        category: args.category.trim().to_string(),
        sub_category: args.sub_category.filter(|s| !s.trim().is_empty()),
        details: args.details.trim().to_string(),
        amount: args.amount,
    })?;
    println!(
        "Added {} #{}: {} {}",
        txn.kind,
        txn.id,
        txn.details,
        money(txn.amount, &settings.currency_symbol)
    );
    Ok(())
}

pub struct TxEditArgs {
    pub amount: Option<f64>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub details: Option<String>,
    pub sub_category: Option<String>,
    pub clear_sub_category: bool,
    pub date: Option<String>,
}

pub fn edit(id: i64, args: TxEditArgs) -> Result<()> {
    let (_, mut ledger) = open_ledger()?;
    let patch = TransactionPatch {
        date: args.date.as_deref().map(parse_date_arg).transpose()?,
        kind: args.kind.as_deref().map(str::parse::<TxnType>).transpose()?,
        category: args.category.map(|c| c.trim().to_string()),
        sub_category: if args.clear_sub_category {
            Some(None)
        } else {
            args.sub_category.map(Some)
        },
        details: args.details.map(|d| d.trim().to_string()),
        amount: args.amount,
    };
    let txn = ledger.update_transaction(id, patch)?;
    println!("Updated transaction #{}: {}", txn.id, txn.details);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (_, mut ledger) = open_ledger()?;
    let removed = ledger.delete_transaction(id)?;
    println!("Deleted transaction #{}: {}", removed.id, removed.details);
    Ok(())
}

pub fn list(period: &PeriodArgs) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let filter = period.filter()?;
    let rows = ledger.transactions_in(&filter);

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Type", "Category", "Sub Category", "Details", "Amount"]);
    for t in &rows {
        let amount = money(t.amount, &settings.currency_symbol);
        let amount = match t.kind {
            TxnType::Income => amount.green(),
            TxnType::Expense => amount.red(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date.format("%Y-%m-%d")),
            Cell::new(t.kind),
            Cell::new(&t.category),
            Cell::new(t.sub_category.as_deref().unwrap_or("-")),
            Cell::new(&t.details),
            Cell::new(amount).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{} ({} transactions)\n{table}", filter.label().bold(), rows.len());
    Ok(())
}
