use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::categories::swatch;
use crate::cli::{open_ledger, PeriodArgs};
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::reports::{aggregate, MONTH_ABBREVS};

const BAR_WIDTH: usize = 40;

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round().max(1.0) as usize;
    "\u{2588}".repeat(len.min(BAR_WIDTH))
}

pub fn summary(period: &PeriodArgs) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let symbol = settings.currency_symbol.as_str();
    let filter = period.filter()?;
    let summary = aggregate(ledger.transactions_in(&filter));

    println!("{}", filter.label().bold());
    let mut totals = Table::new();
    totals.set_header(vec!["", "Amount"]);
    totals.add_row(vec![
        Cell::new("Total Income".green().bold()),
        Cell::new(money(summary.total_income, symbol)).set_alignment(CellAlignment::Right),
    ]);
    totals.add_row(vec![
        Cell::new("Total Expense".red().bold()),
        Cell::new(money(summary.total_expense, symbol)).set_alignment(CellAlignment::Right),
    ]);
    let balance = money(summary.balance, symbol);
    let balance = if summary.balance >= 0.0 {
        balance.green().bold()
    } else {
        balance.red().bold()
    };
    totals.add_row(vec![
        Cell::new("Balance".bold()),
        Cell::new(balance).set_alignment(CellAlignment::Right),
    ]);
    println!("{totals}");

    match summary.highest_spending() {
        Some(top) => println!(
            "Highest spending: {} {} ({})",
            swatch(ledger.color_of(&top.name)),
            top.name,
            money(top.total, symbol)
        ),
        None => println!("No expenses in this period."),
    }

    let breakdown = summary.breakdown();
    if !breakdown.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["", "Category", "Amount", "Share"]);
        for share in &breakdown {
            table.add_row(vec![
                Cell::new(swatch(ledger.color_of(&share.name))),
                Cell::new(&share.name),
                Cell::new(money(share.total, symbol)).set_alignment(CellAlignment::Right),
                Cell::new(percent(share.pct)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("Expenses by Category\n{table}");
    }
    Ok(())
}

/// Monthly bars always cover the whole year; the category split follows the
/// selected period.
pub fn charts(period: &PeriodArgs) -> Result<()> {
    let (settings, ledger) = open_ledger()?;
    let symbol = settings.currency_symbol.as_str();
    let filter = period.filter()?;

    let year = aggregate(ledger.transactions_in_year(filter.year));
    let max = year
        .monthly
        .iter()
        .map(|m| m.income.max(m.expense))
        .fold(0.0, f64::max);

    println!("{}", format!("Income vs Expense {}", filter.year).bold());
    for (abbrev, month) in MONTH_ABBREVS.iter().zip(year.monthly.iter()) {
        println!(
            "{abbrev}  {} {}",
            bar(month.income, max).green(),
            money(month.income, symbol).dimmed()
        );
        println!(
            "     {} {}",
            bar(month.expense, max).red(),
            money(month.expense, symbol).dimmed()
        );
    }

    let summary = aggregate(ledger.transactions_in(&filter));
    let breakdown = summary.breakdown();
    println!();
    println!("{}", format!("Category Breakdown ({})", filter.label()).bold());
    if breakdown.is_empty() {
        println!("No expenses in this period.");
    }
    for share in &breakdown {
        let (r, g, b) = crate::palette::rgb(ledger.color_of(&share.name)).unwrap_or((148, 163, 184));
        println!(
            "{:<16} {} {}",
            share.name,
            bar(share.pct, 100.0).truecolor(r, g, b),
            percent(share.pct)
        );
    }
    Ok(())
}
