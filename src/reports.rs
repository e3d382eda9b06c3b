use std::collections::HashMap;

use chrono::Datelike;

use crate::models::{Transaction, TxnType};

pub const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthBucket {
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub name: String,
    pub total: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub monthly: [MonthBucket; 12],
    /// Expense totals keyed by the raw category string, in first-seen order.
    pub category_totals: Vec<CategoryTotal>,
}

impl Summary {
    /// Category totals, largest first. Equal totals keep first-seen order.
    pub fn ranked_categories(&self) -> Vec<CategoryTotal> {
        let mut ranked = self.category_totals.clone();
        ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
        ranked
    }

    pub fn highest_spending(&self) -> Option<CategoryTotal> {
        self.ranked_categories().into_iter().next()
    }

    #[cfg(test)]
    pub fn category_total(&self, name: &str) -> Option<f64> {
        self.category_totals
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.total)
    }

    pub fn breakdown(&self) -> Vec<CategoryShare> {
        let total = self.total_expense;
        self.ranked_categories()
            .into_iter()
            .map(|c| CategoryShare {
                pct: if total != 0.0 { c.total / total * 100.0 } else { 0.0 },
                name: c.name,
                total: c.total,
            })
            .collect()
    }
}

pub fn aggregate<'a, I>(txns: I) -> Summary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    let mut monthly = [MonthBucket::default(); 12];
    let mut category_totals: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for t in txns {
        let bucket = &mut monthly[t.date.month0() as usize];
        match t.kind {
            TxnType::Income => {
                total_income += t.amount;
                bucket.income += t.amount;
            }
            TxnType::Expense => {
                total_expense += t.amount;
                bucket.expense += t.amount;
                match index.get(&t.category) {
                    Some(&i) => category_totals[i].total += t.amount,
                    None => {
                        index.insert(t.category.clone(), category_totals.len());
                        category_totals.push(CategoryTotal {
                            name: t.category.clone(),
                            total: t.amount,
                        });
                    }
                }
            }
        }
    }

    Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        monthly,
        category_totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    const EPS: f64 = 1e-9;

    fn txn(date: &str, kind: TxnType, category: &str, amount: f64) -> Transaction {
        Transaction {
            id: 0,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            kind,
            category: category.to_string(),
            sub_category: None,
            details: String::new(),
            amount,
            created_at: Utc::now(),
        }
    }

    fn sample_year() -> Vec<Transaction> {
        vec![
            txn("2026-01-05", TxnType::Income, "Salary", 5000.0),
            txn("2026-01-20", TxnType::Expense, "Food", 15.0),
            txn("2026-02-03", TxnType::Expense, "Transport", 40.5),
            txn("2026-02-28", TxnType::Income, "Salary", 5000.0),
            txn("2026-07-14", TxnType::Expense, "Food", 22.25),
            txn("2026-12-31", TxnType::Income, "Bonus", 0.1),
        ]
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let s = aggregate(&[]);
        assert_eq!(s.total_income, 0.0);
        assert_eq!(s.total_expense, 0.0);
        assert_eq!(s.balance, 0.0);
        assert!(s.monthly.iter().all(|b| *b == MonthBucket::default()));
        assert!(s.category_totals.is_empty());
        assert!(s.highest_spending().is_none());
    }

    #[test]
    fn test_totals_and_balance() {
        let s = aggregate(&sample_year());
        assert!((s.total_income - 10000.1).abs() < EPS);
        assert!((s.total_expense - 77.75).abs() < EPS);
        assert!((s.balance - (10000.1 - 77.75)).abs() < EPS);
    }

    #[test]
    fn test_monthly_series_sums_to_totals() {
        let s = aggregate(&sample_year());
        let income: f64 = s.monthly.iter().map(|b| b.income).sum();
        let expense: f64 = s.monthly.iter().map(|b| b.expense).sum();
        assert!((income - s.total_income).abs() < EPS);
        assert!((expense - s.total_expense).abs() < EPS);
        assert!((s.monthly[1].expense - 40.5).abs() < EPS);
        assert!((s.monthly[11].income - 0.1).abs() < EPS);
        assert_eq!(s.monthly[3], MonthBucket::default());
    }

    #[test]
    fn test_category_totals_only_count_expenses() {
        let s = aggregate(&sample_year());
        assert_eq!(s.category_total("Salary"), None);
        assert!((s.category_total("Food").unwrap() - 37.25).abs() < EPS);
    }

    #[test]
    fn test_category_keys_are_case_sensitive() {
        let txns = vec![
            txn("2026-01-01", TxnType::Expense, "Food", 10.0),
            txn("2026-01-02", TxnType::Expense, "food", 5.0),
        ];
        let s = aggregate(&txns);
        assert_eq!(s.category_totals.len(), 2);
        assert_eq!(s.category_total("food"), Some(5.0));
    }

    #[test]
    fn test_highest_spending_tie_keeps_first_seen() {
        let txns = vec![
            txn("2026-01-01", TxnType::Expense, "Transport", 30.0),
            txn("2026-01-02", TxnType::Expense, "Food", 30.0),
            txn("2026-01-03", TxnType::Expense, "Utilities", 10.0),
        ];
        let s = aggregate(&txns);
        assert_eq!(s.highest_spending().unwrap().name, "Transport");
        let ranked: Vec<_> = s.ranked_categories().into_iter().map(|c| c.name).collect();
        assert_eq!(ranked, vec!["Transport", "Food", "Utilities"]);
    }

    #[test]
    fn test_breakdown_percentages() {
        let txns = vec![
            txn("2026-01-01", TxnType::Expense, "Food", 75.0),
            txn("2026-01-02", TxnType::Expense, "Transport", 25.0),
        ];
        let shares = aggregate(&txns).breakdown();
        assert!((shares[0].pct - 75.0).abs() < EPS);
        assert!((shares[1].pct - 25.0).abs() < EPS);
    }

    #[test]
    fn test_order_independent_within_epsilon() {
        let mut txns = sample_year();
        let forward = aggregate(&txns);
        txns.reverse();
        let backward = aggregate(&txns);
        assert!((forward.total_expense - backward.total_expense).abs() < EPS);
        assert!((forward.balance - backward.balance).abs() < EPS);
    }
}
