use std::str::FromStr;

use chrono::{Datelike, Local};

use crate::error::{LedgerError, Result};
use crate::models::Transaction;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// The slice of a year the active view covers. Months are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month(u32),
    Quarter(u32),
    All,
}

impl Period {
    pub fn month(index: u32) -> Option<Self> {
        (index < 12).then_some(Self::Month(index))
    }

    pub fn quarter(q: u32) -> Option<Self> {
        (1..=4).contains(&q).then_some(Self::Quarter(q))
    }

    /// Zero-based inclusive month range covered by this period.
    pub fn month_range(&self) -> (u32, u32) {
        match *self {
            Self::Month(m) => {
                debug_assert!(m < 12, "month index out of range: {m}");
                (m, m)
            }
            Self::Quarter(q) => {
                debug_assert!((1..=4).contains(&q), "quarter out of range: {q}");
                let start = (q - 1) * 3;
                (start, start + 2)
            }
            Self::All => (0, 11),
        }
    }
}

impl FromStr for Period {
    type Err = LedgerError;

    /// Parses user input: `all`, `q1`..`q4`, a month number `1`..`12`, or an
    /// English month name or abbreviation.
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().to_lowercase();
        if raw == "all" {
            return Ok(Self::All);
        }
        if let Some(q) = raw.strip_prefix('q') {
            return q
                .parse()
                .ok()
                .and_then(Self::quarter)
                .ok_or_else(|| LedgerError::Validation(format!("unknown quarter '{s}'")));
        }
        if let Ok(n) = raw.parse::<u32>() {
            return n
                .checked_sub(1)
                .and_then(Self::month)
                .ok_or_else(|| LedgerError::Validation(format!("month must be 1-12, got {n}")));
        }
        MONTH_NAMES
            .iter()
            .position(|name| {
                let name = name.to_lowercase();
                raw.len() >= 3 && name.starts_with(&raw)
            })
            .map(|i| Self::Month(i as u32))
            .ok_or_else(|| LedgerError::Validation(format!("unknown period '{s}'")))
    }
}

/// Active view window: a year plus a month, quarter or the whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub year: i32,
    pub period: Period,
}

impl Default for Filter {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            period: Period::Month(today.month0()),
        }
    }
}

impl Filter {
    pub fn new(year: i32, period: Period) -> Self {
        Self { year, period }
    }

    pub fn whole_year(year: i32) -> Self {
        Self::new(year, Period::All)
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if txn.date.year() != self.year {
            return false;
        }
        if self.period == Period::All {
            return true;
        }
        let (start, end) = self.period.month_range();
        let month = txn.date.month0();
        month >= start && month <= end
    }

    pub fn apply<'a>(&self, txns: &'a [Transaction]) -> Vec<&'a Transaction> {
        txns.iter().filter(|t| self.matches(t)).collect()
    }

    pub fn label(&self) -> String {
        match self.period {
            Period::All => format!("All Months {}", self.year),
            Period::Quarter(q) => {
                let suffix = match q {
                    1 => "st",
                    2 => "nd",
                    3 => "rd",
                    _ => "th",
                };
                format!("{q}{suffix} Quarter {}", self.year)
            }
            Period::Month(m) => {
                debug_assert!(m < 12, "month index out of range: {m}");
                format!("{} {}", MONTH_NAMES[m as usize % 12], self.year)
            }
        }
    }
}
