use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

pub type RecordId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Income,
    Expense,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxnType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::Validation(format!(
                "type must be 'income' or 'expense', got '{other}'"
            ))),
        }
    }
}

/// The three record collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Transactions,
    Categories,
    Logs,
}

impl Entity {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Categories => "categories",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transactions => "transaction",
            Self::Categories => "category",
            Self::Logs => "log entry",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TxnType,
    pub category: String,
    pub sub_category: Option<String>,
    pub details: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TxnType,
    pub sub_category: Option<String>,
    pub notes: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// A transaction before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub kind: TxnType,
    pub category: String,
    pub sub_category: Option<String>,
    pub details: String,
    pub amount: f64,
}

impl NewTransaction {
    /// Checks a manually entered transaction. Imported rows are normalized
    /// instead and never pass through here.
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        require("category", &self.category)?;
        require("details", &self.details)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub kind: TxnType,
    pub sub_category: Option<String>,
    pub notes: Option<String>,
    pub color: String,
}

/// What a user supplies when creating a category; the color is assigned
/// by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub kind: TxnType,
    pub sub_category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub kind: Option<TxnType>,
    pub category: Option<String>,
    pub sub_category: Option<Option<String>>,
    pub details: Option<String>,
    pub amount: Option<f64>,
}

impl TransactionPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            require("category", category)?;
        }
        if let Some(details) = &self.details {
            require("details", details)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, txn: &mut Transaction) {
        if let Some(date) = self.date {
            txn.date = date;
        }
        if let Some(kind) = self.kind {
            txn.kind = kind;
        }
        if let Some(category) = &self.category {
            txn.category = category.clone();
        }
        if let Some(sub) = &self.sub_category {
            txn.sub_category = sub.clone();
        }
        if let Some(details) = &self.details {
            txn.details = details.clone();
        }
        if let Some(amount) = self.amount {
            txn.amount = amount;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub kind: Option<TxnType>,
    pub sub_category: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl CategoryPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, cat: &mut Category) {
        if let Some(name) = &self.name {
            cat.name = name.clone();
        }
        if let Some(kind) = self.kind {
            cat.kind = kind;
        }
        if let Some(sub) = &self.sub_category {
            cat.sub_category = sub.clone();
        }
        if let Some(notes) = &self.notes {
            cat.notes = notes.clone();
        }
    }
}

/// A stored record of any entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Transaction(Transaction),
    Category(Category),
    Log(LogEntry),
}

impl Record {
    pub fn entity(&self) -> Entity {
        match self {
            Self::Transaction(_) => Entity::Transactions,
            Self::Category(_) => Entity::Categories,
            Self::Log(_) => Entity::Logs,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            Self::Transaction(t) => t.id,
            Self::Category(c) => c.id,
            Self::Log(l) => l.id,
        }
    }
}

/// A record to be inserted; the store assigns ids and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum NewRecord {
    Transaction(NewTransaction),
    Category(NewCategory),
    Log(String),
}

impl NewRecord {
    pub fn entity(&self) -> Entity {
        match self {
            Self::Transaction(_) => Entity::Transactions,
            Self::Category(_) => Entity::Categories,
            Self::Log(_) => Entity::Logs,
        }
    }
}

/// Partial update for a mutable entity. Log entries have no patch form.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Transaction(TransactionPatch),
    Category(CategoryPatch),
}

/// One spreadsheet cell as handed over by the tabular reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Mirrors spreadsheet truthiness: empty text, zero and `false` count as
    /// missing.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => *n == 0.0 || n.is_nan(),
            Self::Bool(b) => !b,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Intermediate representation of one spreadsheet row before
/// normalization. Cells keep the column order of the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self { cells }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(LedgerError::Validation(format!(
            "amount must be a non-negative number, got {amount}"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{field} is required")));
    }
    Ok(())
}
