use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{LedgerError, Result};
use crate::models::{
    Category, Entity, LogEntry, NewCategory, NewRecord, NewTransaction, Patch, Record, RecordId,
    Transaction, TxnType,
};
use crate::store::{ChangeKind, RecordStore, Subscribers, Subscription};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category_type TEXT NOT NULL,
    sub_category TEXT,
    notes TEXT,
    color TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    txn_type TEXT NOT NULL,
    category TEXT NOT NULL,
    sub_category TEXT,
    details TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL CHECK (amount >= 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY,
    timestamp TEXT NOT NULL,
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
";

// (name, category_type, notes, color)
const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str)] = &[
    ("Salary", "income", "Monthly Income", "#10B981"),
    ("Food", "expense", "Groceries and Dining", "#F59E0B"),
    ("Transport", "expense", "Fuel and Commute", "#3B82F6"),
    ("Utilities", "expense", "Bills", "#EF4444"),
    ("Shopping", "expense", "Lifestyle", "#EC4899"),
];

const DATE_FMT: &str = "%Y-%m-%d";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, category_type, notes, color) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![cat.0, cat.1, cat.2, cat.3],
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn txn_type_at(row: &Row, idx: usize) -> rusqlite::Result<TxnType> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: LedgerError| conversion_err(idx, e))
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let date: String = row.get(1)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date, DATE_FMT).map_err(|e| conversion_err(1, e))?,
        kind: txn_type_at(row, 2)?,
        category: row.get(3)?,
        sub_category: row.get(4)?,
        details: row.get(5)?,
        amount: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: txn_type_at(row, 2)?,
        sub_category: row.get(3)?,
        notes: row.get(4)?,
        color: row.get(5)?,
    })
}

fn log_from_row(row: &Row) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: timestamp_at(row, 1)?,
        message: row.get(2)?,
    })
}

const TXN_COLUMNS: &str = "id, date, txn_type, category, sub_category, details, amount, created_at";
const CAT_COLUMNS: &str = "id, name, category_type, sub_category, notes, color";
const LOG_COLUMNS: &str = "id, timestamp, message";

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Connection,
    subscribers: Subscribers,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self {
            conn,
            subscribers: Subscribers::default(),
        })
    }

    fn find(&self, entity: Entity, id: RecordId) -> Result<Option<Record>> {
        let record = match entity {
            Entity::Transactions => self
                .conn
                .query_row(
                    &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"),
                    [id],
                    transaction_from_row,
                )
                .optional()?
                .map(Record::Transaction),
            Entity::Categories => self
                .conn
                .query_row(
                    &format!("SELECT {CAT_COLUMNS} FROM categories WHERE id = ?1"),
                    [id],
                    category_from_row,
                )
                .optional()?
                .map(Record::Category),
            Entity::Logs => self
                .conn
                .query_row(
                    &format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = ?1"),
                    [id],
                    log_from_row,
                )
                .optional()?
                .map(Record::Log),
        };
        Ok(record)
    }

    fn require(&self, entity: Entity, id: RecordId) -> Result<Record> {
        self.find(entity, id)?
            .ok_or(LedgerError::NotFound { entity, id })
    }

    fn insert_txn(&self, t: NewTransaction) -> Result<Transaction> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO transactions (date, txn_type, category, sub_category, details, amount, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                t.date.format(DATE_FMT).to_string(),
                t.kind.as_str(),
                t.category,
                t.sub_category,
                t.details,
                t.amount,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(Transaction {
            id: self.conn.last_insert_rowid(),
            date: t.date,
            kind: t.kind,
            category: t.category,
            sub_category: t.sub_category,
            details: t.details,
            amount: t.amount,
            created_at,
        })
    }

    fn insert_category(&self, c: NewCategory) -> Result<Category> {
        self.conn.execute(
            "INSERT INTO categories (name, category_type, sub_category, notes, color) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![c.name, c.kind.as_str(), c.sub_category, c.notes, c.color],
        )?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: c.name,
            kind: c.kind,
            sub_category: c.sub_category,
            notes: c.notes,
            color: c.color,
        })
    }

    fn insert_log(&self, message: String) -> Result<LogEntry> {
        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO logs (timestamp, message) VALUES (?1, ?2)",
            rusqlite::params![timestamp.to_rfc3339(), message],
        )?;
        Ok(LogEntry {
            id: self.conn.last_insert_rowid(),
            timestamp,
            message,
        })
    }

    fn insert_record(&self, record: NewRecord) -> Result<Record> {
        log::debug!("insert into {}", record.entity().table());
        Ok(match record {
            NewRecord::Transaction(t) => Record::Transaction(self.insert_txn(t)?),
            NewRecord::Category(c) => Record::Category(self.insert_category(c)?),
            NewRecord::Log(m) => Record::Log(self.insert_log(m)?),
        })
    }

    fn write_back(&self, record: &Record) -> Result<()> {
        match record {
            Record::Transaction(t) => {
                self.conn.execute(
                    "UPDATE transactions SET date = ?1, txn_type = ?2, category = ?3, sub_category = ?4, \
                     details = ?5, amount = ?6 WHERE id = ?7",
                    rusqlite::params![
                        t.date.format(DATE_FMT).to_string(),
                        t.kind.as_str(),
                        t.category,
                        t.sub_category,
                        t.details,
                        t.amount,
                        t.id,
                    ],
                )?;
            }
            Record::Category(c) => {
                self.conn.execute(
                    "UPDATE categories SET name = ?1, category_type = ?2, sub_category = ?3, notes = ?4, \
                     color = ?5 WHERE id = ?6",
                    rusqlite::params![c.name, c.kind.as_str(), c.sub_category, c.notes, c.color, c.id],
                )?;
            }
            Record::Log(_) => {
                return Err(LedgerError::Validation("log entries are append-only".to_string()));
            }
        }
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn list(&self, entity: Entity) -> Result<Vec<Record>> {
        let records: Vec<Record> = match entity {
            Entity::Transactions => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {TXN_COLUMNS} FROM transactions ORDER BY date DESC, id DESC"
                ))?;
                let rows = stmt
                    .query_map([], transaction_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.into_iter().map(Record::Transaction).collect()
            }
            Entity::Categories => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {CAT_COLUMNS} FROM categories ORDER BY id"))?;
                let rows = stmt
                    .query_map([], category_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.into_iter().map(Record::Category).collect()
            }
            Entity::Logs => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {LOG_COLUMNS} FROM logs ORDER BY id DESC"))?;
                let rows = stmt
                    .query_map([], log_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows.into_iter().map(Record::Log).collect()
            }
        };
        log::debug!("listed {} {}", records.len(), entity.table());
        Ok(records)
    }

    fn insert(&self, record: NewRecord) -> Result<Record> {
        let stored = self.insert_record(record)?;
        self.subscribers.publish(ChangeKind::Insert, &stored);
        Ok(stored)
    }

    /// All records of one batch are written in a single SQLite transaction;
    /// events go out only after it commits.
    fn insert_many(&self, records: Vec<NewRecord>) -> Result<Vec<Record>> {
        let tx = self.conn.unchecked_transaction()?;
        let stored = records
            .into_iter()
            .map(|r| self.insert_record(r))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        log::debug!("inserted batch of {}", stored.len());
        for record in &stored {
            self.subscribers.publish(ChangeKind::Insert, record);
        }
        Ok(stored)
    }

    fn update(&self, entity: Entity, id: RecordId, patch: Patch) -> Result<Record> {
        let mut record = self.require(entity, id)?;
        match (&mut record, &patch) {
            (Record::Transaction(t), Patch::Transaction(p)) => p.apply_to(t),
            (Record::Category(c), Patch::Category(p)) => p.apply_to(c),
            _ => {
                return Err(LedgerError::Validation(format!(
                    "patch does not apply to a {entity}"
                )))
            }
        }
        self.write_back(&record)?;
        self.subscribers.publish(ChangeKind::Update, &record);
        Ok(record)
    }

    fn delete(&self, entity: Entity, id: RecordId) -> Result<Record> {
        if entity == Entity::Logs {
            return Err(LedgerError::Validation("log entries are append-only".to_string()));
        }
        let record = self.require(entity, id)?;
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", entity.table()),
            [id],
        )?;
        self.subscribers.publish(ChangeKind::Delete, &record);
        Ok(record)
    }

    fn subscribe(&self, entity: Entity) -> Subscription {
        self.subscribers.subscribe(entity)
    }
}
