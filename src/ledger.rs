//! The ledger: a local snapshot of every record plus the operations that
//! change them.
//!
//! Writes go to the store first. The snapshot is never edited directly; it
//! only moves forward by applying the change events the store emits, so a
//! failed write leaves it untouched and a change made by another writer
//! lands the same way our own do.

use chrono::NaiveDate;

use crate::error::{LedgerError, Result};
use crate::filter::Filter;
use crate::importer::{reconcile, ImportPlan};
use crate::models::{
    Category, CategoryDraft, CategoryPatch, Entity, LogEntry, NewCategory, NewRecord,
    NewTransaction, Patch, RawRow, Record, RecordId, Transaction, TransactionPatch,
};
use crate::palette::{color_of, palette_color};
use crate::store::{ChangeEvent, ChangeKind, RecordStore, Subscription};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// In-memory copy of the store. Transactions and logs are kept newest first,
/// categories in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub categories: Vec<Category>,
    pub logs: Vec<LogEntry>,
}

fn upsert<T>(items: &mut Vec<T>, item: T, id_of: fn(&T) -> RecordId, at_front: bool) {
    let id = id_of(&item);
    match items.iter().position(|existing| id_of(existing) == id) {
        Some(pos) => items[pos] = item,
        None if at_front => items.insert(0, item),
        None => items.push(item),
    }
}

fn remove<T>(items: &mut Vec<T>, id: RecordId, id_of: fn(&T) -> RecordId) {
    items.retain(|existing| id_of(existing) != id);
}

impl Snapshot {
    /// Reducer for store events. Inserts and updates upsert by id and
    /// deletes of unknown ids are ignored, so replaying an event is harmless.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match (&event.kind, &event.record) {
            (ChangeKind::Delete, record) => {
                let id = record.id();
                match record {
                    Record::Transaction(_) => remove(&mut self.transactions, id, |t| t.id),
                    Record::Category(_) => remove(&mut self.categories, id, |c| c.id),
                    Record::Log(_) => remove(&mut self.logs, id, |l| l.id),
                }
            }
            (_, Record::Transaction(t)) => {
                upsert(&mut self.transactions, t.clone(), |t| t.id, true)
            }
            (_, Record::Category(c)) => upsert(&mut self.categories, c.clone(), |c| c.id, false),
            (_, Record::Log(l)) => upsert(&mut self.logs, l.clone(), |l| l.id, true),
        }
    }

    fn load(&mut self, records: Vec<Record>) {
        for record in records {
            match record {
                Record::Transaction(t) => self.transactions.push(t),
                Record::Category(c) => self.categories.push(c),
                Record::Log(l) => self.logs.push(l),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub imported: usize,
    pub categories_created: Vec<Category>,
}

pub struct Ledger<S: RecordStore> {
    store: S,
    snapshot: Snapshot,
    subscriptions: Vec<Subscription>,
}

fn into_transaction(record: Record) -> Result<Transaction> {
    match record {
        Record::Transaction(t) => Ok(t),
        other => Err(LedgerError::Validation(format!(
            "store returned a {} where a transaction was expected",
            other.entity()
        ))),
    }
}

fn into_category(record: Record) -> Result<Category> {
    match record {
        Record::Category(c) => Ok(c),
        other => Err(LedgerError::Validation(format!(
            "store returned a {} where a category was expected",
            other.entity()
        ))),
    }
}

impl<S: RecordStore> Ledger<S> {
    pub fn open(store: S) -> Result<Self> {
        let entities = [Entity::Transactions, Entity::Categories, Entity::Logs];
        let subscriptions = entities.iter().map(|e| store.subscribe(*e)).collect();
        let mut snapshot = Snapshot::default();
        for entity in entities {
            snapshot.load(store.list(entity)?);
        }
        Ok(Self {
            store,
            snapshot,
            subscriptions,
        })
    }

    /// Apply every change event delivered since the last call. Returns how
    /// many were applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        for sub in &self.subscriptions {
            let events = sub.pending();
            if !events.is_empty() {
                log::debug!("applying {} {} events", events.len(), sub.entity());
            }
            for event in &events {
                self.snapshot.apply(event);
            }
            applied += events.len();
        }
        applied
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.snapshot.transactions
    }

    pub fn categories(&self) -> &[Category] {
        &self.snapshot.categories
    }

    pub fn transactions_in(&self, filter: &Filter) -> Vec<&Transaction> {
        filter.apply(&self.snapshot.transactions)
    }

    pub fn transactions_in_year(&self, year: i32) -> Vec<&Transaction> {
        self.transactions_in(&Filter::whole_year(year))
    }

    pub fn color_of(&self, name: &str) -> &str {
        color_of(&self.snapshot.categories, name)
    }

    /// Most recent log entries, newest first.
    pub fn recent_logs(&self, limit: usize) -> &[LogEntry] {
        let logs = &self.snapshot.logs;
        &logs[..limit.min(logs.len())]
    }

    fn append_log(&mut self, message: String) -> Result<()> {
        log::info!("{message}");
        self.store.insert(NewRecord::Log(message))?;
        Ok(())
    }

    fn ensure_unique_name(&self, name: &str, except: Option<RecordId>) -> Result<()> {
        let lower = name.trim().to_lowercase();
        let taken = self
            .snapshot
            .categories
            .iter()
            .any(|c| Some(c.id) != except && c.name.to_lowercase() == lower);
        if taken {
            return Err(LedgerError::Validation(format!(
                "a category named '{}' already exists",
                name.trim()
            )));
        }
        Ok(())
    }

    // -- transactions -------------------------------------------------------

    pub fn add_transaction(&mut self, txn: NewTransaction) -> Result<Transaction> {
        txn.validate()?;
        let stored = into_transaction(self.store.insert(NewRecord::Transaction(txn))?)?;
        self.append_log(format!(
            "Added {}: {} ({})",
            stored.kind, stored.details, stored.amount
        ))?;
        self.sync();
        Ok(stored)
    }

    pub fn update_transaction(&mut self, id: RecordId, patch: TransactionPatch) -> Result<Transaction> {
        patch.validate()?;
        let label = patch.details.clone().unwrap_or_else(|| id.to_string());
        let stored = into_transaction(self.store.update(
            Entity::Transactions,
            id,
            Patch::Transaction(patch),
        )?)?;
        self.append_log(format!("Modified transaction: {label}"))?;
        self.sync();
        Ok(stored)
    }

    pub fn delete_transaction(&mut self, id: RecordId) -> Result<Transaction> {
        let removed = into_transaction(self.store.delete(Entity::Transactions, id)?)?;
        self.append_log(format!(
            "Deleted transaction: {} ({})",
            removed.details, removed.amount
        ))?;
        self.sync();
        Ok(removed)
    }

    // -- categories ---------------------------------------------------------

    pub fn add_category(&mut self, draft: CategoryDraft) -> Result<Category> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::Validation("name is required".to_string()));
        }
        self.ensure_unique_name(&name, None)?;
        let new = NewCategory {
            name,
            kind: draft.kind,
            sub_category: draft.sub_category,
            notes: draft.notes,
            color: palette_color(self.snapshot.categories.len()).to_string(),
        };
        let stored = into_category(self.store.insert(NewRecord::Category(new))?)?;
        self.append_log(format!("Added category: {}", stored.name))?;
        self.sync();
        Ok(stored)
    }

    pub fn update_category(&mut self, id: RecordId, patch: CategoryPatch) -> Result<Category> {
        patch.validate()?;
        if let Some(name) = &patch.name {
            self.ensure_unique_name(name, Some(id))?;
        }
        let label = patch.name.clone().unwrap_or_else(|| id.to_string());
        let stored = into_category(self.store.update(Entity::Categories, id, Patch::Category(patch))?)?;
        self.append_log(format!("Modified category: {label}"))?;
        self.sync();
        Ok(stored)
    }

    /// Transactions that name the category keep their category string.
    pub fn delete_category(&mut self, id: RecordId) -> Result<Category> {
        let removed = into_category(self.store.delete(Entity::Categories, id)?)?;
        self.append_log(format!("Deleted category: {}", removed.name))?;
        self.sync();
        Ok(removed)
    }

    // -- import -------------------------------------------------------------

    pub fn plan_import(&self, rows: &[RawRow], today: NaiveDate) -> Result<ImportPlan> {
        reconcile(rows, &self.snapshot.categories, today)
    }

    /// Persist an import plan: categories first, then transactions. The two
    /// writes are independent, so a failure in the second leaves the new
    /// categories in place.
    pub fn import(&mut self, plan: ImportPlan) -> Result<ImportResult> {
        let ImportPlan {
            transactions,
            categories,
            ..
        } = plan;

        let mut categories_created = Vec::new();
        if !categories.is_empty() {
            let stored = self
                .store
                .insert_many(categories.into_iter().map(NewRecord::Category).collect())?;
            categories_created = stored
                .into_iter()
                .map(into_category)
                .collect::<Result<Vec<_>>>()?;
            self.append_log(format!(
                "Auto-added {} new categories from import",
                categories_created.len()
            ))?;
        }

        let count = transactions.len();
        let inserted = self
            .store
            .insert_many(transactions.into_iter().map(NewRecord::Transaction).collect());
        if let Err(e) = inserted {
            log::warn!(
                "import failed after creating {} categories: {e}",
                categories_created.len()
            );
            self.sync();
            return Err(e);
        }
        self.append_log(format!("Bulk imported {count} transactions"))?;
        self.sync();

        Ok(ImportResult {
            imported: count,
            categories_created,
        })
    }

    #[cfg(test)]
    pub fn import_rows(&mut self, rows: &[RawRow], today: NaiveDate) -> Result<ImportResult> {
        let plan = self.plan_import(rows, today)?;
        self.import(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::db::tests::test_store;
    use crate::db::SqliteStore;
    use crate::filter::Period;
    use crate::models::{CellValue, TxnType};

    fn ledger() -> (tempfile::TempDir, Ledger<SqliteStore>) {
        let (dir, store) = test_store();
        (dir, Ledger::open(store).unwrap())
    }

    fn expense(date: &str, category: &str, details: &str, amount: f64) -> NewTransaction {
        NewTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            kind: TxnType::Expense,
            category: category.to_string(),
            sub_category: None,
            details: details.to_string(),
            amount,
        }
    }

    fn import_row(category: &str, kind: &str, amount: f64) -> RawRow {
        RawRow::new(vec![
            ("Date".to_string(), CellValue::Text("2026-01-20".to_string())),
            ("Type".to_string(), CellValue::Text(kind.to_string())),
            ("Category".to_string(), CellValue::Text(category.to_string())),
            ("Details".to_string(), CellValue::Text("imported".to_string())),
            ("Amount".to_string(), CellValue::Number(amount)),
        ])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_open_loads_seeded_categories() {
        let (_dir, ledger) = ledger();
        assert_eq!(ledger.categories().len(), 5);
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_reaches_snapshot_and_logs() {
        let (_dir, mut ledger) = ledger();
        let t = ledger.add_transaction(expense("2026-01-20", "Food", "Lunch", 15.0)).unwrap();
        assert_eq!(ledger.transactions(), &[t]);
        assert_eq!(ledger.recent_logs(10)[0].message, "Added expense: Lunch (15)");
    }

    #[test]
    fn test_invalid_transaction_writes_nothing() {
        let (_dir, mut ledger) = ledger();
        let err = ledger.add_transaction(expense("2026-01-20", "Food", "Lunch", -3.0));
        assert!(matches!(err, Err(LedgerError::Validation(_))));
        assert!(ledger.transactions().is_empty());
        assert!(ledger.recent_logs(10).is_empty());
    }

    #[test]
    fn test_update_and_delete_transaction() {
        let (_dir, mut ledger) = ledger();
        let t = ledger.add_transaction(expense("2026-01-20", "Food", "Lunch", 15.0)).unwrap();
        let patch = TransactionPatch {
            details: Some("Team lunch".to_string()),
            amount: Some(45.0),
            ..Default::default()
        };
        let updated = ledger.update_transaction(t.id, patch).unwrap();
        assert_eq!(ledger.transactions()[0], updated);
        assert_eq!(ledger.recent_logs(1)[0].message, "Modified transaction: Team lunch");

        ledger.delete_transaction(t.id).unwrap();
        assert!(ledger.transactions().is_empty());
        assert_eq!(ledger.recent_logs(1)[0].message, "Deleted transaction: Team lunch (45)");
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (_dir, mut ledger) = ledger();
        assert!(matches!(
            ledger.delete_transaction(42),
            Err(LedgerError::NotFound { entity: Entity::Transactions, id: 42 })
        ));
        assert!(matches!(
            ledger.update_category(42, CategoryPatch::default()),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_add_category_cycles_palette_and_rejects_duplicates() {
        let (_dir, mut ledger) = ledger();
        let draft = |name: &str| CategoryDraft {
            name: name.to_string(),
            kind: TxnType::Expense,
            sub_category: None,
            notes: None,
        };
        let travel = ledger.add_category(draft("Travel")).unwrap();
        assert_eq!(travel.color, palette_color(5));
        assert!(matches!(
            ledger.add_category(draft("travel")),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.categories().len(), 6);
    }

    #[test]
    fn test_rename_category_must_stay_unique() {
        let (_dir, mut ledger) = ledger();
        let food = ledger.categories()[1].clone();
        let clash = CategoryPatch {
            name: Some("SALARY".to_string()),
            ..Default::default()
        };
        assert!(ledger.update_category(food.id, clash).is_err());
        let recase = CategoryPatch {
            name: Some("FOOD".to_string()),
            ..Default::default()
        };
        assert_eq!(ledger.update_category(food.id, recase).unwrap().name, "FOOD");
    }

    #[test]
    fn test_delete_category_keeps_transactions() {
        let (_dir, mut ledger) = ledger();
        let t = ledger.add_transaction(expense("2026-01-20", "Food", "Lunch", 15.0)).unwrap();
        let food_id = ledger.categories().iter().find(|c| c.name == "Food").unwrap().id;
        ledger.delete_category(food_id).unwrap();
        assert!(ledger.categories().iter().all(|c| c.name != "Food"));
        assert_eq!(ledger.transactions(), &[t]);
        assert_eq!(ledger.color_of("Food"), crate::palette::FALLBACK_COLOR);
    }

    #[test]
    fn test_import_creates_categories_then_transactions() {
        let (_dir, mut ledger) = ledger();
        let rows = vec![
            import_row("Travel", "expense", 80.0),
            import_row("travel", "expense", 20.0),
            import_row("Food", "expense", 15.0),
        ];
        let result = ledger.import_rows(&rows, today()).unwrap();
        assert_eq!(result.imported, 3);
        assert_eq!(result.categories_created.len(), 1);
        assert_eq!(result.categories_created[0].name, "Travel");
        assert_eq!(result.categories_created[0].color, palette_color(5));
        assert_eq!(ledger.transactions().len(), 3);
        assert_eq!(ledger.categories().len(), 6);

        let messages: Vec<_> = ledger.recent_logs(2).iter().map(|l| l.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Bulk imported 3 transactions", "Auto-added 1 new categories from import"]
        );
    }

    #[test]
    fn test_empty_import_has_no_side_effects() {
        let (_dir, mut ledger) = ledger();
        let before = ledger.snapshot().clone();
        assert!(matches!(ledger.import_rows(&[], today()), Err(LedgerError::EmptyInput)));
        assert_eq!(ledger.sync(), 0);
        assert_eq!(ledger.snapshot(), &before);
    }

    #[test]
    fn test_external_writes_arrive_through_sync() {
        let (_dir, mut ledger) = ledger();
        let stored = ledger
            .store()
            .insert(NewRecord::Transaction(expense("2026-03-01", "Food", "Snack", 4.0)))
            .unwrap();
        assert!(ledger.transactions().is_empty());
        assert_eq!(ledger.sync(), 1);
        assert_eq!(ledger.transactions()[0].id, stored.id());
    }

    #[test]
    fn test_reducer_is_idempotent() {
        let mut snapshot = Snapshot::default();
        let txn = Transaction {
            id: 7,
            date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            kind: TxnType::Expense,
            category: "Food".to_string(),
            sub_category: None,
            details: "Lunch".to_string(),
            amount: 15.0,
            created_at: Utc::now(),
        };
        let insert = ChangeEvent {
            kind: ChangeKind::Insert,
            record: Record::Transaction(txn.clone()),
        };
        snapshot.apply(&insert);
        snapshot.apply(&insert);
        assert_eq!(snapshot.transactions.len(), 1);

        let mut edited = txn.clone();
        edited.amount = 20.0;
        snapshot.apply(&ChangeEvent {
            kind: ChangeKind::Update,
            record: Record::Transaction(edited),
        });
        assert_eq!(snapshot.transactions[0].amount, 20.0);

        let delete = ChangeEvent {
            kind: ChangeKind::Delete,
            record: Record::Transaction(txn),
        };
        snapshot.apply(&delete);
        snapshot.apply(&delete);
        assert!(snapshot.transactions.is_empty());
    }

    #[test]
    fn test_filtered_views() {
        let (_dir, mut ledger) = ledger();
        ledger.add_transaction(expense("2026-01-20", "Food", "Lunch", 15.0)).unwrap();
        ledger.add_transaction(expense("2026-05-02", "Food", "Dinner", 30.0)).unwrap();
        ledger.add_transaction(expense("2025-05-02", "Food", "Old", 9.0)).unwrap();
        assert_eq!(ledger.transactions_in(&Filter::new(2026, Period::Quarter(2))).len(), 1);
        assert_eq!(ledger.transactions_in_year(2026).len(), 2);
    }
}
