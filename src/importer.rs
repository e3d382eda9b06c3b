use std::path::Path;

use chrono::{DateTime, NaiveDate};

use crate::error::{LedgerError, Result};
use crate::models::{Category, CellValue, NewCategory, NewTransaction, RawRow, TxnType};
use crate::palette::palette_color;

pub const AUTO_CATEGORY_NOTE: &str = "Automatically added during import";
pub const DEFAULT_CATEGORY: &str = "Other";

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SERIAL_UNIX_OFFSET: f64 = 25569.0;

const DATE_KEYWORDS: &[&str] = &["date", "time", "day"];
const TYPE_KEYWORDS: &[&str] = &["type", "kind", "transaction"];
const CATEGORY_KEYWORDS: &[&str] = &["category", "group", "class"];
const DETAILS_KEYWORDS: &[&str] = &["detail", "desc", "note", "narrative"];
const AMOUNT_KEYWORDS: &[&str] = &["amount", "value", "price", "total"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw
        .replace(',', "")
        .replace('"', "")
        .replace('$', "")
        .replace('₹', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

pub fn parse_date_mdy(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Spreadsheet serial day number to a calendar date, read in UTC.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let secs = ((serial - SERIAL_UNIX_OFFSET) * 86400.0).floor();
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.date_naive())
}

/// Accepts `YYYY-MM-DD` (optionally followed by a time part), `YYYY/MM/DD`,
/// `MM/DD/YYYY` and `DD-Mon-YYYY`.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.split(|c: char| c == 'T' || c == ' ').next().unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(head, "%Y/%m/%d").ok())
        .or_else(|| parse_date_mdy(raw))
        .or_else(|| NaiveDate::parse_from_str(raw, "%d-%b-%Y").ok())
}

// ---------------------------------------------------------------------------
// Column inference
// ---------------------------------------------------------------------------

/// Which source column feeds each transaction field. `None` means no header
/// matched and the field takes its default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub details: Option<String>,
    pub amount: Option<String>,
}

fn find_column(row: &RawRow, keywords: &[&str]) -> Option<String> {
    row.keys()
        .find(|key| {
            let key = key.to_lowercase();
            keywords.iter().any(|k| key.contains(k))
        })
        .map(str::to_string)
}

impl ColumnMapping {
    pub fn infer(first_row: &RawRow) -> Self {
        Self {
            date: find_column(first_row, DATE_KEYWORDS),
            kind: find_column(first_row, TYPE_KEYWORDS),
            category: find_column(first_row, CATEGORY_KEYWORDS),
            details: find_column(first_row, DETAILS_KEYWORDS),
            amount: find_column(first_row, AMOUNT_KEYWORDS),
        }
    }

    pub fn unmapped(&self) -> Vec<&'static str> {
        [
            ("date", &self.date),
            ("type", &self.kind),
            ("category", &self.category),
            ("details", &self.details),
            ("amount", &self.amount),
        ]
        .into_iter()
        .filter(|(_, col)| col.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    fn cell<'a>(&self, row: &'a RawRow, column: &Option<String>) -> Option<&'a CellValue> {
        column.as_deref().and_then(|c| row.get(c))
    }
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

fn normalize_date(cell: Option<&CellValue>, today: NaiveDate, row_no: usize) -> Result<NaiveDate> {
    match cell {
        Some(c) if !c.is_blank() => parse_date_cell(c, row_no),
        _ => {
            log::warn!("row {row_no}: no date, using {today}");
            Ok(today)
        }
    }
}

/// Numbers are Excel serials whether they come from a workbook cell or from
/// CSV text such as `45678`.
fn parse_date_cell(cell: &CellValue, row_no: usize) -> Result<NaiveDate> {
    let serial = match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match (serial, cell) {
        (Some(serial), _) => excel_serial_to_date(serial).ok_or_else(|| {
            LedgerError::Parse(format!("row {row_no}: date serial {serial} is out of range"))
        }),
        (None, other) => {
            let text = other.as_text();
            parse_date_text(&text).ok_or_else(|| {
                LedgerError::Parse(format!("row {row_no}: unrecognized date '{text}'"))
            })
        }
    }
}

fn normalize_type(cell: Option<&CellValue>) -> TxnType {
    match cell {
        Some(c) if c.as_text().trim().to_lowercase() == "income" => TxnType::Income,
        _ => TxnType::Expense,
    }
}

fn normalize_category(cell: Option<&CellValue>) -> String {
    match cell {
        Some(c) if !c.is_blank() => c.as_text().trim().to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

fn normalize_details(cell: Option<&CellValue>) -> String {
    match cell {
        Some(c) if !c.is_blank() => c.as_text(),
        _ => String::new(),
    }
}

fn normalize_amount(cell: Option<&CellValue>) -> f64 {
    let value = match cell {
        Some(CellValue::Number(n)) => *n,
        Some(CellValue::Text(s)) => parse_amount(s),
        _ => 0.0,
    };
    if value.is_finite() {
        value.abs()
    } else {
        0.0
    }
}

pub fn normalize_row(
    row: &RawRow,
    mapping: &ColumnMapping,
    today: NaiveDate,
    row_no: usize,
) -> Result<NewTransaction> {
    Ok(NewTransaction {
        date: normalize_date(mapping.cell(row, &mapping.date), today, row_no)?,
        kind: normalize_type(mapping.cell(row, &mapping.kind)),
        category: normalize_category(mapping.cell(row, &mapping.category)),
        sub_category: None,
        details: normalize_details(mapping.cell(row, &mapping.details)),
        amount: normalize_amount(mapping.cell(row, &mapping.amount)),
    })
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub mapping: ColumnMapping,
    pub transactions: Vec<NewTransaction>,
    /// Categories referenced by the rows that do not exist yet, in first-use
    /// order. These must be persisted before the transactions.
    pub categories: Vec<NewCategory>,
}

/// Queue a category for every name that matches neither an existing nor an
/// already queued category, ignoring case.
pub fn missing_categories(txns: &[NewTransaction], existing: &[Category]) -> Vec<NewCategory> {
    let mut queued: Vec<NewCategory> = Vec::new();
    for t in txns {
        let name = t.category.to_lowercase();
        let known = existing.iter().any(|c| c.name.to_lowercase() == name)
            || queued.iter().any(|c| c.name.to_lowercase() == name);
        if known {
            continue;
        }
        queued.push(NewCategory {
            name: t.category.clone(),
            kind: t.kind,
            sub_category: None,
            notes: Some(AUTO_CATEGORY_NOTE.to_string()),
            color: palette_color(existing.len() + queued.len()).to_string(),
        });
    }
    queued
}

/// Turn raw spreadsheet rows into transactions plus the categories they
/// need. Pure: nothing is written, so a failure leaves no trace.
pub fn reconcile(rows: &[RawRow], existing: &[Category], today: NaiveDate) -> Result<ImportPlan> {
    let first = rows.first().ok_or(LedgerError::EmptyInput)?;
    let mapping = ColumnMapping::infer(first);
    let unmapped = mapping.unmapped();
    if !unmapped.is_empty() {
        log::warn!("no column found for {}; using defaults", unmapped.join(", "));
    }

    let transactions = rows
        .iter()
        .enumerate()
        .map(|(i, row)| normalize_row(row, &mapping, today, i + 1))
        .collect::<Result<Vec<_>>>()?;
    let categories = missing_categories(&transactions, existing);

    log::debug!(
        "reconciled {} rows, {} new categories",
        transactions.len(),
        categories.len()
    );
    Ok(ImportPlan {
        mapping,
        transactions,
        categories,
    })
}

// ---------------------------------------------------------------------------
// Tabular readers
// ---------------------------------------------------------------------------

/// Read the first sheet of a spreadsheet, or a headered CSV, into rows keyed
/// by header text.
pub fn parse_tabular(file_path: &Path) -> Result<Vec<RawRow>> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => parse_csv(file_path),
        #[cfg(feature = "spreadsheet")]
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => parse_workbook(file_path),
        other => Err(LedgerError::Parse(format!(
            "unsupported file type '.{other}'"
        ))),
    }
}

fn csv_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(raw.to_string())
    }
}

fn rows_from_grid(headers: Vec<String>, grid: Vec<Vec<CellValue>>) -> Vec<RawRow> {
    grid.into_iter()
        .filter(|cells| cells.iter().any(|c| *c != CellValue::Empty))
        .map(|cells| {
            let pairs = headers
                .iter()
                .zip(cells.into_iter().chain(std::iter::repeat(CellValue::Empty)))
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, c)| (h.clone(), c))
                .collect();
            RawRow::new(pairs)
        })
        .collect()
}

pub fn parse_csv(file_path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LedgerError::Parse(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| LedgerError::Parse(e.to_string()))?;
        grid.push(record.iter().map(csv_cell).collect());
    }
    Ok(rows_from_grid(headers, grid))
}

#[cfg(feature = "spreadsheet")]
fn workbook_cell(data: &calamine::Data) -> CellValue {
    use calamine::Data;
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Empty,
    }
}

#[cfg(feature = "spreadsheet")]
fn parse_workbook(file_path: &Path) -> Result<Vec<RawRow>> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| LedgerError::Parse(format!("failed to open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LedgerError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| LedgerError::Parse(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = header_row
        .iter()
        .map(|d| workbook_cell(d).as_text().trim().to_string())
        .collect();
    let grid = rows.map(|r| r.iter().map(workbook_cell).collect()).collect();
    Ok(rows_from_grid(headers, grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        RawRow::new(cells.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn template_row(date: CellValue, kind: &str, category: &str, details: &str, amount: CellValue) -> RawRow {
        row(&[
            ("Date", date),
            ("Type", text(kind)),
            ("Category", text(category)),
            ("Details", text(details)),
            ("Amount", amount),
        ])
    }

    fn category(name: &str) -> Category {
        Category {
            id: 1,
            name: name.to_string(),
            kind: TxnType::Expense,
            sub_category: None,
            notes: None,
            color: "#F59E0B".to_string(),
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("\"500.00\""), 500.0);
        assert_eq!(parse_amount("  -42.50  "), -42.5);
        assert_eq!(parse_amount("₹1,200"), 1200.0);
        assert_eq!(parse_amount("not_a_number"), 0.0);
    }

    #[test]
    fn test_parse_amount_parenthesized_negatives() {
        assert_eq!(parse_amount("(500.00)"), -500.0);
        assert_eq!(parse_amount("(1,234.56)"), -1234.56);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45678.0), NaiveDate::from_ymd_opt(2025, 1, 21));
        assert_eq!(excel_serial_to_date(45667.0), NaiveDate::from_ymd_opt(2025, 1, 10));
        // Time of day is dropped.
        assert_eq!(excel_serial_to_date(45678.75), NaiveDate::from_ymd_opt(2025, 1, 21));
    }

    #[test]
    fn test_parse_date_text_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 20);
        assert_eq!(parse_date_text("2026-01-20"), expected);
        assert_eq!(parse_date_text("2026-01-20T10:30:00Z"), expected);
        assert_eq!(parse_date_text("01/20/2026"), expected);
        assert_eq!(parse_date_text("20-Jan-2026"), expected);
        assert_eq!(parse_date_text("2026/01/20"), expected);
        assert_eq!(parse_date_text("13/45/2026"), None);
        assert_eq!(parse_date_text("yesterday"), None);
    }

    #[test]
    fn test_infer_columns_by_keyword() {
        let first = row(&[
            ("Txn Date", CellValue::Empty),
            ("Kind", CellValue::Empty),
            ("Group", CellValue::Empty),
            ("Narrative", CellValue::Empty),
            ("Total Value", CellValue::Empty),
        ]);
        let mapping = ColumnMapping::infer(&first);
        assert_eq!(mapping.date.as_deref(), Some("Txn Date"));
        assert_eq!(mapping.kind.as_deref(), Some("Kind"));
        assert_eq!(mapping.category.as_deref(), Some("Group"));
        assert_eq!(mapping.details.as_deref(), Some("Narrative"));
        assert_eq!(mapping.amount.as_deref(), Some("Total Value"));
        assert!(mapping.unmapped().is_empty());
    }

    #[test]
    fn test_infer_takes_first_matching_column() {
        let first = row(&[
            ("Transaction Date", CellValue::Empty),
            ("Type", CellValue::Empty),
        ]);
        let mapping = ColumnMapping::infer(&first);
        assert_eq!(mapping.date.as_deref(), Some("Transaction Date"));
        // "transaction" is a type keyword too, and that column comes first.
        assert_eq!(mapping.kind.as_deref(), Some("Transaction Date"));
        assert_eq!(mapping.unmapped(), vec!["category", "details", "amount"]);
    }

    #[test]
    fn test_reconcile_template_row_with_existing_category() {
        let rows = vec![template_row(
            text("2026-01-20"),
            "expense",
            "Food",
            "Lunch",
            CellValue::Number(15.0),
        )];
        let plan = reconcile(&rows, &[category("Food")], today()).unwrap();
        assert_eq!(
            plan.transactions,
            vec![NewTransaction {
                date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
                kind: TxnType::Expense,
                category: "Food".to_string(),
                sub_category: None,
                details: "Lunch".to_string(),
                amount: 15.0,
            }]
        );
        assert!(plan.categories.is_empty());
    }

    #[test]
    fn test_reconcile_queues_unknown_category() {
        let rows = vec![template_row(text("2026-02-01"), "expense", "Travel", "Train", CellValue::Number(80.0))];
        let plan = reconcile(&rows, &[], today()).unwrap();
        assert_eq!(plan.categories.len(), 1);
        let travel = &plan.categories[0];
        assert_eq!(travel.name, "Travel");
        assert_eq!(travel.kind, TxnType::Expense);
        assert_eq!(travel.color, palette_color(0));
        assert_eq!(travel.notes.as_deref(), Some(AUTO_CATEGORY_NOTE));
    }

    #[test]
    fn test_reconcile_dedupes_new_names_within_batch() {
        let rows = vec![
            template_row(text("2026-02-01"), "expense", "Travel", "Train", CellValue::Number(80.0)),
            template_row(text("2026-02-02"), "expense", "travel", "Taxi", CellValue::Number(12.0)),
            template_row(text("2026-02-03"), "income", "Gifts", "Birthday", CellValue::Number(50.0)),
        ];
        let existing = vec![category("Food"), category("Salary")];
        let plan = reconcile(&rows, &existing, today()).unwrap();
        let names: Vec<_> = plan.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Travel", "Gifts"]);
        assert_eq!(plan.categories[0].color, palette_color(2));
        assert_eq!(plan.categories[1].color, palette_color(3));
        assert_eq!(plan.categories[1].kind, TxnType::Income);
    }

    #[test]
    fn test_reconcile_matches_existing_ignoring_case() {
        let rows = vec![template_row(text("2026-02-01"), "expense", "FOOD", "Dinner", CellValue::Number(30.0))];
        let plan = reconcile(&rows, &[category("Food")], today()).unwrap();
        assert!(plan.categories.is_empty());
        // The transaction keeps the spelling from the file.
        assert_eq!(plan.transactions[0].category, "FOOD");
    }

    #[test]
    fn test_reconcile_defaults_for_missing_cells() {
        let rows = vec![row(&[("Notes", text("mystery")), ("Date", CellValue::Empty)])];
        let plan = reconcile(&rows, &[], today()).unwrap();
        let t = &plan.transactions[0];
        assert_eq!(t.date, today());
        assert_eq!(t.kind, TxnType::Expense);
        assert_eq!(t.category, DEFAULT_CATEGORY);
        assert_eq!(t.details, "mystery");
        assert_eq!(t.amount, 0.0);
        assert_eq!(plan.categories[0].name, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_reconcile_normalizes_type_and_amount() {
        let rows = vec![
            template_row(CellValue::Number(45678.0), " INCOME ", "Salary", "Pay", text("-5,000")),
            template_row(text("2026-01-20"), "refund", "Food", "x", text("abc")),
        ];
        let plan = reconcile(&rows, &[], today()).unwrap();
        assert_eq!(plan.transactions[0].date, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap());
        assert_eq!(plan.transactions[0].kind, TxnType::Income);
        assert_eq!(plan.transactions[0].amount, 5000.0);
        assert_eq!(plan.transactions[1].kind, TxnType::Expense);
        assert_eq!(plan.transactions[1].amount, 0.0);
    }

    #[test]
    fn test_reconcile_empty_input() {
        assert!(matches!(reconcile(&[], &[], today()), Err(LedgerError::EmptyInput)));
    }

    #[test]
    fn test_reconcile_rejects_unreadable_date() {
        let rows = vec![
            template_row(text("2026-01-20"), "expense", "Food", "ok", CellValue::Number(1.0)),
            template_row(text("someday"), "expense", "Food", "bad", CellValue::Number(1.0)),
        ];
        let err = reconcile(&rows, &[], today()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn test_parse_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.csv");
        std::fs::write(
            &path,
            "Date,Type,Category,Details,Amount\n2026-01-20,expense,Food,Lunch,15\n,,,,\n2026-01-21,income,Salary,Pay\n",
        )
        .unwrap();
        let rows = parse_tabular(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Amount"), Some(&text("15")));
        // Short rows are padded so every header is present.
        assert_eq!(rows[1].get("Amount"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_csv_serial_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial.csv");
        std::fs::write(
            &path,
            "Date,Type,Category,Details,Amount\n45678,expense,Food,Lunch,15\n",
        )
        .unwrap();
        let rows = parse_tabular(&path).unwrap();
        let plan = reconcile(&rows, &[], today()).unwrap();
        assert_eq!(plan.transactions.len(), 1);
        assert_eq!(
            plan.transactions[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 21).unwrap()
        );
    }

    #[test]
    fn test_parse_csv_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "Date,Type,Category,Details,Amount\n").unwrap();
        let rows = parse_tabular(&path).unwrap();
        assert!(matches!(reconcile(&rows, &[], today()), Err(LedgerError::EmptyInput)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(matches!(parse_tabular(&path), Err(LedgerError::Parse(_))));
    }

    #[cfg(feature = "spreadsheet")]
    #[test]
    fn test_corrupt_workbook_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        assert!(matches!(parse_tabular(&path), Err(LedgerError::Parse(_))));
    }
}
