use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::currency::{parse_amount, Amounts, Currency, TagMapping};
use crate::db::{with_retry, RetryPolicy};
use crate::error::{KasaError, Result};
use crate::ledger::{self, Inserted, Source};
use crate::models::{Customer, Direction, NewOutcome, NewTransaction, NewTransfer};
use crate::{customers, outcomes, transfers};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Excel serial day number to `YYYY-MM-DD`.
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Normalize a date cell to `YYYY-MM-DD`.
///
/// Accepts `dd.mm.YYYY`, `dd/mm/YYYY`, ISO dates (with or without a time part)
/// and Excel serial numbers.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date().format("%Y-%m-%d").to_string());
        }
    }
    match raw.parse::<f64>() {
        // 1900-01-01 through 9999-12-31
        Ok(serial) if (1.0..2_958_466.0).contains(&serial) => excel_serial_to_date(serial),
        _ => None,
    }
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn opt_text(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// A header row plus data rows, all as trimmed text.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn from_records(records: Vec<Vec<String>>) -> Self {
        let mut iter = records
            .into_iter()
            .skip_while(|r| r.iter().all(|c| c.trim().is_empty()));
        let headers = iter
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = iter
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .map(|r| r.into_iter().map(|c| c.trim().to_string()).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fail with every required header that is absent. Matching is exact and case-sensitive.
    pub fn require(&self, kind: ImportKind, required: &[&str]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(KasaError::MissingColumns {
                kind: kind.key().to_string(),
                missing,
            })
        }
    }
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn read_csv(file_path: &Path) -> Result<Sheet> {
    let content = std::fs::read_to_string(file_path)?;
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(Sheet::from_records(records))
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).unwrap_or_default(),
        other => other.to_string(),
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook(file_path: &Path) -> Result<Sheet> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| KasaError::UnsupportedFile(format!("{} has no sheets", file_path.display())))?;
    let range = workbook.worksheet_range(&first)?;
    let records = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(Sheet::from_records(records))
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(file_path: &Path) -> Result<Sheet> {
    Err(KasaError::UnsupportedFile(format!(
        "{} (built without spreadsheet support)",
        file_path.display()
    )))
}

/// Load the first sheet of an `.xlsx`/`.xls`/`.ods` workbook or a `.csv` file.
pub fn read_sheet(file_path: &Path) -> Result<Sheet> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => read_csv(file_path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(file_path),
        _ => Err(KasaError::UnsupportedFile(file_path.display().to_string())),
    }
}

// ---------------------------------------------------------------------------
// Import kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Transactions,
    Outcomes,
    Customers,
    Transfers,
}

const ALL_KINDS: &[ImportKind] = &[
    ImportKind::Transactions,
    ImportKind::Outcomes,
    ImportKind::Customers,
    ImportKind::Transfers,
];

const NOTES: &str = "A\u{e7}\u{131}klama";
const VEHICLE: &str = "Ara\u{e7}";

impl ImportKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Outcomes => "outcomes",
            Self::Customers => "customers",
            Self::Transfers => "transfers",
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Transactions => &["Date", "Name", "Dolar", "Euro", "ZL"],
            Self::Outcomes => &["Date", VEHICLE],
            Self::Customers => &["ID", "Name"],
            Self::Transfers => &["Date", "Name", "Amount", "Currency"],
        }
    }
}

pub fn get_by_key(key: &str) -> Option<ImportKind> {
    ALL_KINDS.iter().find(|k| k.key() == key).copied()
}

/// What happened to one spreadsheet line.
enum RowOutcome {
    Imported,
    Skipped,
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub retry: RetryPolicy,
    pub tags: TagMapping,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub duplicate_file: bool,
}

pub fn import_file(
    conn: &Connection,
    file_path: &Path,
    kind: ImportKind,
    options: ImportOptions,
) -> Result<ImportResult> {
    let sheet = read_sheet(file_path)?;
    sheet.require(kind, kind.required_columns())?;

    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND kind = ?2")?;
        if stmt.exists(rusqlite::params![checksum, kind.key()])? {
            info!(file = %file_path.display(), "File already imported");
            return Ok(ImportResult {
                duplicate_file: true,
                ..Default::default()
            });
        }
    }

    // The checksum is recorded only once every row has been tried, so an
    // import cut short by a lock can be run again.
    let filename = file_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let import_id = with_retry(options.retry, || {
        conn.execute(
            "INSERT INTO imports (filename, kind, record_count) VALUES (?1, ?2, 0)",
            rusqlite::params![filename, kind.key()],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    let mut result = ImportResult::default();
    for (idx, row) in sheet.rows.iter().enumerate() {
        let line = idx + 2;
        let outcome = match kind {
            ImportKind::Transactions => import_transaction_row(conn, &sheet, row, import_id, options),
            ImportKind::Outcomes => import_outcome_row(conn, &sheet, row, import_id, options),
            ImportKind::Customers => import_customer_row(conn, &sheet, row, options),
            ImportKind::Transfers => import_transfer_row(conn, &sheet, row, import_id, options),
        };
        match outcome {
            Ok(RowOutcome::Imported) => result.imported += 1,
            Ok(RowOutcome::Skipped) => result.skipped += 1,
            Err(e @ KasaError::Locked(_)) => return Err(e),
            Err(e) => {
                warn!(line, error = %e, "Row rejected");
                result.invalid += 1;
            }
        }
    }

    with_retry(options.retry, || {
        conn.execute(
            "UPDATE imports SET record_count = ?1, checksum = ?2 WHERE id = ?3",
            rusqlite::params![result.imported as i64, checksum, import_id],
        )?;
        Ok(())
    })?;

    info!(
        file = %file_path.display(),
        kind = kind.key(),
        imported = result.imported,
        skipped = result.skipped,
        invalid = result.invalid,
        "Import finished"
    );
    Ok(result)
}

fn required_date(sheet: &Sheet, row: &[String]) -> Result<String> {
    let raw = cell(row, sheet.column("Date"));
    parse_date(raw).ok_or_else(|| KasaError::InvalidDate(raw.to_string()))
}

fn import_transaction_row(
    conn: &Connection,
    sheet: &Sheet,
    row: &[String],
    import_id: i64,
    options: ImportOptions,
) -> Result<RowOutcome> {
    let date = required_date(sheet, row)?;
    let mut amounts = Amounts::default();
    for currency in Currency::ALL {
        *amounts.get_mut(currency) = parse_amount(cell(row, sheet.column(currency.header())));
    }
    let price = opt_text(cell(row, sheet.column("Fiyat"))).map(|p| parse_amount(&p));
    let new = NewTransaction {
        date,
        name: cell(row, sheet.column("Name")).to_string(),
        amounts,
        vehicle: opt_text(cell(row, sheet.column(VEHICLE))),
        container: opt_text(cell(row, sheet.column("Konteyner"))),
        price,
        notes: opt_text(cell(row, sheet.column(NOTES))),
    };

    match with_retry(options.retry, || ledger::insert_transaction(conn, &new, Source::Import(import_id)))? {
        Inserted::Row(_) => Ok(RowOutcome::Imported),
        Inserted::Duplicate => Ok(RowOutcome::Skipped),
    }
}

fn import_outcome_row(
    conn: &Connection,
    sheet: &Sheet,
    row: &[String],
    import_id: i64,
    options: ImportOptions,
) -> Result<RowOutcome> {
    let date = required_date(sheet, row)?;
    let items = sheet
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty() && !matches!(h.as_str(), "Date" | VEHICLE | NOTES))
        .map(|(i, h)| (h.clone(), cell(row, Some(i)).to_string()))
        .filter(|(_, raw)| !raw.is_empty())
        .collect();
    let new = NewOutcome {
        date,
        vehicle: cell(row, sheet.column(VEHICLE)).to_string(),
        notes: opt_text(cell(row, sheet.column(NOTES))),
        items,
    };

    if outcomes::is_duplicate(conn, &new)? {
        debug!(date = %new.date, vehicle = %new.vehicle, "Duplicate outcome skipped");
        return Ok(RowOutcome::Skipped);
    }
    with_retry(options.retry, || {
        outcomes::record_outcome(conn, &new, options.tags, Some(import_id))
    })?;
    Ok(RowOutcome::Imported)
}

fn import_customer_row(
    conn: &Connection,
    sheet: &Sheet,
    row: &[String],
    options: ImportOptions,
) -> Result<RowOutcome> {
    let raw_id = cell(row, sheet.column("ID"));
    let id = raw_id
        .parse::<i64>()
        .ok()
        .or_else(|| raw_id.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .ok_or_else(|| KasaError::Other(format!("Customer ID '{raw_id}' is not a number")))?;
    let customer = Customer {
        id,
        name: cell(row, sheet.column("Name")).to_string(),
        phone: opt_text(cell(row, sheet.column("Phone"))),
        email: opt_text(cell(row, sheet.column("Email"))),
        address: opt_text(cell(row, sheet.column("Address"))),
        notes: opt_text(cell(row, sheet.column("Notes"))),
    };
    with_retry(options.retry, || customers::merge_customer(conn, &customer))?;
    Ok(RowOutcome::Imported)
}

fn import_transfer_row(
    conn: &Connection,
    sheet: &Sheet,
    row: &[String],
    import_id: i64,
    options: ImportOptions,
) -> Result<RowOutcome> {
    let date = required_date(sheet, row)?;
    let signed = parse_amount(cell(row, sheet.column("Amount")));
    let direction = match opt_text(cell(row, sheet.column("Direction"))) {
        Some(raw) => Direction::parse(&raw)
            .ok_or_else(|| KasaError::Other(format!("Unknown direction '{raw}'")))?,
        None if signed < 0.0 => Direction::Out,
        None => Direction::In,
    };
    let new = NewTransfer {
        date,
        counterpart: cell(row, sheet.column("Name")).to_string(),
        direction,
        amount: signed.abs(),
        currency: cell(row, sheet.column("Currency")).parse()?,
        commission: parse_amount(cell(row, sheet.column("Commission"))).abs(),
        notes: opt_text(cell(row, sheet.column(NOTES))),
    };
    match with_retry(options.retry, || transfers::record_transfer(conn, &new, Some(import_id)))? {
        Inserted::Row(_) => Ok(RowOutcome::Imported),
        Inserted::Duplicate => Ok(RowOutcome::Skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::ledger::{get_profile, verify_balances};
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn options() -> ImportOptions {
        ImportOptions {
            retry: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
            tags: TagMapping::default(),
        }
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("15.01.2025"), Some("2025-01-15".to_string()));
        assert_eq!(parse_date("2025-01-15"), Some("2025-01-15".to_string()));
        assert_eq!(parse_date("15/01/2025"), Some("2025-01-15".to_string()));
        assert_eq!(parse_date("2025-01-15 00:00:00"), Some("2025-01-15".to_string()));
        assert_eq!(parse_date("45667"), Some("2025-01-10".to_string()));
        assert_eq!(parse_date("31.02.2025"), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), Some("2025-01-10".to_string()));
        assert_eq!(excel_serial_to_date(45667.75), Some("2025-01-10".to_string()));
    }

    #[test]
    fn test_get_by_key() {
        assert_eq!(get_by_key("outcomes"), Some(ImportKind::Outcomes));
        assert_eq!(get_by_key("Outcomes"), None);
    }

    #[test]
    fn test_read_csv_semicolon_and_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "t.csv", "\u{feff}Date;Name;Dolar\n\n01.02.2024;Ali;5\n;;\n");
        let sheet = read_sheet(&path).unwrap();
        assert_eq!(sheet.headers, vec!["Date", "Name", "Dolar"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.column("Name"), Some(1));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "notes.pdf", "x");
        assert!(matches!(read_sheet(&path), Err(KasaError::UnsupportedFile(_))));
    }

    #[test]
    fn test_missing_columns_are_case_sensitive() {
        let (dir, conn) = test_db();
        let path = write_file(dir.path(), "t.csv", "Date,name,Dolar,Euro\n01.02.2024,Ali,1,2\n");
        let err = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap_err();
        match err {
            KasaError::MissingColumns { missing, .. } => assert_eq!(missing, vec!["Name", "ZL"]),
            other => panic!("unexpected error: {other}"),
        }
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0)).unwrap();
        assert_eq!(imports, 0);
    }

    #[test]
    fn test_import_transactions() {
        let (dir, conn) = test_db();
        let path = write_file(
            dir.path(),
            "daily.csv",
            "Date,Name,Dolar,Euro,ZL,T.L,Açıklama\n\
             01.02.2024,Ali,100,0,0,0,navlun\n\
             01.02.2024,Ali,-20,5,0,0,\n\
             02.02.2024,Veli,0,0,\"1.250,50\",30,\n\
             bad-date,Veli,1,1,1,1,\n",
        );
        let result = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        assert_eq!(result, ImportResult { imported: 3, skipped: 0, invalid: 1, duplicate_file: false });

        assert_eq!(get_profile(&conn, "Ali").unwrap().balance, Amounts::new(80.0, 5.0, 0.0, 0.0));
        assert_eq!(get_profile(&conn, "Veli").unwrap().balance, Amounts::new(0.0, 0.0, 1250.5, 30.0));
        let notes: Option<String> = conn
            .query_row("SELECT notes FROM transactions WHERE dolar = 100", [], |r| r.get(0))
            .unwrap();
        assert_eq!(notes.as_deref(), Some("navlun"));
        let count: i64 = conn.query_row("SELECT record_count FROM imports", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_reimport_same_file_is_noop() {
        let (dir, conn) = test_db();
        let path = write_file(dir.path(), "daily.csv", "Date,Name,Dolar,Euro,ZL\n01.02.2024,Ali,100,0,0\n");
        import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        let again = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        assert!(again.duplicate_file);
        assert_eq!(get_profile(&conn, "Ali").unwrap().balance.dolar, 100.0);
    }

    #[test]
    fn test_non_finite_cells_read_as_zero() {
        let (dir, conn) = test_db();
        let path = write_file(
            dir.path(),
            "export.csv",
            "Date,Name,Dolar,Euro,ZL\n\
             01.02.2024,Ali,100,0,0\n\
             02.02.2024,Ali,inf,0,0\n\
             03.02.2024,Ali,nan,NaN,5\n",
        );
        let result = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        assert_eq!((result.imported, result.invalid), (3, 0));
        assert_eq!(get_profile(&conn, "Ali").unwrap().balance, Amounts::new(100.0, 0.0, 5.0, 0.0));
        assert!(verify_balances(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_import_cut_short_by_lock_can_be_rerun() {
        let (dir, conn) = test_db();
        let mut content = String::from("Date,Name,Dolar,Euro,ZL\n");
        for i in 0..20_000 {
            content.push_str(&format!("01.02.2024,Ali,{i},0,0\n"));
        }
        let path = write_file(dir.path(), "big.csv", &content);

        let db_path = dir.path().join("test.db");
        let (release, released) = std::sync::mpsc::channel::<()>();
        let locker = std::thread::spawn(move || {
            let other = Connection::open(&db_path).unwrap();
            other.busy_timeout(Duration::from_secs(10)).unwrap();
            loop {
                let n: i64 = other.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
                if n > 0 {
                    break;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            other.execute_batch("BEGIN IMMEDIATE").unwrap();
            released.recv().unwrap();
            other.execute_batch("ROLLBACK").unwrap();
        });

        let first = import_file(&conn, &path, ImportKind::Transactions, options());
        release.send(()).unwrap();
        locker.join().unwrap();
        assert!(matches!(first, Err(KasaError::Locked(_))), "{first:?}");

        let second = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        assert!(!second.duplicate_file);
        let rows: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 20_000);
        assert_eq!(second.imported + second.skipped, 20_000);
        assert!(verify_balances(&conn).unwrap().is_empty());

        let third = import_file(&conn, &path, ImportKind::Transactions, options()).unwrap();
        assert!(third.duplicate_file);
    }

    #[test]
    fn test_overlapping_files_skip_duplicate_rows() {
        let (dir, conn) = test_db();
        let a = write_file(dir.path(), "a.csv", "Date,Name,Dolar,Euro,ZL\n01.02.2024,Ali,100,0,0\n02.02.2024,Ali,50,0,0\n");
        let b = write_file(dir.path(), "b.csv", "Date,Name,Dolar,Euro,ZL\n02.02.2024,Ali,50,0,0\n03.02.2024,Ali,1,0,0\n");
        import_file(&conn, &a, ImportKind::Transactions, options()).unwrap();
        let r = import_file(&conn, &b, ImportKind::Transactions, options()).unwrap();
        assert_eq!(r.imported, 1);
        assert_eq!(r.skipped, 1);
        assert_eq!(get_profile(&conn, "Ali").unwrap().balance.dolar, 151.0);
        assert!(verify_balances(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_import_outcomes() {
        let (dir, conn) = test_db();
        let path = write_file(
            dir.path(),
            "outcomes.csv",
            "Date,Araç,Yakıt,Otoyol,Yemek,Açıklama\n\
             05.03.2024,34 ABC 12,150Y,30M,,Ankara seferi\n\
             06.03.2024,34 ABC 12,20M 10Y,,5M,\n",
        );
        let result = import_file(&conn, &path, ImportKind::Outcomes, options()).unwrap();
        assert_eq!(result.imported, 2);

        let fuel = get_profile(&conn, "Yakıt").unwrap().balance;
        assert_eq!(fuel.zl, 20.0);
        assert_eq!(fuel.tl, 160.0);
        assert_eq!(get_profile(&conn, "Yemek").unwrap().balance.zl, 5.0);
        let notes: String = conn
            .query_row("SELECT notes FROM outcomes WHERE date = '2024-03-05'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(notes, "Ankara seferi");
    }

    #[test]
    fn test_import_outcomes_skips_rows_seen_before() {
        let (dir, conn) = test_db();
        let a = write_file(dir.path(), "a.csv", "Date,Araç,Yakıt\n05.03.2024,TIR-1,10M\n");
        let b = write_file(dir.path(), "b.csv", "Date,Araç,Yakıt\n05.03.2024,TIR-1,10M\n06.03.2024,TIR-1,3M\n");
        import_file(&conn, &a, ImportKind::Outcomes, options()).unwrap();
        let r = import_file(&conn, &b, ImportKind::Outcomes, options()).unwrap();
        assert_eq!((r.imported, r.skipped), (1, 1));
        assert_eq!(get_profile(&conn, "Yakıt").unwrap().balance.zl, 13.0);
    }

    #[test]
    fn test_import_customers_upserts() {
        let (dir, conn) = test_db();
        let a = write_file(dir.path(), "a.csv", "ID,Name,Phone\n1001,Demir Lojistik,555\n1002.0,Nowak,\nabc,Bad,\n");
        let r = import_file(&conn, &a, ImportKind::Customers, options()).unwrap();
        assert_eq!((r.imported, r.invalid), (2, 1));
        let b = write_file(dir.path(), "b.csv", "ID,Name,Email\n1001,Demir Lojistik A.Ş.,info@demir.example\n");
        import_file(&conn, &b, ImportKind::Customers, options()).unwrap();
        let c = customers::get_customer(&conn, 1001).unwrap();
        assert_eq!(c.name, "Demir Lojistik A.Ş.");
        assert_eq!(c.email.as_deref(), Some("info@demir.example"));
        // b.csv has no Phone column, so the stored phone survives.
        assert_eq!(c.phone.as_deref(), Some("555"));
        assert_eq!(customers::get_customer(&conn, 1002).unwrap().name, "Nowak");
    }

    #[test]
    fn test_import_transfers() {
        let (dir, conn) = test_db();
        let path = write_file(
            dir.path(),
            "transfers.csv",
            "Date,Name,Amount,Currency,Commission,Direction\n\
             01.04.2024,Kowalski,500,Euro,5,\n\
             02.04.2024,Kowalski,-200,EUR,2,\n\
             03.04.2024,Nowak,100,yen,0,\n\
             04.04.2024,Nowak,100,zl,0,out\n",
        );
        let r = import_file(&conn, &path, ImportKind::Transfers, options()).unwrap();
        assert_eq!((r.imported, r.invalid), (3, 1));
        let all = transfers::list_transfers(&conn, &transfers::TransferFilter::default()).unwrap();
        assert_eq!(all[1].direction, Direction::Out);
        assert_eq!(all[1].amount, 200.0);
        assert_eq!(all[2].currency, Currency::Zl);
        assert_eq!(all[2].direction, Direction::Out);
    }

    #[test]
    fn test_transfers_do_not_touch_profiles() {
        let (dir, conn) = test_db();
        let path = write_file(dir.path(), "t.csv", "Date,Name,Amount,Currency\n01.04.2024,Kowalski,500,euro\n");
        import_file(&conn, &path, ImportKind::Transfers, options()).unwrap();
        assert!(ledger::list_profiles(&conn).unwrap().is_empty());
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_cell_to_string() {
        use calamine::Data;
        assert_eq!(cell_to_string(&Data::Float(150.0)), "150");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::String("150Y".into())), "150Y");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
