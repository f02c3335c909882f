use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::warn;

use crate::error::{KasaError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
    name TEXT PRIMARY KEY,
    balance_dolar REAL NOT NULL DEFAULT 0,
    balance_euro REAL NOT NULL DEFAULT 0,
    balance_zl REAL NOT NULL DEFAULT 0,
    balance_tl REAL NOT NULL DEFAULT 0,
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    kind TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    vehicle TEXT NOT NULL,
    notes TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS outcome_items (
    id INTEGER PRIMARY KEY,
    outcome_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    raw TEXT NOT NULL,
    m REAL NOT NULL DEFAULT 0,
    y REAL NOT NULL DEFAULT 0,
    FOREIGN KEY (outcome_id) REFERENCES outcomes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    name TEXT NOT NULL,
    dolar REAL NOT NULL DEFAULT 0,
    euro REAL NOT NULL DEFAULT 0,
    zl REAL NOT NULL DEFAULT 0,
    tl REAL NOT NULL DEFAULT 0,
    vehicle TEXT,
    container TEXT,
    price REAL,
    notes TEXT,
    source TEXT NOT NULL DEFAULT 'manual',
    outcome_id INTEGER,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (name) REFERENCES profiles(name),
    FOREIGN KEY (outcome_id) REFERENCES outcomes(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS transactions_dedup ON transactions (
    date, name, dolar, euro, zl, tl,
    IFNULL(vehicle, ''), IFNULL(container, ''), IFNULL(notes, ''), IFNULL(outcome_id, 0)
);

CREATE INDEX IF NOT EXISTS transactions_name_date ON transactions (name, date);

CREATE TABLE IF NOT EXISTS transfers (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    counterpart TEXT NOT NULL,
    direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
    amount REAL NOT NULL,
    currency TEXT NOT NULL,
    commission REAL NOT NULL DEFAULT 0,
    notes TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS transfers_dedup ON transfers (
    date, counterpart, direction, amount, currency, commission, IFNULL(notes, '')
);

CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    address TEXT,
    notes TEXT,
    updated_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    // Lock contention is handled by `with_retry`, not by SQLite's own wait.
    conn.busy_timeout(Duration::ZERO)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// How many times to retry a write that hit a locked database.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Run `op`, sleeping and retrying while it fails with a lock error.
///
/// Non-lock errors are returned on the first failure.
pub fn with_retry<T, F>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_locked() => {
                if attempt >= attempts {
                    return Err(KasaError::Locked(attempts));
                }
                warn!(attempt, attempts, error = %e, "Database locked, retrying");
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn busy() -> KasaError {
        KasaError::Db(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "transactions",
            "profiles",
            "transfers",
            "outcomes",
            "outcome_items",
            "customers",
            "imports",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_transfer_direction_is_checked() {
        let (_dir, conn) = test_db();
        let res = conn.execute(
            "INSERT INTO transfers (date, counterpart, direction, amount, currency) VALUES ('2024-01-01', 'X', 'sideways', 1, 'euro')",
            [],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_with_retry_recovers_from_lock() {
        let calls = Cell::new(0);
        let out = with_retry(fast_policy(5), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(busy())
            } else {
                Ok(42)
            }
        })
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_with_retry_gives_up() {
        let calls = Cell::new(0);
        let res: Result<()> = with_retry(fast_policy(3), || {
            calls.set(calls.get() + 1);
            Err(busy())
        });
        assert!(matches!(res, Err(KasaError::Locked(3))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_with_retry_does_not_retry_other_errors() {
        let calls = Cell::new(0);
        let res: Result<()> = with_retry(fast_policy(5), || {
            calls.set(calls.get() + 1);
            Err(KasaError::Other("bad row".into()))
        });
        assert!(matches!(res, Err(KasaError::Other(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_with_retry_against_real_lock() {
        let (dir, conn) = test_db();
        let other = get_connection(&dir.path().join("test.db")).unwrap();
        conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        let res = with_retry(fast_policy(2), || {
            other.execute(
                "INSERT INTO profiles (name) VALUES ('Locked Out')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(res, Err(KasaError::Locked(2))));
        conn.execute_batch("COMMIT").unwrap();
    }
}
