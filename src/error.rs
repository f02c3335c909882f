use thiserror::Error;

#[derive(Error, Debug)]
pub enum KasaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] calamine::Error),

    #[error("Database is locked (gave up after {0} attempts)")]
    Locked(u32),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("No transaction with ID {0}")]
    UnknownTransaction(i64),

    #[error("No customer with ID {0}")]
    UnknownCustomer(i64),

    #[error("No outcome with ID {0}")]
    UnknownOutcome(i64),

    #[error("Transaction {id} belongs to outcome {outcome_id}; use `kasa outcome delete {outcome_id}`")]
    MirroredRow { id: i64, outcome_id: i64 },

    #[error("{kind} sheet is missing columns: {}", missing.join(", "))]
    MissingColumns { kind: String, missing: Vec<String> },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl KasaError {
    /// True when SQLite refused the write because another connection holds the lock.
    pub fn is_locked(&self) -> bool {
        match self {
            Self::Db(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Locked(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KasaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> KasaError {
        KasaError::Db(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ))
    }

    #[test]
    fn test_busy_and_locked_are_lock_errors() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_locked());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).is_locked());
        assert!(KasaError::Locked(5).is_locked());
    }

    #[test]
    fn test_other_errors_are_not_lock_errors() {
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_locked());
        assert!(!KasaError::UnknownProfile("Ali".into()).is_locked());
        assert!(!KasaError::Other("boom".into()).is_locked());
    }

    #[test]
    fn test_missing_columns_message() {
        let err = KasaError::MissingColumns {
            kind: "transactions".into(),
            missing: vec!["Dolar".into(), "ZL".into()],
        };
        assert_eq!(err.to_string(), "transactions sheet is missing columns: Dolar, ZL");
    }
}
