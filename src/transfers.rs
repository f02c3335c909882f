use rusqlite::{Connection, Row};
use tracing::info;

use crate::currency::Currency;
use crate::error::{KasaError, Result};
use crate::ledger::Inserted;
use crate::models::{Direction, NewTransfer, Transfer};

pub fn record_transfer(conn: &Connection, new: &NewTransfer, import_id: Option<i64>) -> Result<Inserted> {
    if chrono::NaiveDate::parse_from_str(&new.date, "%Y-%m-%d").is_err() {
        return Err(KasaError::InvalidDate(new.date.clone()));
    }
    if new.counterpart.trim().is_empty() {
        return Err(KasaError::Other("Transfer needs a counterpart".to_string()));
    }
    if !new.amount.is_finite() || !new.commission.is_finite() {
        return Err(KasaError::Other("Transfer amount and commission must be finite numbers".to_string()));
    }
    if new.amount < 0.0 || new.commission < 0.0 {
        return Err(KasaError::Other(
            "Transfer amount and commission must not be negative; use the direction instead".to_string(),
        ));
    }

    let changed = conn.execute(
        "INSERT INTO transfers (date, counterpart, direction, amount, currency, commission, notes, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) ON CONFLICT DO NOTHING",
        rusqlite::params![
            new.date,
            new.counterpart.trim(),
            new.direction.key(),
            new.amount,
            new.currency.key(),
            new.commission,
            new.notes,
            import_id,
        ],
    )?;
    if changed == 0 {
        return Ok(Inserted::Duplicate);
    }
    let id = conn.last_insert_rowid();
    info!(id, counterpart = %new.counterpart, amount = new.amount, currency = new.currency.key(), "Transfer recorded");
    Ok(Inserted::Row(id))
}

fn row_to_transfer(row: &Row) -> rusqlite::Result<Transfer> {
    let direction: String = row.get(3)?;
    let currency: String = row.get(5)?;
    Ok(Transfer {
        id: row.get(0)?,
        date: row.get(1)?,
        counterpart: row.get(2)?,
        direction: Direction::parse(&direction).unwrap_or(Direction::In),
        amount: row.get(4)?,
        currency: currency.parse().unwrap_or(Currency::Dolar),
        commission: row.get(6)?,
        notes: row.get(7)?,
    })
}

/// Date prefix (`YYYY`, `YYYY-MM` or a full day) and/or exact counterpart.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub period: Option<String>,
    pub counterpart: Option<String>,
}

pub fn list_transfers(conn: &Connection, filter: &TransferFilter) -> Result<Vec<Transfer>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, counterpart, direction, amount, currency, commission, notes FROM transfers \
         WHERE (?1 IS NULL OR date LIKE ?1 || '%') AND (?2 IS NULL OR counterpart = ?2) \
         ORDER BY date, id",
    )?;
    let rows = stmt.query_map(rusqlite::params![filter.period, filter.counterpart], row_to_transfer)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn delete_transfer(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM transfers WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(KasaError::Other(format!("No transfer with ID {id}")));
    }
    Ok(())
}

pub struct TransferTotal {
    pub counterpart: String,
    pub currency: Currency,
    /// Incoming minus outgoing.
    pub net: f64,
    pub commission: f64,
    pub count: i64,
}

pub fn transfer_totals(conn: &Connection, filter: &TransferFilter) -> Result<Vec<TransferTotal>> {
    let mut stmt = conn.prepare(
        "SELECT counterpart, currency, \
         SUM(CASE WHEN direction = 'in' THEN amount ELSE -amount END), \
         SUM(commission), COUNT(*) \
         FROM transfers \
         WHERE (?1 IS NULL OR date LIKE ?1 || '%') AND (?2 IS NULL OR counterpart = ?2) \
         GROUP BY counterpart, currency ORDER BY counterpart, currency",
    )?;
    let rows = stmt.query_map(rusqlite::params![filter.period, filter.counterpart], |row| {
        let currency: String = row.get(1)?;
        Ok(TransferTotal {
            counterpart: row.get(0)?,
            currency: currency.parse().unwrap_or(Currency::Dolar),
            net: row.get(2)?,
            commission: row.get(3)?,
            count: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn transfer(date: &str, who: &str, direction: Direction, amount: f64, currency: Currency, commission: f64) -> NewTransfer {
        NewTransfer {
            date: date.to_string(),
            counterpart: who.to_string(),
            direction,
            amount,
            currency,
            commission,
            notes: None,
        }
    }

    #[test]
    fn test_record_and_list() {
        let (_dir, conn) = test_db();
        record_transfer(&conn, &transfer("2024-02-01", "Kowalski", Direction::In, 500.0, Currency::Euro, 5.0), None).unwrap();
        record_transfer(&conn, &transfer("2024-02-03", "Kowalski", Direction::Out, 200.0, Currency::Euro, 2.0), None).unwrap();
        let all = list_transfers(&conn, &TransferFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].direction, Direction::Out);
        assert_eq!(all[1].currency, Currency::Euro);
    }

    #[test]
    fn test_duplicate_transfer_skipped() {
        let (_dir, conn) = test_db();
        let t = transfer("2024-02-01", "Kowalski", Direction::In, 500.0, Currency::Euro, 5.0);
        assert!(matches!(record_transfer(&conn, &t, None).unwrap(), Inserted::Row(_)));
        assert_eq!(record_transfer(&conn, &t, None).unwrap(), Inserted::Duplicate);
    }

    #[test]
    fn test_rejects_negative_amount() {
        let (_dir, conn) = test_db();
        let t = transfer("2024-02-01", "Kowalski", Direction::In, -5.0, Currency::Euro, 0.0);
        assert!(record_transfer(&conn, &t, None).is_err());
    }

    #[test]
    fn test_rejects_non_finite_amount() {
        let (_dir, conn) = test_db();
        let t = transfer("2024-02-01", "Kowalski", Direction::In, f64::NAN, Currency::Euro, 0.0);
        assert!(record_transfer(&conn, &t, None).is_err());
        let t = transfer("2024-02-01", "Kowalski", Direction::Out, 5.0, Currency::Euro, f64::INFINITY);
        assert!(record_transfer(&conn, &t, None).is_err());
        assert!(list_transfers(&conn, &TransferFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_totals_net_by_currency() {
        let (_dir, conn) = test_db();
        record_transfer(&conn, &transfer("2024-02-01", "Kowalski", Direction::In, 500.0, Currency::Euro, 5.0), None).unwrap();
        record_transfer(&conn, &transfer("2024-02-03", "Kowalski", Direction::Out, 200.0, Currency::Euro, 2.0), None).unwrap();
        record_transfer(&conn, &transfer("2024-02-04", "Kowalski", Direction::Out, 50.0, Currency::Dolar, 1.0), None).unwrap();
        record_transfer(&conn, &transfer("2024-03-01", "Nowak", Direction::In, 10.0, Currency::Zl, 0.0), None).unwrap();

        let feb = transfer_totals(&conn, &TransferFilter { period: Some("2024-02".into()), counterpart: None }).unwrap();
        assert_eq!(feb.len(), 2);
        let euro = feb.iter().find(|t| t.currency == Currency::Euro).unwrap();
        assert_eq!(euro.net, 300.0);
        assert_eq!(euro.commission, 7.0);
        assert_eq!(euro.count, 2);
        let dolar = feb.iter().find(|t| t.currency == Currency::Dolar).unwrap();
        assert_eq!(dolar.net, -50.0);
    }

    #[test]
    fn test_delete_transfer() {
        let (_dir, conn) = test_db();
        let Inserted::Row(id) = record_transfer(&conn, &transfer("2024-02-01", "Nowak", Direction::In, 1.0, Currency::Zl, 0.0), None).unwrap() else {
            panic!("expected insert");
        };
        delete_transfer(&conn, id).unwrap();
        assert!(delete_transfer(&conn, id).is_err());
        assert!(list_transfers(&conn, &TransferFilter::default()).unwrap().is_empty());
    }
}
