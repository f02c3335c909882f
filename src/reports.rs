use rusqlite::Connection;

use crate::currency::Amounts;
use crate::error::{KasaError, Result};
use crate::ledger::{row_to_transaction, transaction_select};
use crate::models::Transaction;

// ---------------------------------------------------------------------------
// Transaction listing
// ---------------------------------------------------------------------------

/// `profile: None` means all profiles, `date: None` means all dates.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub profile: Option<String>,
    pub date: Option<String>,
}

pub fn fetch_transactions(conn: &Connection, filter: &Filter) -> Result<Vec<Transaction>> {
    let sql = format!(
        "{} WHERE (?1 IS NULL OR name = ?1) AND (?2 IS NULL OR date = ?2) ORDER BY date, id",
        transaction_select()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![filter.profile, filter.date], row_to_transaction)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Period summaries
// ---------------------------------------------------------------------------

fn period_prefix(year: i32, month: Option<u32>) -> Result<String> {
    match month {
        Some(m) if (1..=12).contains(&m) => Ok(format!("{year:04}-{m:02}")),
        Some(m) => Err(KasaError::Other(format!("Month must be 1-12, got {m}"))),
        None => Ok(format!("{year:04}")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub amounts: Amounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub period: String,
    pub rows: Vec<SummaryRow>,
    pub total: Amounts,
}

fn summarize(conn: &Connection, period: String, profile: Option<&str>) -> Result<Summary> {
    let mut stmt = conn.prepare(
        "SELECT name, SUM(dolar), SUM(euro), SUM(zl), SUM(tl) FROM transactions \
         WHERE date LIKE ?1 || '%' AND (?2 IS NULL OR name = ?2) \
         GROUP BY name ORDER BY name",
    )?;
    let rows: Vec<SummaryRow> = stmt
        .query_map(rusqlite::params![period, profile], |row| {
            Ok(SummaryRow {
                name: row.get(0)?,
                amounts: Amounts::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total = rows.iter().fold(Amounts::default(), |acc, r| acc + r.amounts);
    Ok(Summary { period, rows, total })
}

/// Per-profile sums for one calendar month of one year.
pub fn monthly_summary(conn: &Connection, year: i32, month: u32, profile: Option<&str>) -> Result<Summary> {
    summarize(conn, period_prefix(year, Some(month))?, profile)
}

pub fn yearly_summary(conn: &Connection, year: i32, profile: Option<&str>) -> Result<Summary> {
    summarize(conn, period_prefix(year, None)?, profile)
}

// ---------------------------------------------------------------------------
// Vehicle costs
// ---------------------------------------------------------------------------

pub struct VehicleRow {
    pub vehicle: String,
    pub amounts: Amounts,
    pub outcomes: i64,
}

/// Totals of outcome-mirrored rows per vehicle.
pub fn vehicle_summary(conn: &Connection, year: i32, month: Option<u32>) -> Result<Vec<VehicleRow>> {
    let prefix = period_prefix(year, month)?;
    let mut stmt = conn.prepare(
        "SELECT vehicle, SUM(dolar), SUM(euro), SUM(zl), SUM(tl), COUNT(DISTINCT outcome_id) \
         FROM transactions \
         WHERE outcome_id IS NOT NULL AND vehicle IS NOT NULL AND date LIKE ?1 || '%' \
         GROUP BY vehicle ORDER BY vehicle",
    )?;
    let rows = stmt.query_map([prefix], |row| {
        Ok(VehicleRow {
            vehicle: row.get(0)?,
            amounts: Amounts::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
            outcomes: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
