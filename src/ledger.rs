use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::currency::Amounts;
use crate::error::{KasaError, Result};
use crate::models::{NewTransaction, Profile, Transaction};

/// Balances further apart than this are reported as drift.
pub const DRIFT_TOLERANCE: f64 = 0.005;

const TX_COLUMNS: &str =
    "id, date, name, dolar, euro, zl, tl, vehicle, container, price, notes, source";

/// Where a ledger row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Manual,
    Import(i64),
    Outcome(i64),
}

impl Source {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Import(_) => "import",
            Self::Outcome(_) => "outcome",
        }
    }

    fn import_id(&self) -> Option<i64> {
        match self {
            Self::Import(id) => Some(*id),
            _ => None,
        }
    }

    fn outcome_id(&self) -> Option<i64> {
        match self {
            Self::Outcome(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Row(i64),
    Duplicate,
}

pub(crate) fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        name: row.get(2)?,
        amounts: Amounts::new(row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?),
        vehicle: row.get(7)?,
        container: row.get(8)?,
        price: row.get(9)?,
        notes: row.get(10)?,
        source: row.get(11)?,
    })
}

pub(crate) fn transaction_select() -> String {
    format!("SELECT {TX_COLUMNS} FROM transactions")
}

fn validate(new: &NewTransaction) -> Result<()> {
    if chrono::NaiveDate::parse_from_str(&new.date, "%Y-%m-%d").is_err() {
        return Err(KasaError::InvalidDate(new.date.clone()));
    }
    if new.name.trim().is_empty() {
        return Err(KasaError::Other("Transaction needs a profile name".to_string()));
    }
    if !new.amounts.is_finite() || new.price.is_some_and(|p| !p.is_finite()) {
        return Err(KasaError::Other(format!(
            "Transaction for {} has a non-finite amount",
            new.name.trim()
        )));
    }
    Ok(())
}

/// Rows mirrored from an outcome change only through that outcome.
fn ensure_not_mirrored(conn: &Connection, id: i64) -> Result<()> {
    let outcome_id: Option<i64> = conn
        .query_row("SELECT outcome_id FROM transactions WHERE id = ?1", [id], |r| r.get(0))
        .optional()?
        .flatten();
    match outcome_id {
        Some(outcome_id) => Err(KasaError::MirroredRow { id, outcome_id }),
        None => Ok(()),
    }
}

fn ensure_profile(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [name],
    )?;
    Ok(())
}

fn adjust_balance(conn: &Connection, name: &str, delta: Amounts) -> Result<()> {
    conn.execute(
        "UPDATE profiles SET \
         balance_dolar = balance_dolar + ?2, \
         balance_euro = balance_euro + ?3, \
         balance_zl = balance_zl + ?4, \
         balance_tl = balance_tl + ?5, \
         updated_at = datetime('now') \
         WHERE name = ?1",
        rusqlite::params![name, delta.dolar, delta.euro, delta.zl, delta.tl],
    )?;
    Ok(())
}

/// Insert a row and add it to its profile balance. Callers own the SQL transaction.
pub(crate) fn insert_row(conn: &Connection, new: &NewTransaction, source: Source) -> Result<Inserted> {
    validate(new)?;
    let name = new.name.trim();
    ensure_profile(conn, name)?;
    let changed = conn.execute(
        "INSERT INTO transactions (date, name, dolar, euro, zl, tl, vehicle, container, price, notes, source, outcome_id, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) ON CONFLICT DO NOTHING",
        rusqlite::params![
            new.date,
            name,
            new.amounts.dolar,
            new.amounts.euro,
            new.amounts.zl,
            new.amounts.tl,
            new.vehicle,
            new.container,
            new.price,
            new.notes,
            source.key(),
            source.outcome_id(),
            source.import_id(),
        ],
    )?;
    if changed == 0 {
        debug!(date = %new.date, profile = name, "Duplicate transaction skipped");
        return Ok(Inserted::Duplicate);
    }
    let id = conn.last_insert_rowid();
    adjust_balance(conn, name, new.amounts)?;
    Ok(Inserted::Row(id))
}

/// Remove a row and take it back out of its profile balance. Callers own the SQL transaction.
pub(crate) fn reverse_row(conn: &Connection, id: i64) -> Result<Transaction> {
    let old = get_transaction(conn, id)?;
    adjust_balance(conn, &old.name, -old.amounts)?;
    conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    Ok(old)
}

pub fn insert_transaction(conn: &Connection, new: &NewTransaction, source: Source) -> Result<Inserted> {
    let tx = conn.unchecked_transaction()?;
    let inserted = insert_row(&tx, new, source)?;
    tx.commit()?;
    Ok(inserted)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("{} WHERE id = ?1", transaction_select()),
        [id],
        row_to_transaction,
    )
    .optional()?
    .ok_or(KasaError::UnknownTransaction(id))
}

/// Replace a row's contents: the old amounts leave the old profile, the new amounts
/// join the (possibly different) new profile.
pub fn update_transaction(conn: &Connection, id: i64, new: &NewTransaction) -> Result<Transaction> {
    validate(new)?;
    let tx = conn.unchecked_transaction()?;
    let old = get_transaction(&tx, id)?;
    ensure_not_mirrored(&tx, id)?;
    let name = new.name.trim();

    adjust_balance(&tx, &old.name, -old.amounts)?;
    ensure_profile(&tx, name)?;
    tx.execute(
        "UPDATE transactions SET date = ?2, name = ?3, dolar = ?4, euro = ?5, zl = ?6, tl = ?7, \
         vehicle = ?8, container = ?9, price = ?10, notes = ?11 WHERE id = ?1",
        rusqlite::params![
            id,
            new.date,
            name,
            new.amounts.dolar,
            new.amounts.euro,
            new.amounts.zl,
            new.amounts.tl,
            new.vehicle,
            new.container,
            new.price,
            new.notes,
        ],
    )?;
    adjust_balance(&tx, name, new.amounts)?;
    tx.commit()?;

    info!(id, from = %old.name, to = name, "Transaction updated");
    Ok(old)
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let tx = conn.unchecked_transaction()?;
    ensure_not_mirrored(&tx, id)?;
    let old = reverse_row(&tx, id)?;
    tx.commit()?;
    info!(id, profile = %old.name, "Transaction reversed");
    Ok(old)
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        name: row.get(0)?,
        balance: Amounts::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
    })
}

pub fn list_profiles(conn: &Connection) -> Result<Vec<Profile>> {
    let mut stmt = conn.prepare(
        "SELECT name, balance_dolar, balance_euro, balance_zl, balance_tl FROM profiles ORDER BY name",
    )?;
    let rows = stmt.query_map([], row_to_profile)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn get_profile(conn: &Connection, name: &str) -> Result<Profile> {
    conn.query_row(
        "SELECT name, balance_dolar, balance_euro, balance_zl, balance_tl FROM profiles WHERE name = ?1",
        [name],
        row_to_profile,
    )
    .optional()?
    .ok_or_else(|| KasaError::UnknownProfile(name.to_string()))
}

/// A profile whose stored balance disagrees with the sum of its transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceFix {
    pub name: String,
    pub stored: Amounts,
    pub computed: Amounts,
}

fn transaction_sums(conn: &Connection) -> Result<BTreeMap<String, Amounts>> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(SUM(dolar), 0), COALESCE(SUM(euro), 0), COALESCE(SUM(zl), 0), COALESCE(SUM(tl), 0) \
         FROM transactions GROUP BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            Amounts::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
        ))
    })?;
    Ok(rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()?)
}

/// Compare stored balances with transaction sums without changing anything.
pub fn verify_balances(conn: &Connection) -> Result<Vec<BalanceFix>> {
    let mut sums = transaction_sums(conn)?;
    let mut fixes = Vec::new();

    for profile in list_profiles(conn)? {
        let computed = sums.remove(&profile.name).unwrap_or_default();
        if profile.balance.max_drift(&computed) > DRIFT_TOLERANCE {
            fixes.push(BalanceFix {
                name: profile.name,
                stored: profile.balance,
                computed,
            });
        }
    }
    // Names with rows but no profile row at all.
    for (name, computed) in sums {
        fixes.push(BalanceFix {
            name,
            stored: Amounts::default(),
            computed,
        });
    }
    Ok(fixes)
}

/// Rebuild every profile balance from its transactions. Returns the profiles that had drifted.
pub fn recompute_balances(conn: &Connection) -> Result<Vec<BalanceFix>> {
    let fixes = verify_balances(conn)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO profiles (name) SELECT DISTINCT name FROM transactions WHERE true \
         ON CONFLICT(name) DO NOTHING",
        [],
    )?;
    tx.execute_batch(
        "UPDATE profiles SET \
         balance_dolar = (SELECT COALESCE(SUM(dolar), 0) FROM transactions t WHERE t.name = profiles.name), \
         balance_euro = (SELECT COALESCE(SUM(euro), 0) FROM transactions t WHERE t.name = profiles.name), \
         balance_zl = (SELECT COALESCE(SUM(zl), 0) FROM transactions t WHERE t.name = profiles.name), \
         balance_tl = (SELECT COALESCE(SUM(tl), 0) FROM transactions t WHERE t.name = profiles.name), \
         updated_at = datetime('now');",
    )?;
    tx.commit()?;
    for fix in &fixes {
        info!(profile = %fix.name, drift = fix.stored.max_drift(&fix.computed), "Balance corrected");
    }
    Ok(fixes)
}
