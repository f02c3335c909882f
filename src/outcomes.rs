use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::currency::{parse_tag, TagMapping, TagPair};
use crate::error::{KasaError, Result};
use crate::ledger::{self, Inserted, Source};
use crate::models::{NewOutcome, NewTransaction, Outcome, OutcomeItem};

/// Record an expense and mirror each non-zero category into the ledger.
///
/// Mirrored rows are named after the category, carry the outcome's vehicle,
/// and land in the currencies chosen by `mapping`.
pub fn record_outcome(
    conn: &Connection,
    new: &NewOutcome,
    mapping: TagMapping,
    import_id: Option<i64>,
) -> Result<i64> {
    if chrono::NaiveDate::parse_from_str(&new.date, "%Y-%m-%d").is_err() {
        return Err(KasaError::InvalidDate(new.date.clone()));
    }
    if new.vehicle.trim().is_empty() {
        return Err(KasaError::Other("Outcome needs a vehicle".to_string()));
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO outcomes (date, vehicle, notes, import_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![new.date, new.vehicle.trim(), new.notes, import_id],
    )?;
    let outcome_id = tx.last_insert_rowid();

    for (category, raw) in &new.items {
        let category = category.trim();
        let raw = raw.trim();
        if category.is_empty() || raw.is_empty() {
            continue;
        }
        let value = parse_tag(raw);
        tx.execute(
            "INSERT INTO outcome_items (outcome_id, category, raw, m, y) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![outcome_id, category, raw, value.m, value.y],
        )?;
        if value.is_zero() {
            continue;
        }
        let mirror = NewTransaction {
            date: new.date.clone(),
            name: category.to_string(),
            amounts: mapping.to_amounts(value),
            vehicle: Some(new.vehicle.trim().to_string()),
            container: None,
            price: None,
            notes: new.notes.clone(),
        };
        if let Inserted::Duplicate = ledger::insert_row(&tx, &mirror, Source::Outcome(outcome_id))? {
            // Same category and value twice in one outcome hits the dedup index.
            return Err(KasaError::Other(format!(
                "Category '{category}' appears twice in the same outcome"
            )));
        }
    }
    tx.commit()?;

    info!(outcome_id, vehicle = %new.vehicle, date = %new.date, "Outcome recorded");
    Ok(outcome_id)
}

fn load_items(conn: &Connection, outcome_id: i64) -> Result<Vec<OutcomeItem>> {
    let mut stmt = conn.prepare_cached(
        "SELECT category, raw, m, y FROM outcome_items WHERE outcome_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([outcome_id], |row| {
        Ok(OutcomeItem {
            category: row.get(0)?,
            raw: row.get(1)?,
            value: TagPair {
                m: row.get(2)?,
                y: row.get(3)?,
            },
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn get_outcome(conn: &Connection, id: i64) -> Result<Outcome> {
    let head: Option<(String, String, Option<String>)> = conn
        .query_row(
            "SELECT date, vehicle, notes FROM outcomes WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (date, vehicle, notes) = head.ok_or(KasaError::UnknownOutcome(id))?;
    Ok(Outcome {
        id,
        date,
        vehicle,
        notes,
        items: load_items(conn, id)?,
    })
}

/// Date prefix (`YYYY`, `YYYY-MM` or a full day) and/or exact vehicle.
#[derive(Debug, Clone, Default)]
pub struct OutcomeFilter {
    pub period: Option<String>,
    pub vehicle: Option<String>,
}

pub fn list_outcomes(conn: &Connection, filter: &OutcomeFilter) -> Result<Vec<Outcome>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, vehicle, notes FROM outcomes \
         WHERE (?1 IS NULL OR date LIKE ?1 || '%') AND (?2 IS NULL OR vehicle = ?2) \
         ORDER BY date, id",
    )?;
    let heads: Vec<(i64, String, String, Option<String>)> = stmt
        .query_map(rusqlite::params![filter.period, filter.vehicle], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    heads
        .into_iter()
        .map(|(id, date, vehicle, notes)| {
            Ok(Outcome {
                id,
                date,
                vehicle,
                notes,
                items: load_items(conn, id)?,
            })
        })
        .collect()
}

/// True when an outcome with the same date, vehicle and category cells already exists.
pub fn is_duplicate(conn: &Connection, new: &NewOutcome) -> Result<bool> {
    let mut wanted: Vec<(String, String)> = new
        .items
        .iter()
        .map(|(c, r)| (c.trim().to_string(), r.trim().to_string()))
        .filter(|(c, r)| !c.is_empty() && !r.is_empty())
        .collect();
    wanted.sort();

    let mut stmt = conn.prepare_cached("SELECT id FROM outcomes WHERE date = ?1 AND vehicle = ?2")?;
    let ids: Vec<i64> = stmt
        .query_map(rusqlite::params![new.date, new.vehicle.trim()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for id in ids {
        let mut existing: Vec<(String, String)> = load_items(conn, id)?
            .into_iter()
            .map(|item| (item.category, item.raw))
            .collect();
        existing.sort();
        if existing == wanted {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Reverse an outcome's mirrored transactions, then remove it.
pub fn delete_outcome(conn: &Connection, id: i64) -> Result<Outcome> {
    let outcome = get_outcome(conn, id)?;
    let tx = conn.unchecked_transaction()?;
    let mirrored: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT id FROM transactions WHERE outcome_id = ?1")?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids
    };
    for txn_id in mirrored {
        ledger::reverse_row(&tx, txn_id)?;
    }
    tx.execute("DELETE FROM outcome_items WHERE outcome_id = ?1", [id])?;
    tx.execute("DELETE FROM outcomes WHERE id = ?1", [id])?;
    tx.commit()?;

    info!(outcome_id = id, "Outcome deleted");
    Ok(outcome)
}
