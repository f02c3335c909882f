use comfy_table::{Cell, Table};

use crate::cli::{date_arg, period_arg, Session};
use crate::db::with_retry;
use crate::error::{KasaError, Result};
use crate::fmt::amount_or_blank;
use crate::models::NewOutcome;
use crate::outcomes::{self, OutcomeFilter};

/// Split `Category=150Y` into its category and raw value.
fn parse_item(raw: &str) -> Result<(String, String)> {
    let (category, value) = raw
        .split_once('=')
        .ok_or_else(|| KasaError::Other(format!("Item '{raw}' must look like CATEGORY=VALUE")))?;
    if category.trim().is_empty() {
        return Err(KasaError::Other(format!("Item '{raw}' has no category")));
    }
    Ok((category.trim().to_string(), value.trim().to_string()))
}

pub fn add(date: &str, vehicle: &str, items: &[String], notes: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let new = NewOutcome {
        date: date_arg(date)?,
        vehicle: vehicle.to_string(),
        notes,
        items: items.iter().map(|i| parse_item(i)).collect::<Result<Vec<_>>>()?,
    };
    let mapping = session.settings.tag_mapping();
    let id = with_retry(session.retry(), || {
        outcomes::record_outcome(&session.conn, &new, mapping, None)
    })?;
    let stored = outcomes::get_outcome(&session.conn, id)?;
    let total = stored.total();
    println!(
        "Recorded outcome {id} for {} on {}: {} M, {} Y",
        stored.vehicle,
        stored.date,
        amount_or_blank(total.m),
        amount_or_blank(total.y)
    );
    Ok(())
}

pub fn list(month: Option<String>, year: Option<i32>, vehicle: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let period = period_arg(&month, year)?;
    let list = outcomes::list_outcomes(&session.conn, &OutcomeFilter { period, vehicle })?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Vehicle", "Category", "Value", "M", "Y", "Notes"]);
    for o in &list {
        for (i, item) in o.items.iter().enumerate() {
            let (id, date, vehicle, notes) = if i == 0 {
                (o.id.to_string(), o.date.as_str(), o.vehicle.as_str(), o.notes.as_deref().unwrap_or(""))
            } else {
                (String::new(), "", "", "")
            };
            table.add_row(vec![
                Cell::new(id),
                Cell::new(date),
                Cell::new(vehicle),
                Cell::new(&item.category),
                Cell::new(&item.raw),
                Cell::new(amount_or_blank(item.value.m)),
                Cell::new(amount_or_blank(item.value.y)),
                Cell::new(notes),
            ]);
        }
        let total = o.total();
        table.add_row(vec![
            Cell::new(if o.items.is_empty() { o.id.to_string() } else { String::new() }),
            Cell::new(if o.items.is_empty() { o.date.as_str() } else { "" }),
            Cell::new(if o.items.is_empty() { o.vehicle.as_str() } else { "" }),
            Cell::new("Total"),
            Cell::new(""),
            Cell::new(amount_or_blank(total.m)),
            Cell::new(amount_or_blank(total.y)),
            Cell::new(""),
        ]);
    }
    println!("Outcomes\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let session = Session::open()?;
    let removed = with_retry(session.retry(), || outcomes::delete_outcome(&session.conn, id))?;
    println!(
        "Deleted outcome {id} ({} on {}, {} categories reversed)",
        removed.vehicle,
        removed.date,
        removed.items.len()
    );
    Ok(())
}
