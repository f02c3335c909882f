use comfy_table::{Cell, Table};

use crate::cli::{date_arg, period_arg, Session};
use crate::currency::Currency;
use crate::db::with_retry;
use crate::error::{KasaError, Result};
use crate::fmt::money;
use crate::ledger::Inserted;
use crate::models::{Direction, NewTransfer};
use crate::transfers::{self, TransferFilter};

#[allow(clippy::too_many_arguments)]
pub fn add(
    date: &str,
    counterpart: &str,
    direction: &str,
    amount: f64,
    currency: &str,
    commission: f64,
    notes: Option<String>,
) -> Result<()> {
    let session = Session::open()?;
    let new = NewTransfer {
        date: date_arg(date)?,
        counterpart: counterpart.to_string(),
        direction: Direction::parse(direction)
            .ok_or_else(|| KasaError::Other(format!("Direction must be 'in' or 'out', got '{direction}'")))?,
        amount,
        currency: currency.parse::<Currency>()?,
        commission,
        notes,
    };
    match with_retry(session.retry(), || transfers::record_transfer(&session.conn, &new, None))? {
        Inserted::Row(id) => println!(
            "Recorded transfer {id}: {} {} {}",
            new.direction.key(),
            money(new.amount, new.currency),
            new.counterpart
        ),
        Inserted::Duplicate => println!("An identical transfer already exists; nothing changed."),
    }
    Ok(())
}

pub fn list(month: Option<String>, counterpart: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let filter = TransferFilter {
        period: period_arg(&month, None)?,
        counterpart,
    };
    let rows = transfers::list_transfers(&session.conn, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Counterpart", "Direction", "Amount", "Commission", "Notes"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.date),
            Cell::new(&t.counterpart),
            Cell::new(t.direction.key()),
            Cell::new(money(t.direction.sign() * t.amount, t.currency)),
            Cell::new(money(t.commission, t.currency)),
            Cell::new(t.notes.as_deref().unwrap_or("")),
        ]);
    }
    println!("Transfers\n{table}");
    Ok(())
}

pub fn totals(month: Option<String>, year: Option<i32>) -> Result<()> {
    let session = Session::open()?;
    let filter = TransferFilter {
        period: period_arg(&month, year)?,
        counterpart: None,
    };
    let rows = transfers::transfer_totals(&session.conn, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["Counterpart", "Currency", "Net (in - out)", "Commission", "Count"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(&t.counterpart),
            Cell::new(t.currency),
            Cell::new(money(t.net, t.currency)),
            Cell::new(money(t.commission, t.currency)),
            Cell::new(t.count),
        ]);
    }
    println!("Transfer Totals\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let session = Session::open()?;
    with_retry(session.retry(), || transfers::delete_transfer(&session.conn, id))?;
    println!("Deleted transfer {id}");
    Ok(())
}
