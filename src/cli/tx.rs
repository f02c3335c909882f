use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{amount_cells, currency_headers, date_arg, today, Session, TxFields};
use crate::currency::Amounts;
use crate::db::with_retry;
use crate::error::Result;
use crate::fmt::amount;
use crate::ledger::{self, Inserted, Source};
use crate::models::NewTransaction;
use crate::reports::{fetch_transactions, Filter};

fn to_new(fields: TxFields) -> Result<NewTransaction> {
    let date = date_arg(&fields.date)?;
    let amounts = Amounts::new(fields.dolar, fields.euro, fields.zl, fields.tl);
    Ok(NewTransaction {
        vehicle: fields.vehicle,
        container: fields.container,
        price: fields.price,
        notes: fields.notes,
        ..NewTransaction::new(&date, &fields.name, amounts)
    })
}

pub fn add(fields: TxFields) -> Result<()> {
    let session = Session::open()?;
    let new = to_new(fields)?;
    match with_retry(session.retry(), || ledger::insert_transaction(&session.conn, &new, Source::Manual))? {
        Inserted::Row(id) => println!("Added transaction {id} for {}", new.name.trim()),
        Inserted::Duplicate => println!("An identical transaction already exists; nothing changed."),
    }
    Ok(())
}

pub fn edit(id: i64, fields: TxFields) -> Result<()> {
    let session = Session::open()?;
    let new = to_new(fields)?;
    let old = with_retry(session.retry(), || ledger::update_transaction(&session.conn, id, &new))?;
    if old.name != new.name.trim() {
        println!("Updated transaction {id} (moved from {} to {})", old.name, new.name.trim());
    } else {
        println!("Updated transaction {id}");
    }
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let session = Session::open()?;
    let old = with_retry(session.retry(), || ledger::delete_transaction(&session.conn, id))?;
    println!("Deleted transaction {id} ({} on {})", old.name, old.date);
    Ok(())
}

pub fn list(profile: Option<String>, date: Option<String>, all_dates: bool) -> Result<()> {
    let session = Session::open()?;
    let date = if all_dates {
        None
    } else {
        Some(match date {
            Some(d) => date_arg(&d)?,
            None => today(),
        })
    };
    let filter = Filter { profile, date };
    let rows = fetch_transactions(&session.conn, &filter)?;

    let mut header = vec!["ID", "Date", "Name"];
    header.extend(currency_headers());
    header.extend(["Vehicle", "Container", "Price", "Notes"]);

    let mut table = Table::new();
    table.set_header(header);
    let mut total = Amounts::default();
    for t in &rows {
        total += t.amounts;
        let mut cells = vec![Cell::new(t.id), Cell::new(&t.date), Cell::new(&t.name)];
        cells.extend(amount_cells(&t.amounts));
        cells.extend([
            Cell::new(t.vehicle.as_deref().unwrap_or("")),
            Cell::new(t.container.as_deref().unwrap_or("")),
            Cell::new(t.price.map(amount).unwrap_or_default()),
            Cell::new(t.notes.as_deref().unwrap_or("")),
        ]);
        table.add_row(cells);
    }
    if !rows.is_empty() {
        let mut cells = vec![Cell::new(""), Cell::new(""), Cell::new("Total".bold())];
        cells.extend(amount_cells(&total));
        table.add_row(cells);
    }

    let who = filter.profile.as_deref().unwrap_or("All Profiles");
    let when = filter.date.as_deref().unwrap_or("All Dates");
    println!("Transactions for {who} on {when}\n{table}");
    Ok(())
}
