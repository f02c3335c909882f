use comfy_table::{Cell, Table};

use crate::cli::Session;
use crate::customers::{self, Upsert};
use crate::db::with_retry;
use crate::error::Result;
use crate::models::Customer;

pub fn add(customer: Customer) -> Result<()> {
    let session = Session::open()?;
    let outcome = with_retry(session.retry(), || customers::upsert_customer(&session.conn, &customer))?;
    match outcome {
        Upsert::Created => println!("Added customer {}: {}", customer.id, customer.name),
        Upsert::Updated => println!("Updated customer {}: {}", customer.id, customer.name),
    }
    Ok(())
}

pub fn list(search: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let rows = customers::list_customers(&session.conn, search.as_deref())?;
    if rows.is_empty() {
        println!("No customers found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Phone", "Email"]);
    for c in &rows {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.phone.as_deref().unwrap_or("")),
            Cell::new(c.email.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn show(id: i64) -> Result<()> {
    let session = Session::open()?;
    let c = customers::get_customer(&session.conn, id)?;
    println!("Customer {}", c.id);
    println!("  Name:    {}", c.name);
    for (label, value) in [
        ("Phone", &c.phone),
        ("Email", &c.email),
        ("Address", &c.address),
        ("Notes", &c.notes),
    ] {
        if let Some(v) = value {
            println!("  {:<8} {v}", format!("{label}:"));
        }
    }
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let session = Session::open()?;
    let removed = with_retry(session.retry(), || customers::delete_customer(&session.conn, id))?;
    println!("Deleted customer {id}: {}", removed.name);
    Ok(())
}
