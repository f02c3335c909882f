use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{KasaError, Result};
use crate::models::Customer;

/// Whether an upsert created a customer or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Insert or fully replace a customer. Absent contact fields are cleared.
pub fn upsert_customer(conn: &Connection, customer: &Customer) -> Result<Upsert> {
    write_customer(
        conn,
        customer,
        "phone = excluded.phone, email = excluded.email, \
         address = excluded.address, notes = excluded.notes",
    )
}

/// Insert or update a customer, keeping stored contact fields that `customer` leaves empty.
pub fn merge_customer(conn: &Connection, customer: &Customer) -> Result<Upsert> {
    write_customer(
        conn,
        customer,
        "phone = COALESCE(excluded.phone, phone), email = COALESCE(excluded.email, email), \
         address = COALESCE(excluded.address, address), notes = COALESCE(excluded.notes, notes)",
    )
}

fn write_customer(conn: &Connection, customer: &Customer, contact_update: &str) -> Result<Upsert> {
    if customer.name.trim().is_empty() {
        return Err(KasaError::Other(format!("Customer {} needs a name", customer.id)));
    }
    let existed: bool = conn
        .prepare_cached("SELECT 1 FROM customers WHERE id = ?1")?
        .exists([customer.id])?;
    conn.execute(
        &format!(
            "INSERT INTO customers (id, name, phone, email, address, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, {contact_update}, updated_at = datetime('now')"
        ),
        rusqlite::params![
            customer.id,
            customer.name.trim(),
            customer.phone,
            customer.email,
            customer.address,
            customer.notes,
        ],
    )?;
    Ok(if existed { Upsert::Updated } else { Upsert::Created })
}

fn row_to_customer(row: &Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        address: row.get(4)?,
        notes: row.get(5)?,
    })
}

pub fn get_customer(conn: &Connection, id: i64) -> Result<Customer> {
    conn.query_row(
        "SELECT id, name, phone, email, address, notes FROM customers WHERE id = ?1",
        [id],
        row_to_customer,
    )
    .optional()?
    .ok_or(KasaError::UnknownCustomer(id))
}

/// All customers, or those whose name, phone or email contains `search` (case-insensitive).
pub fn list_customers(conn: &Connection, search: Option<&str>) -> Result<Vec<Customer>> {
    let pattern = search.map(|s| format!("%{}%", s.trim()));
    let mut stmt = conn.prepare(
        "SELECT id, name, phone, email, address, notes FROM customers \
         WHERE ?1 IS NULL OR name LIKE ?1 OR phone LIKE ?1 OR email LIKE ?1 \
         ORDER BY id",
    )?;
    let rows = stmt.query_map([pattern], row_to_customer)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn delete_customer(conn: &Connection, id: i64) -> Result<Customer> {
    let customer = get_customer(conn, id)?;
    conn.execute("DELETE FROM customers WHERE id = ?1", [id])?;
    Ok(customer)
}
