use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{amount_cells, currency_headers, Session};
use crate::currency::Amounts;
use crate::db::with_retry;
use crate::error::Result;
use crate::ledger::{self, BalanceFix};
use crate::reports::{fetch_transactions, Filter};

const RECENT_ROWS: usize = 10;

pub fn list() -> Result<()> {
    let session = Session::open()?;
    let profiles = ledger::list_profiles(&session.conn)?;

    let mut header = vec!["Profile"];
    header.extend(currency_headers());
    let mut table = Table::new();
    table.set_header(header);
    let mut total = Amounts::default();
    for p in &profiles {
        total += p.balance;
        let mut cells = vec![Cell::new(&p.name)];
        cells.extend(amount_cells(&p.balance));
        table.add_row(cells);
    }
    let mut cells = vec![Cell::new("Total".bold())];
    cells.extend(amount_cells(&total));
    table.add_row(cells);

    println!("Profiles\n{table}");
    Ok(())
}

pub fn show(name: &str) -> Result<()> {
    let session = Session::open()?;
    let profile = ledger::get_profile(&session.conn, name)?;
    let rows = fetch_transactions(
        &session.conn,
        &Filter {
            profile: Some(profile.name.clone()),
            date: None,
        },
    )?;

    let mut header = vec!["", ""];
    header.extend(currency_headers());
    let mut table = Table::new();
    table.set_header(header);
    for t in &rows[rows.len().saturating_sub(RECENT_ROWS)..] {
        let mut cells = vec![Cell::new(&t.date), Cell::new(t.notes.as_deref().unwrap_or(&t.source))];
        cells.extend(amount_cells(&t.amounts));
        table.add_row(cells);
    }
    let mut cells = vec![Cell::new("Balance".bold()), Cell::new("")];
    cells.extend(amount_cells(&profile.balance));
    table.add_row(cells);

    println!("{} ({} transactions)\n{table}", profile.name, rows.len());
    Ok(())
}

fn drift_table(fixes: &[BalanceFix]) -> Table {
    let mut table = Table::new();
    let mut header = vec!["Profile", ""];
    header.extend(currency_headers());
    table.set_header(header);
    for fix in fixes {
        let mut stored = vec![Cell::new(&fix.name), Cell::new("stored")];
        stored.extend(amount_cells(&fix.stored));
        table.add_row(stored);
        let mut computed = vec![Cell::new(""), Cell::new("from transactions")];
        computed.extend(amount_cells(&fix.computed));
        table.add_row(computed);
    }
    table
}

pub fn verify() -> Result<()> {
    let session = Session::open()?;
    let fixes = ledger::verify_balances(&session.conn)?;
    if fixes.is_empty() {
        println!("{}", "All profile balances match their transactions.".green());
    } else {
        println!(
            "{} profile(s) drifted. Run `kasa profiles recompute` to fix.\n{}",
            fixes.len().to_string().red().bold(),
            drift_table(&fixes)
        );
    }
    Ok(())
}

pub fn recompute() -> Result<()> {
    let session = Session::open()?;
    let fixes = with_retry(session.retry(), || ledger::recompute_balances(&session.conn))?;
    if fixes.is_empty() {
        println!("Balances were already correct.");
    } else {
        println!("Corrected {} profile(s)\n{}", fixes.len(), drift_table(&fixes));
    }
    Ok(())
}
