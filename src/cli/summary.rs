use chrono::Datelike;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{amount_cells, currency_headers, month_arg, Session};
use crate::error::Result;
use crate::reports::{self, Summary};

fn summary_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    let mut header = vec!["Profile"];
    header.extend(currency_headers());
    table.set_header(header);
    for row in &summary.rows {
        let mut cells = vec![Cell::new(&row.name)];
        cells.extend(amount_cells(&row.amounts));
        table.add_row(cells);
    }
    let mut total = vec![Cell::new("Total".bold())];
    total.extend(amount_cells(&summary.total));
    table.add_row(total);
    table
}

fn heading(kind: &str, summary: &Summary, profile: Option<&str>) -> String {
    format!("{kind} Summary {} ({})", summary.period, profile.unwrap_or("All Profiles"))
}

pub fn month(month: Option<String>, profile: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let now = chrono::Local::now();
    let (year, m) = month_arg(&month)?.unwrap_or((now.year(), now.month()));
    let summary = reports::monthly_summary(&session.conn, year, m, profile.as_deref())?;
    println!("{}", heading("Monthly", &summary, profile.as_deref()));
    println!("{}", summary_table(&summary));
    Ok(())
}

pub fn year(year: Option<i32>, profile: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let year = year.unwrap_or_else(|| chrono::Local::now().year());
    let summary = reports::yearly_summary(&session.conn, year, profile.as_deref())?;
    println!("{}", heading("Yearly", &summary, profile.as_deref()));
    println!("{}", summary_table(&summary));
    Ok(())
}

pub fn vehicles(month: Option<String>, year: Option<i32>) -> Result<()> {
    let session = Session::open()?;
    let (year, mm) = match month_arg(&month)? {
        Some((y, m)) => (y, Some(m)),
        None => (year.unwrap_or_else(|| chrono::Local::now().year()), None),
    };
    let rows = reports::vehicle_summary(&session.conn, year, mm)?;

    let mut table = Table::new();
    let mut header = vec!["Vehicle", "Outcomes"];
    header.extend(currency_headers());
    table.set_header(header);
    for row in &rows {
        let mut cells = vec![Cell::new(&row.vehicle), Cell::new(row.outcomes)];
        cells.extend(amount_cells(&row.amounts));
        table.add_row(cells);
    }
    let period = match mm {
        Some(m) => format!("{year:04}-{m:02}"),
        None => format!("{year:04}"),
    };
    println!("Vehicle Costs {period}\n{table}");
    Ok(())
}
