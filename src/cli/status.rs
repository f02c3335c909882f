use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!(
        "Tags:       M \u{2192} {}, Y \u{2192} {}",
        settings.tag_m_currency, settings.tag_y_currency
    );

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
        };

        println!();
        println!("Profiles:      {}", count("profiles")?);
        println!("Transactions:  {}", count("transactions")?);
        println!("Outcomes:      {}", count("outcomes")?);
        println!("Transfers:     {}", count("transfers")?);
        println!("Customers:     {}", count("customers")?);
        println!("Imports:       {}", count("imports")?);
    } else {
        println!();
        println!("Database not found. Run `kasa init` to set up.");
    }

    Ok(())
}
