use std::path::PathBuf;

use crate::db::get_connection;
use crate::error::{KasaError, Result};
use crate::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};

/// Point settings at another data directory after checking it holds a kasa ledger.
pub fn run(path: &str) -> Result<()> {
    let resolved = PathBuf::from(shellexpand_path(path));
    let db_path = resolved.join(DB_FILE);
    if !db_path.is_file() {
        return Err(KasaError::Settings(format!(
            "{} has no {DB_FILE}. Use `kasa init --data-dir {}` for a new ledger.",
            resolved.display(),
            resolved.display()
        )));
    }

    let conn = get_connection(&db_path)?;
    let has_ledger: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'profiles'")?
        .exists([])?;
    if !has_ledger {
        return Err(KasaError::Settings(format!(
            "{} is not a kasa database",
            db_path.display()
        )));
    }
    let profiles: i64 = conn.query_row("SELECT count(*) FROM profiles", [], |r| r.get(0))?;

    let mut settings = load_settings();
    let previous = std::mem::replace(&mut settings.data_dir, resolved.to_string_lossy().to_string());
    save_settings(&settings)?;

    tracing::info!(from = %previous, to = %settings.data_dir, "Data directory switched");
    println!("Now using {} ({profiles} profiles)", resolved.display());
    Ok(())
}
