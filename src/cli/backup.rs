use std::path::PathBuf;
use std::time::Duration;

use rusqlite::backup::{Backup, Progress};
use rusqlite::Connection;

use crate::cli::Session;
use crate::error::{KasaError, Result};
use crate::fmt::format_bytes;

fn log_progress(p: Progress) {
    tracing::debug!(remaining = p.remaining, pages = p.pagecount, "Backup step");
}

/// Copy the live database page by page, then reopen the copy to make sure it reads back.
pub fn run(output: Option<String>) -> Result<()> {
    let session = Session::open()?;

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let dir = PathBuf::from(&session.settings.data_dir).join("backups");
            std::fs::create_dir_all(&dir)?;
            dir.join(format!("kasa-{}.db", chrono::Local::now().format("%Y%m%d-%H%M%S")))
        }
    };
    if dest_path.exists() {
        return Err(KasaError::Other(format!("{} already exists", dest_path.display())));
    }

    {
        let mut dest = Connection::open(&dest_path)?;
        let backup = Backup::new(&session.conn, &mut dest)?;
        backup.run_to_completion(100, Duration::from_millis(10), Some(log_progress))?;
    }

    let copy = Connection::open(&dest_path)?;
    let rows: i64 = copy.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let size = std::fs::metadata(&dest_path)?.len();

    tracing::info!(path = %dest_path.display(), rows, "Backup written");
    println!("Backup saved to {} ({}, {rows} transactions)", dest_path.display(), format_bytes(size));
    Ok(())
}
