use std::path::PathBuf;

use crate::cli::Session;
use crate::error::{KasaError, Result};
use crate::importer::{get_by_key, import_file, ImportOptions};

pub fn run(file: &str, kind: &str) -> Result<()> {
    let kind = get_by_key(kind).ok_or_else(|| {
        KasaError::Other(format!(
            "Unknown sheet kind '{kind}' (expected transactions, outcomes, customers or transfers)"
        ))
    })?;
    let session = Session::open()?;
    let options = ImportOptions {
        retry: session.retry(),
        tags: session.settings.tag_mapping(),
    };

    let result = import_file(&session.conn, &PathBuf::from(file), kind, options)?;

    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    println!(
        "{} imported, {} skipped (duplicates), {} rejected",
        result.imported, result.skipped, result.invalid
    );
    if result.invalid > 0 {
        println!("Run with -v to see why rows were rejected.");
    }
    Ok(())
}
