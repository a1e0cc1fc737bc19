//! Delimited author file decoding.
//!
//! The whole file is decoded up front so that any I/O or decode failure is
//! reported before a single worker is spawned.

use crate::error::ImportError;
use csv_async::{AsyncReaderBuilder, StringRecord};
use std::path::Path;
use tokio::fs::File;

/// Read every row of `path`, each row being the list of its raw fields.
///
/// No header row is expected. Rows must all have the same number of fields
/// as the first one; blank lines are skipped.
pub async fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, ImportError> {
    let file = File::open(path).await.map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = AsyncReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .create_reader(file);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();

    loop {
        let more = reader
            .read_record(&mut record)
            .await
            .map_err(|source| ImportError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        if !more {
            break;
        }
        rows.push(record.iter().map(str::to_owned).collect());
    }

    log::debug!("decoded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
