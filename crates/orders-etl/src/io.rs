//! File I/O for raw inputs and processed artifacts.
//!
//! Raw CSVs are read with every column as text so coercion happens in one
//! place ([`crate::cleaner::enforce_schema`]). Only the tokens in
//! [`MISSING_TOKENS`] are read as null.

use crate::error::{EtlError, Result, ResultExt};
use crate::utils::MISSING_TOKENS;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Read a CSV with a header row, all columns as `String`.
pub fn read_text_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let null_values = NullValues::AllColumns(
        MISSING_TOKENS
            .iter()
            .map(|t| PlSmallStr::from(*t))
            .collect(),
    );

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening CSV {}", path.display()))?
        .finish()
        .context(format!("Parsing CSV {}", path.display()))?;

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Read the raw orders table.
pub fn read_orders_csv(path: &Path) -> Result<DataFrame> {
    read_text_csv(path).context("Reading orders")
}

/// Read the raw users table.
pub fn read_users_csv(path: &Path) -> Result<DataFrame> {
    read_text_csv(path).context("Reading users")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `df` as Parquet, creating parent directories. Overwrites.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    let mut df = df.clone();
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context(format!("Writing {}", path.display()))?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Read a Parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    ParquetReader::new(file)
        .finish()
        .context(format!("Reading {}", path.display()))
}

/// Write `df` as CSV with a header row, creating parent directories. Overwrites.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .context(format!("Writing {}", path.display()))?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
