//! Run metadata document.

use crate::config::EtlConfig;
use crate::error::Result;
use crate::types::{RowCounts, RunMetadata};
use crate::utils::{get_series, has_column};
use chrono::Utc;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collect counts, quality metrics and configuration for one run.
///
/// `missing_created_at` counts null timestamps in the analytics table and
/// `country_match_rate` is the fraction of analytics rows with a country.
pub fn build_run_metadata(
    analytics: &DataFrame,
    orders_raw_rows: usize,
    users_rows: usize,
    config: &EtlConfig,
    outputs: BTreeMap<String, PathBuf>,
) -> Result<RunMetadata> {
    let missing_created_at = get_series(analytics, "created_at")?.null_count();

    let country_match_rate = if has_column(analytics, "country") && analytics.height() > 0 {
        let missing = get_series(analytics, "country")?.null_count();
        1.0 - missing as f64 / analytics.height() as f64
    } else {
        0.0
    };

    Ok(RunMetadata {
        timestamp_utc: Utc::now().to_rfc3339(),
        rows: RowCounts {
            orders_raw: orders_raw_rows,
            users: users_rows,
            analytics: analytics.height(),
        },
        rows_out: analytics.height(),
        missing_created_at,
        country_match_rate,
        outputs,
        config: config.as_text_map(),
    })
}

/// Write the metadata as pretty-printed JSON, creating parent directories.
pub fn write_run_metadata(meta: &RunMetadata, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(path, json)?;
    debug!("Wrote run metadata to {}", path.display());
    Ok(())
}
