//! Keep-latest deduplication.

use crate::error::Result;
use crate::utils::get_series;
use polars::prelude::*;
use tracing::debug;

/// Keep the most recent row for every distinct combination of `key_cols`.
///
/// Rows are ordered by `ts_col` descending with null timestamps last, and the
/// first row of each key wins. The result keeps that order. Null key values
/// compare equal to each other.
pub fn dedupe_keep_latest(df: &DataFrame, key_cols: &[&str], ts_col: &str) -> Result<DataFrame> {
    let ts = get_series(df, ts_col)?;
    let order = ts.arg_sort(
        SortOptions::default()
            .with_order_descending(true)
            .with_nulls_last(true)
            .with_maintain_order(true),
    );
    let sorted = df.take(&order)?;

    let subset: Vec<String> = key_cols.iter().map(|c| c.to_string()).collect();
    let deduped = sorted.unique_stable(Some(&subset), UniqueKeepStrategy::First, None)?;

    debug!(
        "Deduplicated on {:?}: {} -> {} rows",
        key_cols,
        df.height(),
        deduped.height()
    );
    Ok(deduped)
}
