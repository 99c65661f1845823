//! Fixed schema for the orders table.

use super::converters::{to_float, to_int, to_text};
use crate::error::Result;
use crate::types::SchemaReport;
use crate::utils::get_series;
use polars::prelude::*;
use tracing::{debug, warn};

/// Identifier columns forced to text.
pub const TEXT_COLUMNS: [&str; 2] = ["order_id", "user_id"];

/// Coerce the orders columns to their fixed types.
///
/// `order_id` and `user_id` become `String`, `amount` becomes nullable
/// `Float64` and `quantity` nullable `Int64`. Values that cannot be coerced
/// become null; no rows are dropped and bad data never fails the call.
///
/// # Errors
///
/// `ColumnNotFound` if any of the four columns is absent.
pub fn enforce_schema(df: &DataFrame) -> Result<(DataFrame, SchemaReport)> {
    let mut out = df.clone();
    let mut report = SchemaReport::default();

    for name in TEXT_COLUMNS {
        let (series, counts) = to_text(&get_series(df, name)?)?;
        out.replace(name, series)?;
        report.columns.insert(name.to_string(), counts);
    }

    let (amount, amount_counts) = to_float(&get_series(df, "amount")?)?;
    out.replace("amount", amount)?;
    report.columns.insert("amount".to_string(), amount_counts);

    let (quantity, quantity_counts) = to_int(&get_series(df, "quantity")?)?;
    out.replace("quantity", quantity)?;
    report.columns.insert("quantity".to_string(), quantity_counts);

    for (column, counts) in &report.columns {
        if counts.invalid > 0 {
            warn!(
                "Column '{}': {} unparseable values coerced to missing",
                column, counts.invalid
            );
        } else {
            debug!(
                "Column '{}': {} present, {} missing",
                column, counts.present, counts.absent
            );
        }
    }

    Ok((out, report))
}
