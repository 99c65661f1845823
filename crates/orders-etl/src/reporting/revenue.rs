//! Revenue summary per country.

use crate::error::Result;
use crate::utils::get_series;
use polars::prelude::*;

/// Order count and total `amount` per `country`, highest revenue first.
///
/// Rows with a missing country form their own group. Missing amounts count
/// as orders but add nothing to revenue. Ties keep first-appearance order.
pub fn revenue_by_country(df: &DataFrame) -> Result<DataFrame> {
    let country = get_series(df, "country")?.cast(&DataType::String)?;
    let amount = get_series(df, "amount")?.cast(&DataType::Float64)?;

    let summary = DataFrame::new(vec![country.into_column(), amount.into_column()])?
        .lazy()
        .group_by_stable([col("country")])
        .agg([
            len().cast(DataType::UInt64).alias("n_orders"),
            col("amount").sum().fill_null(lit(0.0)).alias("total_revenue"),
        ])
        .sort(
            ["total_revenue"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;
    Ok(summary)
}
