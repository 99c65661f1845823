//! Quantiles, IQR fences and winsorizing.

use crate::error::{EtlError, Result};
use crate::utils::{finite_values, get_series};
use polars::prelude::*;
use tracing::debug;

/// Quantile of sorted values by linear interpolation between closest ranks.
///
/// # Errors
///
/// `InvalidArgument` if `q` is outside `[0, 1]`, `NoValidValues` if `sorted`
/// is empty.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(EtlError::InvalidArgument(format!(
            "quantile {} is outside [0, 1]",
            q
        )));
    }
    if sorted.is_empty() {
        return Err(EtlError::NoValidValues("quantile input".to_string()));
    }
    let pos = q * (sorted.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Ok(sorted[lower]);
    }
    let weight = pos - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Non-null values of `series`, sorted ascending.
fn sorted_values(series: &Series) -> Result<Vec<f64>> {
    let mut values = finite_values(series)?;
    if values.is_empty() {
        return Err(EtlError::NoValidValues(series.name().to_string()));
    }
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Tukey fence `[Q1 - k*IQR, Q3 + k*IQR]` for a numeric series.
pub fn iqr_bounds(series: &Series, k: f64) -> Result<(f64, f64)> {
    if !k.is_finite() || k < 0.0 {
        return Err(EtlError::InvalidArgument(format!(
            "fence multiplier {} must be finite and >= 0",
            k
        )));
    }
    let sorted = sorted_values(series)?;
    let q1 = quantile_linear(&sorted, 0.25)?;
    let q3 = quantile_linear(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Ok((q1 - k * iqr, q3 + k * iqr))
}

/// Clip values to the `lo` and `hi` quantiles. Nulls stay null.
pub fn winsorize(series: &Series, lo: f64, hi: f64) -> Result<Series> {
    if lo > hi {
        return Err(EtlError::InvalidArgument(format!(
            "winsor quantiles are inverted: {} > {}",
            lo, hi
        )));
    }
    let sorted = sorted_values(series)?;
    let lower = quantile_linear(&sorted, lo)?;
    let upper = quantile_linear(&sorted, hi)?;

    let float_series = series.cast(&DataType::Float64)?;
    let clipped = float_series
        .f64()?
        .apply(|v| v.map(|val| val.clamp(lower, upper)));

    debug!(
        "Winsorized '{}' to [{:.4}, {:.4}]",
        series.name(),
        lower,
        upper
    );
    Ok(clipped.into_series())
}

/// Add `<col>__is_outlier`: true where the value lies strictly outside the IQR fence.
///
/// Null values are never outliers.
pub fn add_outlier_flag(df: &DataFrame, col: &str, k: f64) -> Result<DataFrame> {
    let series = get_series(df, col)?;
    let (low, high) = iqr_bounds(&series, k)?;

    let float_series = series.cast(&DataType::Float64)?;
    let flags: Vec<bool> = float_series
        .f64()?
        .into_iter()
        .map(|v| v.is_some_and(|val| val < low || val > high))
        .collect();
    let outliers = flags.iter().filter(|&&f| f).count();

    let mut out = df.clone();
    out.with_column(Series::new(outlier_flag_name(col).into(), flags))?;

    debug!(
        "Flagged {} outliers in '{}' outside [{:.4}, {:.4}]",
        outliers, col, low, high
    );
    Ok(out)
}

/// Name of the outlier-flag column for `col`.
pub fn outlier_flag_name(col: &str) -> String {
    format!("{}__is_outlier", col)
}
