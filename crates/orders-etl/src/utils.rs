//! Shared utilities for the ETL pipeline.

use crate::error::{EtlError, Result};
use crate::types::ParsedValue;
use polars::prelude::*;

// =============================================================================
// Missing-value tokens
// =============================================================================

/// Raw cell contents that are read as missing. Matching is exact.
pub const MISSING_TOKENS: [&str; 5] = ["", "NA", "N/A", "null", "None"];

/// Check if a raw cell is one of the missing-value tokens.
#[inline]
pub fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s)
}

// =============================================================================
// Numeric parsing
// =============================================================================

/// Parse a raw cell as a finite float.
///
/// Surrounding whitespace is ignored. `inf` and `NaN` are invalid.
pub fn parse_f64(raw: Option<&str>) -> ParsedValue<f64> {
    let Some(raw) = raw else {
        return ParsedValue::Absent;
    };
    if is_missing_token(raw) {
        return ParsedValue::Absent;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedValue::Absent;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedValue::Present(v),
        _ => ParsedValue::Invalid,
    }
}

/// Parse a raw cell as an integer.
///
/// Integral floats such as `"2.0"` are accepted; fractional values are invalid.
pub fn parse_i64(raw: Option<&str>) -> ParsedValue<i64> {
    let Some(raw) = raw else {
        return ParsedValue::Absent;
    };
    if is_missing_token(raw) {
        return ParsedValue::Absent;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedValue::Absent;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return ParsedValue::Present(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            ParsedValue::Present(v as i64)
        }
        _ => ParsedValue::Invalid,
    }
}

// =============================================================================
// Column helpers
// =============================================================================

/// Fetch a column as a materialized series, or fail with `ColumnNotFound`.
pub fn get_series(df: &DataFrame, name: &str) -> Result<Series> {
    df.column(name)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| EtlError::ColumnNotFound(name.to_string()))
}

/// Check if a DataFrame has a column with this name.
#[inline]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Non-null values of a numeric series as `f64`.
pub fn finite_values(series: &Series) -> Result<Vec<f64>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

/// Text keys of a column, `None` for null.
pub fn key_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = get_series(df, name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
