//! Per-column type coercion with outcome counting.

use crate::error::Result;
use crate::types::{CoercionCounts, ParsedValue};
use crate::utils::{parse_f64, parse_i64};
use polars::prelude::*;

/// Coerce a column to nullable `Float64`.
///
/// Text is parsed value by value; numeric input is cast. Non-finite values
/// become null and are counted as invalid.
pub(crate) fn to_float(series: &Series) -> Result<(Series, CoercionCounts)> {
    let mut counts = CoercionCounts::default();
    let mut values: Vec<Option<f64>> = Vec::with_capacity(series.len());

    if series.dtype() == &DataType::String {
        for opt_val in series.str()?.into_iter() {
            let parsed = parse_f64(opt_val);
            counts.record(&parsed);
            values.push(parsed.into_option());
        }
    } else {
        let cast = series.cast(&DataType::Float64)?;
        for opt_val in cast.f64()?.into_iter() {
            let parsed = match opt_val {
                Some(v) if v.is_finite() => ParsedValue::Present(v),
                Some(_) => ParsedValue::Invalid,
                None => ParsedValue::Absent,
            };
            counts.record(&parsed);
            values.push(parsed.into_option());
        }
    }

    Ok((Series::new(series.name().clone(), values), counts))
}

/// Coerce a column to nullable `Int64`.
///
/// Integral floats are accepted; fractional and non-finite values become null
/// and are counted as invalid.
pub(crate) fn to_int(series: &Series) -> Result<(Series, CoercionCounts)> {
    let mut counts = CoercionCounts::default();
    let mut values: Vec<Option<i64>> = Vec::with_capacity(series.len());

    match series.dtype() {
        DataType::String => {
            for opt_val in series.str()?.into_iter() {
                let parsed = parse_i64(opt_val);
                counts.record(&parsed);
                values.push(parsed.into_option());
            }
        }
        dtype if dtype.is_integer() => {
            let cast = series.cast(&DataType::Int64)?;
            for opt_val in cast.i64()?.into_iter() {
                let parsed = match opt_val {
                    Some(v) => ParsedValue::Present(v),
                    None => ParsedValue::Absent,
                };
                counts.record(&parsed);
                values.push(parsed.into_option());
            }
        }
        _ => {
            let cast = series.cast(&DataType::Float64)?;
            for opt_val in cast.f64()?.into_iter() {
                let parsed = match opt_val {
                    Some(v) if v.is_finite() && v.fract() == 0.0 => ParsedValue::Present(v as i64),
                    Some(_) => ParsedValue::Invalid,
                    None => ParsedValue::Absent,
                };
                counts.record(&parsed);
                values.push(parsed.into_option());
            }
        }
    }

    Ok((Series::new(series.name().clone(), values), counts))
}

/// Force a column to `String`, keeping nulls.
pub(crate) fn to_text(series: &Series) -> Result<(Series, CoercionCounts)> {
    let cast = series.cast(&DataType::String)?;
    let nulls = cast.null_count();
    let counts = CoercionCounts {
        present: cast.len() - nulls,
        absent: nulls,
        invalid: 0,
    };
    Ok((cast, counts))
}
