//! Timestamp parsing and calendar parts.
//!
//! Timestamps are stored as `Datetime(ms)` columns. With `utc = true` every
//! offset-aware input is converted to UTC and the column carries the UTC
//! timezone; with `utc = false` the column is naive and keeps the local
//! wall-clock time.

use crate::error::{EtlError, Result};
use crate::types::{CoercionCounts, ParsedValue};
use crate::utils::{get_series, is_missing_token};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

/// Formats carrying a UTC offset, tried after RFC 3339.
const OFFSET_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Naive date-time formats.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

const MS_PER_DAY: i64 = 86_400_000;

/// Parse a single raw timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM[:SS[.fff]]` with or without an
/// offset (a trailing `Z` means UTC), and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str, utc: bool) -> ParsedValue<NaiveDateTime> {
    if is_missing_token(raw) {
        return ParsedValue::Absent;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedValue::Absent;
    }

    let resolve = |dt: DateTime<FixedOffset>| {
        if utc { dt.naive_utc() } else { dt.naive_local() }
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return ParsedValue::Present(resolve(dt));
    }

    let offset_form = match trimmed.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{}+00:00", head),
        None => trimmed.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&offset_form, fmt) {
            return ParsedValue::Present(resolve(dt));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return ParsedValue::Present(dt);
        }
    }

    match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map_or(ParsedValue::Invalid, ParsedValue::Present),
        Err(_) => ParsedValue::Invalid,
    }
}

/// Replace `col` with a parsed `Datetime(ms)` column, UTC-aware when `utc`.
///
/// Unparseable values become null; the call only fails if `col` is absent.
pub fn parse_datetime(df: &DataFrame, col: &str, utc: bool) -> Result<(DataFrame, CoercionCounts)> {
    let series = get_series(df, col)?;
    let mut counts = CoercionCounts::default();

    let millis: Vec<Option<i64>> = match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let values = timestamp_millis(&series)?;
            for v in &values {
                counts.record(&v.map_or(ParsedValue::Absent, ParsedValue::Present));
            }
            values
        }
        _ => {
            let text = series.cast(&DataType::String)?;
            text.str()?
                .into_iter()
                .map(|raw| {
                    let parsed = match raw {
                        Some(raw) => parse_timestamp(raw, utc),
                        None => ParsedValue::Absent,
                    };
                    counts.record(&parsed);
                    parsed.map(|dt| dt.and_utc().timestamp_millis()).into_option()
                })
                .collect()
        }
    };

    let parsed = Series::new(series.name().clone(), millis).cast(&datetime_dtype(utc))?;

    let mut out = df.clone();
    out.replace(col, parsed)?;
    Ok((out, counts))
}

/// Storage type of a parsed timestamp column.
fn datetime_dtype(utc: bool) -> DataType {
    let tz = utc.then_some(TimeZone::UTC);
    DataType::Datetime(TimeUnit::Milliseconds, tz)
}

/// Milliseconds since the epoch for a temporal column, `None` for null.
pub fn timestamp_millis(series: &Series) -> Result<Vec<Option<i64>>> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let physical = series.cast(&DataType::Int64)?;
            let scale = |v: i64| match unit {
                TimeUnit::Nanoseconds => v.div_euclid(1_000_000),
                TimeUnit::Microseconds => v.div_euclid(1_000),
                TimeUnit::Milliseconds => v,
            };
            Ok(physical.i64()?.into_iter().map(|v| v.map(scale)).collect())
        }
        DataType::Date => {
            let physical = series.cast(&DataType::Int32)?;
            Ok(physical
                .i32()?
                .into_iter()
                .map(|v| v.map(|days| i64::from(days) * MS_PER_DAY))
                .collect())
        }
        other => Err(EtlError::InvalidArgument(format!(
            "column '{}' has type {} and is not a timestamp",
            series.name(),
            other
        ))),
    }
}

/// Add `date`, `month` (`YYYY-MM`), `year`, `dow` (English day name) and
/// `hour` derived from `ts_col`. Null timestamps give null parts.
pub fn add_time_parts(df: &DataFrame, ts_col: &str) -> Result<DataFrame> {
    let series = get_series(df, ts_col)?;
    let timestamps: Vec<Option<NaiveDateTime>> = timestamp_millis(&series)?
        .into_iter()
        .map(|ms| ms.and_then(DateTime::from_timestamp_millis).map(|dt| dt.naive_utc()))
        .collect();

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| EtlError::InvalidArgument("invalid epoch".to_string()))?;

    let mut dates: Vec<Option<i32>> = Vec::with_capacity(timestamps.len());
    let mut months: Vec<Option<String>> = Vec::with_capacity(timestamps.len());
    let mut years: Vec<Option<i32>> = Vec::with_capacity(timestamps.len());
    let mut dows: Vec<Option<String>> = Vec::with_capacity(timestamps.len());
    let mut hours: Vec<Option<i32>> = Vec::with_capacity(timestamps.len());

    for ts in &timestamps {
        match ts {
            Some(ts) => {
                let days = (ts.date() - epoch).num_days();
                dates.push(i32::try_from(days).ok());
                months.push(Some(ts.format("%Y-%m").to_string()));
                years.push(Some(ts.year()));
                dows.push(Some(ts.format("%A").to_string()));
                hours.push(Some(ts.hour() as i32));
            }
            None => {
                dates.push(None);
                months.push(None);
                years.push(None);
                dows.push(None);
                hours.push(None);
            }
        }
    }

    let mut out = df.clone();
    out.with_column(Series::new("date".into(), dates).cast(&DataType::Date)?)?;
    out.with_column(Series::new("month".into(), months))?;
    out.with_column(Series::new("year".into(), years))?;
    out.with_column(Series::new("dow".into(), dows))?;
    out.with_column(Series::new("hour".into(), hours))?;
    Ok(out)
}
