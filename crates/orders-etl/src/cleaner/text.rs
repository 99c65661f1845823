//! Text normalization and value remapping.

use crate::error::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));

/// Normalize a single value: case-fold, collapse whitespace runs, trim.
pub fn normalize_value(value: &str) -> String {
    let folded = caseless::default_case_fold_str(value);
    WHITESPACE_RUN.replace_all(&folded, " ").trim().to_string()
}

/// Normalize every value of a text column.
///
/// Non-text input is cast to `String` first. Nulls stay null. Applying the
/// function twice gives the same result as applying it once.
pub fn normalize_text(series: &Series) -> Result<Series> {
    let cast = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = cast
        .str()?
        .into_iter()
        .map(|v| v.map(normalize_value))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Replace values found in `mapping`; anything else passes through unchanged.
pub fn apply_mapping(series: &Series, mapping: &BTreeMap<String, String>) -> Result<Series> {
    let cast = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = cast
        .str()?
        .into_iter()
        .map(|v| {
            v.map(|s| {
                mapping
                    .get(s)
                    .cloned()
                    .unwrap_or_else(|| s.to_string())
            })
        })
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Canonical labels for normalized order status values.
pub fn default_status_mapping() -> BTreeMap<String, String> {
    [
        ("paid", "paid"),
        ("pending", "pending"),
        ("canceled", "canceled"),
        ("cancelled", "canceled"),
        ("refund", "refund"),
        ("refunded", "refund"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(series: &Series) -> Vec<Option<String>> {
        series
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    // ==== normalize tests ====

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  Paid "), "paid");
        assert_eq!(normalize_value("REFUND\t\n  NOW"), "refund now");
        assert_eq!(normalize_value("Straße"), "strasse");
        assert_eq!(normalize_value("   "), "");
    }

    #[test]
    fn test_normalize_text_keeps_nulls() {
        let s = Series::new("status".into(), &[Some(" Paid "), None, Some("PENDING")]);
        let out = normalize_text(&s).unwrap();

        assert_eq!(out.name().as_str(), "status");
        assert_eq!(
            values(&out),
            vec![Some("paid".to_string()), None, Some("pending".to_string())]
        );
    }

    #[test]
    fn test_normalize_text_idempotent() {
        let s = Series::new("status".into(), &["  Mixed   CASE  text ", "ÉCOLE", "a\u{00A0}b"]);
        let once = normalize_text(&s).unwrap();
        let twice = normalize_text(&once).unwrap();
        assert_eq!(values(&once), values(&twice));
    }

    // ==== mapping tests ====

    #[test]
    fn test_apply_mapping_passthrough() {
        let s = Series::new(
            "status".into(),
            &[Some("refunded"), Some("cancelled"), Some("shipped"), None],
        );
        let out = apply_mapping(&s, &default_status_mapping()).unwrap();

        assert_eq!(
            values(&out),
            vec![
                Some("refund".to_string()),
                Some("canceled".to_string()),
                Some("shipped".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_apply_mapping_empty_table_is_identity() {
        let s = Series::new("status".into(), &["paid", "other"]);
        let out = apply_mapping(&s, &BTreeMap::new()).unwrap();
        assert_eq!(values(&out), values(&s));
    }

    #[test]
    fn test_default_status_mapping() {
        let mapping = default_status_mapping();
        assert_eq!(mapping.len(), 6);
        assert_eq!(mapping["cancelled"], "canceled");
        assert_eq!(mapping["refunded"], "refund");
        assert_eq!(mapping["paid"], "paid");
    }
}
