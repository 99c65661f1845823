//! Fatal validation checks.
//!
//! Every check returns `Ok(())` or a validation error that aborts the run.

use crate::error::{EtlError, Result};
use crate::utils::{get_series, has_column};
use polars::prelude::*;
use tracing::debug;

/// Maximum number of offending keys quoted in a duplicate-key error.
const MAX_EXAMPLES: usize = 5;

/// Fail if any of `columns` is absent from `df`. All missing names are reported.
pub fn require_columns(df: &DataFrame, columns: &[&str], table: &str) -> Result<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| !has_column(df, c))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        debug!("Table '{}' has all {} required columns", table, columns.len());
        Ok(())
    } else {
        Err(EtlError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// Fail if `df` has no rows.
pub fn assert_non_empty(df: &DataFrame, table: &str) -> Result<()> {
    if df.height() == 0 {
        return Err(EtlError::EmptyTable(table.to_string()));
    }
    Ok(())
}

/// Fail if any non-null value of `key` occurs more than once.
///
/// Null keys are ignored since they never match in a join.
pub fn assert_unique_key(df: &DataFrame, key: &str, table: &str) -> Result<()> {
    if !has_column(df, key) {
        return Err(EtlError::MissingColumns {
            table: table.to_string(),
            columns: vec![key.to_string()],
        });
    }

    let keys = get_series(df, key)?.cast(&DataType::String)?.drop_nulls();
    let mask = DataFrame::new(vec![keys.clone().into_column()])?.is_duplicated()?;
    let duplicated = keys.filter(&mask)?.unique_stable()?;

    if duplicated.is_empty() {
        return Ok(());
    }

    debug!("{} duplicated values in {}.{}", duplicated.len(), table, key);
    Err(EtlError::DuplicateKey {
        table: table.to_string(),
        column: key.to_string(),
        duplicates: duplicated.len(),
        examples: duplicated
            .str()?
            .into_iter()
            .flatten()
            .take(MAX_EXAMPLES)
            .map(str::to_string)
            .collect(),
    })
}

/// Fail if any non-null value of `series` falls outside `[lo, hi]`.
///
/// Either bound may be open. Nulls are ignored.
pub fn assert_in_range(series: &Series, lo: Option<f64>, hi: Option<f64>) -> Result<()> {
    let cast = series.cast(&DataType::Float64)?;
    let violations = cast
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| lo.is_some_and(|lo| *v < lo) || hi.is_some_and(|hi| *v > hi))
        .count();

    if violations == 0 {
        return Ok(());
    }

    let bound = match (lo, hi) {
        (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
        (Some(lo), None) => format!("[{}, inf)", lo),
        (None, Some(hi)) => format!("(-inf, {}]", hi),
        (None, None) => "(-inf, inf)".to_string(),
    };

    Err(EtlError::ValueOutOfRange {
        column: series.name().to_string(),
        violations,
        bound,
    })
}

/// Apply [`assert_in_range`] to a named column of `df`.
pub fn assert_column_in_range(
    df: &DataFrame,
    column: &str,
    lo: Option<f64>,
    hi: Option<f64>,
) -> Result<()> {
    assert_in_range(&get_series(df, column)?, lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==== require_columns tests ====

    #[test]
    fn test_require_columns_ok() {
        let df = df! { "a" => [1], "b" => [2] }.unwrap();
        assert!(require_columns(&df, &["a", "b"], "t").is_ok());
    }

    #[test]
    fn test_require_columns_lists_all_missing() {
        let df = df! { "a" => [1] }.unwrap();
        let err = require_columns(&df, &["a", "b", "c"], "orders").unwrap_err();
        match err {
            EtlError::MissingColumns { table, columns } => {
                assert_eq!(table, "orders");
                assert_eq!(columns, vec!["b".to_string(), "c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ==== assert_non_empty tests ====

    #[test]
    fn test_assert_non_empty() {
        let df = df! { "a" => [1] }.unwrap();
        assert!(assert_non_empty(&df, "t").is_ok());

        let empty = df.head(Some(0));
        assert!(matches!(
            assert_non_empty(&empty, "users"),
            Err(EtlError::EmptyTable(t)) if t == "users"
        ));
    }

    // ==== assert_unique_key tests ====

    #[test]
    fn test_assert_unique_key_ok_with_nulls() {
        let df = df! { "user_id" => [Some("u1"), None, Some("u2"), None] }.unwrap();
        assert!(assert_unique_key(&df, "user_id", "users").is_ok());
    }

    #[test]
    fn test_assert_unique_key_duplicates() {
        let df = df! { "user_id" => ["u1", "u2", "u1", "u3", "u2", "u1"] }.unwrap();
        let err = assert_unique_key(&df, "user_id", "users").unwrap_err();
        match err {
            EtlError::DuplicateKey {
                duplicates,
                examples,
                ..
            } => {
                assert_eq!(duplicates, 2);
                assert_eq!(examples, vec!["u1".to_string(), "u2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_assert_unique_key_missing_column() {
        let df = df! { "a" => [1] }.unwrap();
        assert!(matches!(
            assert_unique_key(&df, "user_id", "users"),
            Err(EtlError::MissingColumns { .. })
        ));
    }

    // ==== assert_in_range tests ====

    #[test]
    fn test_assert_in_range_ignores_nulls() {
        let s = Series::new("amount".into(), &[Some(0.0), None, Some(5.0)]);
        assert!(assert_in_range(&s, Some(0.0), None).is_ok());
    }

    #[test]
    fn test_assert_in_range_counts_violations() {
        let s = Series::new("amount".into(), &[-1.0, 2.0, -3.0, 11.0]);
        let err = assert_in_range(&s, Some(0.0), Some(10.0)).unwrap_err();
        match err {
            EtlError::ValueOutOfRange {
                column,
                violations,
                bound,
            } => {
                assert_eq!(column, "amount");
                assert_eq!(violations, 3);
                assert_eq!(bound, "[0, 10]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_assert_column_in_range_integers() {
        let df = df! { "quantity" => [Some(1i64), Some(-2), None] }.unwrap();
        assert!(matches!(
            assert_column_in_range(&df, "quantity", Some(0.0), None),
            Err(EtlError::ValueOutOfRange { violations: 1, .. })
        ));
    }
}
