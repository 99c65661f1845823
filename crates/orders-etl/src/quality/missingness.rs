//! Missing-value analysis.

use crate::error::Result;
use crate::types::ColumnMissingness;
use crate::utils::get_series;
use polars::prelude::*;

/// Missing count and fraction for every column, most-missing first.
///
/// Ties keep the table's column order. An empty table reports a fraction of 0.
pub fn missingness_summary(df: &DataFrame) -> Vec<ColumnMissingness> {
    let height = df.height();
    let mut rows: Vec<ColumnMissingness> = df
        .get_columns()
        .iter()
        .map(|col| {
            let n_missing = col.null_count();
            let p_missing = if height > 0 {
                n_missing as f64 / height as f64
            } else {
                0.0
            };
            ColumnMissingness {
                column: col.name().to_string(),
                n_missing,
                p_missing,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.p_missing.total_cmp(&a.p_missing));
    rows
}

/// Missingness as a table with columns `column`, `n_missing`, `p_missing`.
pub fn missingness_report(df: &DataFrame) -> Result<DataFrame> {
    let rows = missingness_summary(df);

    let columns: Vec<String> = rows.iter().map(|r| r.column.clone()).collect();
    let n_missing: Vec<u64> = rows.iter().map(|r| r.n_missing as u64).collect();
    let p_missing: Vec<f64> = rows.iter().map(|r| r.p_missing).collect();

    let report = DataFrame::new(vec![
        Series::new("column".into(), columns).into_column(),
        Series::new("n_missing".into(), n_missing).into_column(),
        Series::new("p_missing".into(), p_missing).into_column(),
    ])?;
    Ok(report)
}

/// Add a boolean `<col>__isna` column for each of `cols`. Originals are untouched.
pub fn add_missing_flags(df: &DataFrame, cols: &[&str]) -> Result<DataFrame> {
    let mut out = df.clone();
    for col in cols {
        let series = get_series(df, col)?;
        let flag = series.is_null().into_series().with_name(missing_flag_name(col).into());
        out.with_column(flag)?;
    }
    Ok(out)
}

/// Name of the missing-flag column for `col`.
pub fn missing_flag_name(col: &str) -> String {
    format!("{}__isna", col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df! {
            "order_id" => [Some("A1"), Some("A2"), Some("A3"), Some("A4")],
            "amount" => [Some(1.0), None, None, Some(4.0)],
            "status" => [Some("paid"), None, Some("paid"), Some("paid")],
            "quantity" => [Some(1i64), Some(2), Some(3), None],
        }
        .unwrap()
    }

    // ==== summary tests ====

    #[test]
    fn test_missingness_summary_sorted_desc_stable() {
        let rows = missingness_summary(&sample());

        let names: Vec<&str> = rows.iter().map(|r| r.column.as_str()).collect();
        assert_eq!(names, vec!["amount", "status", "quantity", "order_id"]);
        assert_eq!(rows[0].n_missing, 2);
        assert_eq!(rows[0].p_missing, 0.5);
        assert_eq!(rows[1].p_missing, 0.25);
        assert_eq!(rows[3].n_missing, 0);
    }

    #[test]
    fn test_missingness_summary_empty_table() {
        let df = sample().head(Some(0));
        let rows = missingness_summary(&df);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.n_missing == 0 && r.p_missing == 0.0));
    }

    #[test]
    fn test_missingness_report_frame() {
        let report = missingness_report(&sample()).unwrap();

        assert_eq!(report.height(), 4);
        assert_eq!(
            report
                .get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["column", "n_missing", "p_missing"]
        );
        let first = report.column("column").unwrap().as_materialized_series().clone();
        assert_eq!(first.str().unwrap().get(0), Some("amount"));
    }

    // ==== flag tests ====

    #[test]
    fn test_add_missing_flags() {
        let df = sample();
        let out = add_missing_flags(&df, &["amount", "quantity"]).unwrap();

        assert_eq!(out.width(), df.width() + 2);
        let flags: Vec<Option<bool>> = out
            .column("amount__isna")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(flags, vec![Some(false), Some(true), Some(true), Some(false)]);

        assert!(
            out.column("amount")
                .unwrap()
                .as_materialized_series()
                .equals_missing(df.column("amount").unwrap().as_materialized_series())
        );
    }

    #[test]
    fn test_add_missing_flags_unknown_column() {
        assert!(matches!(
            add_missing_flags(&sample(), &["nope"]),
            Err(EtlError::ColumnNotFound(_))
        ));
    }
}
