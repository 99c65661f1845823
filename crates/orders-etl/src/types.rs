//! Shared data types for the ETL pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcome of coercing a single raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedValue<T> {
    /// The value parsed successfully.
    Present(T),
    /// The input was null or one of the missing-value tokens.
    Absent,
    /// The input was present but could not be parsed.
    Invalid,
}

impl<T> ParsedValue<T> {
    /// The parsed value, treating absent and invalid alike as missing.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent | Self::Invalid => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ParsedValue<U> {
        match self {
            Self::Present(v) => ParsedValue::Present(f(v)),
            Self::Absent => ParsedValue::Absent,
            Self::Invalid => ParsedValue::Invalid,
        }
    }
}

/// Per-column tally of coercion outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionCounts {
    pub present: usize,
    pub absent: usize,
    pub invalid: usize,
}

impl CoercionCounts {
    /// Record one outcome.
    pub fn record<T>(&mut self, value: &ParsedValue<T>) {
        match value {
            ParsedValue::Present(_) => self.present += 1,
            ParsedValue::Absent => self.absent += 1,
            ParsedValue::Invalid => self.invalid += 1,
        }
    }

    /// Values that end up null after coercion.
    pub fn missing(&self) -> usize {
        self.absent + self.invalid
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.invalid
    }
}

/// Coercion outcomes for every column touched by schema enforcement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: BTreeMap<String, CoercionCounts>,
}

impl SchemaReport {
    pub fn get(&self, column: &str) -> Option<&CoercionCounts> {
        self.columns.get(column)
    }

    /// Total number of present-but-unparseable values across all columns.
    pub fn total_invalid(&self) -> usize {
        self.columns.values().map(|c| c.invalid).sum()
    }
}

/// One row of the missingness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissingness {
    pub column: String,
    pub n_missing: usize,
    pub p_missing: f64,
}

/// Row counts recorded in the run metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub orders_raw: usize,
    pub users: usize,
    pub analytics: usize,
}

/// Per-run metadata document written next to the processed tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339 timestamp of the run, in UTC.
    pub timestamp_utc: String,
    pub rows: RowCounts,
    pub rows_out: usize,
    pub missing_created_at: usize,
    /// Fraction of analytics rows with a non-null country.
    pub country_match_rate: f64,
    pub outputs: BTreeMap<String, PathBuf>,
    pub config: BTreeMap<String, String>,
}

/// Summary of a completed run, for logging and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub schema: SchemaReport,
    pub outliers: usize,
    pub duration_ms: u64,
}

/// Bootstrap estimate of a difference of means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapEstimate {
    pub diff_mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_value_into_option() {
        assert_eq!(ParsedValue::Present(3).into_option(), Some(3));
        assert_eq!(ParsedValue::<i32>::Absent.into_option(), None);
        assert_eq!(ParsedValue::<i32>::Invalid.into_option(), None);
    }

    #[test]
    fn test_parsed_value_map() {
        assert_eq!(ParsedValue::Present(2).map(|v| v * 10), ParsedValue::Present(20));
        assert_eq!(ParsedValue::<i32>::Invalid.map(|v| v * 10), ParsedValue::Invalid);
    }

    #[test]
    fn test_coercion_counts_record() {
        let mut counts = CoercionCounts::default();
        counts.record(&ParsedValue::Present(1.0));
        counts.record(&ParsedValue::<f64>::Absent);
        counts.record(&ParsedValue::<f64>::Invalid);
        counts.record(&ParsedValue::<f64>::Invalid);

        assert_eq!(counts.present, 1);
        assert_eq!(counts.absent, 1);
        assert_eq!(counts.invalid, 2);
        assert_eq!(counts.missing(), 3);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_schema_report_total_invalid() {
        let mut report = SchemaReport::default();
        report.columns.insert(
            "amount".to_string(),
            CoercionCounts {
                present: 3,
                absent: 0,
                invalid: 1,
            },
        );
        report.columns.insert(
            "quantity".to_string(),
            CoercionCounts {
                present: 2,
                absent: 1,
                invalid: 2,
            },
        );
        assert_eq!(report.total_invalid(), 3);
        assert_eq!(report.get("amount").map(|c| c.present), Some(3));
    }
}
