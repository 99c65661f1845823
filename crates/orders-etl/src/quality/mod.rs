//! Data quality module.
//!
//! Fatal validation checks and missing-value analysis.

mod checks;
mod missingness;

pub use checks::{
    assert_column_in_range, assert_in_range, assert_non_empty, assert_unique_key, require_columns,
};
pub use missingness::{
    add_missing_flags, missing_flag_name, missingness_report, missingness_summary,
};
