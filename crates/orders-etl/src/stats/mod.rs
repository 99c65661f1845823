//! Numeric summaries: quantiles, outlier fences and bootstrap intervals.

mod bootstrap;
mod outliers;

pub use bootstrap::bootstrap_diff_means;
pub use outliers::{
    add_outlier_flag, iqr_bounds, outlier_flag_name, quantile_linear, winsorize,
};
