//! Orders ETL Library
//!
//! A batch pipeline that turns raw order and user CSV exports into a clean,
//! validated and enriched analytics table, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Schema Enforcement**: Text columns stay text, numeric columns are coerced with counted failures
//! - **Validation**: Required columns, non-empty inputs, unique keys and value ranges
//! - **Normalization**: Case folding, whitespace collapsing and status mapping
//! - **Missingness**: Per-column report and `<col>__isna` flags
//! - **Datetime Enrichment**: Tolerant timestamp parsing plus date, month, year, weekday and hour
//! - **Safe Joins**: Left joins that refuse to duplicate rows
//! - **Outliers**: Winsorizing and IQR fence flags
//! - **Reporting**: Revenue by country and a per-run metadata document
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use orders_etl::{EtlConfig, EtlPipeline};
//!
//! let config = EtlConfig::builder("/srv/analytics")
//!     .outlier_k(1.5)
//!     .winsor_quantiles(0.01, 0.99)
//!     .enforce_unique_order_id(true)
//!     .build()?;
//!
//! let summary = EtlPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("Analytics rows: {}", summary.metadata.rows_out);
//! println!("Country match rate: {:.3}", summary.metadata.country_match_rate);
//! ```
//!
//! Tables already in memory can be processed without touching the inputs on
//! disk:
//!
//! ```rust,ignore
//! let output = pipeline.process(&orders_raw, &users)?;
//! println!("{}", output.analytics.head(Some(5)));
//! ```

pub mod cleaner;
pub mod config;
pub mod enrich;
pub mod error;
pub mod io;
pub mod join;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{
    apply_mapping, dedupe_keep_latest, default_status_mapping, enforce_schema, normalize_text,
};
pub use config::{ConfigValidationError, EtlConfig, EtlConfigBuilder, ProjectPaths};
pub use enrich::{add_time_parts, parse_datetime};
pub use error::{EtlError, Result as EtlResult, ResultExt};
pub use join::{JoinValidation, safe_left_join};
pub use pipeline::{
    ClosureProgressReporter, EtlOutput, EtlPipeline, EtlPipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use quality::{
    add_missing_flags, assert_in_range, assert_non_empty, assert_unique_key, missingness_report,
    require_columns,
};
pub use reporting::{build_run_metadata, revenue_by_country, write_run_metadata};
pub use stats::{add_outlier_flag, bootstrap_diff_means, iqr_bounds, winsorize};
pub use types::{
    BootstrapEstimate, CoercionCounts, ColumnMissingness, ParsedValue, RowCounts, RunMetadata,
    RunSummary, SchemaReport,
};
