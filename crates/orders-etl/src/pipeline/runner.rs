//! ETL pipeline orchestration.
//!
//! [`EtlPipeline::run`] drives the full sequence: load, validate, transform,
//! join, enrich and write. [`EtlPipeline::process`] runs the in-memory part
//! on tables the caller already has.

use crate::cleaner::{apply_mapping, enforce_schema, normalize_text};
use crate::config::{ConfigValidationError, EtlConfig};
use crate::enrich::{add_time_parts, parse_datetime};
use crate::error::{EtlError, Result, ResultExt};
use crate::io::{read_orders_csv, read_users_csv, write_csv, write_parquet};
use crate::join::{JoinValidation, safe_left_join};
use crate::pipeline::stage::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::{
    add_missing_flags, assert_column_in_range, assert_non_empty, assert_unique_key,
    missingness_report, require_columns,
};
use crate::reporting::{build_run_metadata, revenue_by_country, write_run_metadata};
use crate::stats::{add_outlier_flag, outlier_flag_name, winsorize};
use crate::types::{CoercionCounts, RunSummary, SchemaReport};
use crate::utils::get_series;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Columns the raw orders table must carry.
pub const ORDER_COLUMNS: [&str; 6] = [
    "order_id",
    "user_id",
    "amount",
    "quantity",
    "created_at",
    "status",
];

/// Columns the users table must carry.
pub const USER_COLUMNS: [&str; 3] = ["user_id", "country", "signup_date"];

/// Tables and counts produced by the in-memory stages.
#[derive(Debug, Clone)]
pub struct EtlOutput {
    /// Schema-enforced orders with `status_clean` and missing flags.
    pub orders_clean: DataFrame,
    /// Users as loaded.
    pub users: DataFrame,
    /// Orders joined with users plus time parts, winsorized amount and outlier flag.
    pub analytics: DataFrame,
    /// Missingness of the schema-enforced orders.
    pub missingness: DataFrame,
    /// Order count and revenue per country.
    pub revenue: DataFrame,
    pub schema: SchemaReport,
    pub timestamps: CoercionCounts,
    pub outliers: usize,
}

/// The ETL pipeline.
///
/// Use [`EtlPipeline::builder()`] to create a pipeline.
pub struct EtlPipeline {
    config: EtlConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(EtlPipeline: Send, Sync);

impl EtlPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> EtlPipelineBuilder {
        EtlPipelineBuilder::default()
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Run the whole pipeline from the raw CSVs to the written artifacts.
    ///
    /// Stages run strictly in order and the first error aborts the run.
    /// Files written before the failure are left in place.
    pub fn run(&self) -> Result<RunSummary> {
        match self.run_internal() {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::done(format!(
                    "ETL complete: {} rows in analytics table",
                    summary.metadata.rows_out
                )));
                Ok(summary)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Validate, transform, join and enrich tables already in memory.
    ///
    /// Only the missingness report is written, and only when `save_to_disk`
    /// is set.
    pub fn process(&self, orders_raw: &DataFrame, users: &DataFrame) -> Result<EtlOutput> {
        self.process_internal(orders_raw, users)
            .map_err(|e| self.fail(e))
    }

    fn fail(&self, e: EtlError) -> EtlError {
        error!("Pipeline error [{}]: {}", e.error_code(), e);
        self.report_progress(ProgressUpdate::failed(e.to_string()));
        e
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn enter(&self, stage: PipelineStage, message: &str) {
        info!("{}: {}", stage.display_name(), message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
    }

    fn run_internal(&self) -> Result<RunSummary> {
        let start_time = Instant::now();

        self.enter(PipelineStage::Loading, "Loading inputs");
        let orders_raw = read_orders_csv(&self.config.raw_orders)?;
        let users = read_users_csv(&self.config.raw_users)?;
        info!(
            "Loaded orders={} rows, users={} rows",
            orders_raw.height(),
            users.height()
        );

        let output = self.process_internal(&orders_raw, &users)?;

        self.enter(PipelineStage::Writing, "Writing outputs");
        let outputs = self.output_paths();
        if self.config.save_to_disk {
            self.write_outputs(&output)?;
        } else {
            debug!("save_to_disk is off, skipping artifacts");
        }

        let metadata = build_run_metadata(
            &output.analytics,
            orders_raw.height(),
            output.users.height(),
            &self.config,
            outputs,
        )?;
        if self.config.save_to_disk {
            write_run_metadata(&metadata, &self.config.run_meta)?;
            info!("Wrote run metadata: {}", self.config.run_meta.display());
        }

        Ok(RunSummary {
            metadata,
            schema: output.schema,
            outliers: output.outliers,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    fn process_internal(&self, orders_raw: &DataFrame, users: &DataFrame) -> Result<EtlOutput> {
        self.enter(PipelineStage::Validating, "Validating inputs");
        self.validate_inputs(orders_raw, users)
            .context("Validating inputs")?;

        self.enter(PipelineStage::Transforming, "Transforming orders");
        let (orders_clean, missingness, schema) = self.clean_orders(orders_raw)?;
        let (orders, timestamps) = parse_datetime(&orders_clean, "created_at", self.config.utc)?;
        info!(
            "Missing created_at after parse: {} / {} ({} unparseable)",
            timestamps.missing(),
            orders.height(),
            timestamps.invalid
        );
        let orders = add_time_parts(&orders, "created_at")?;

        self.enter(PipelineStage::Joining, "Joining orders with users");
        let joined = safe_left_join(
            &orders,
            users,
            &["user_id"],
            JoinValidation::ManyToOne,
            &self.config.join_suffix,
        )
        .context("Joining users")?;
        if joined.height() != orders.height() {
            return Err(EtlError::RowCountMismatch {
                expected: orders.height(),
                actual: joined.height(),
            });
        }
        let country_missing = get_series(&joined, "country")
            .map(|s| s.null_count())
            .unwrap_or(joined.height());
        info!(
            "Rows after join: {} | Country match rate: {:.3}",
            joined.height(),
            1.0 - country_missing as f64 / joined.height() as f64
        );

        self.enter(PipelineStage::Enriching, "Handling outliers in 'amount'");
        let (analytics, outliers) = self.enrich_amount(joined)?;
        let revenue = revenue_by_country(&analytics)?;
        debug!("Revenue summary has {} country groups", revenue.height());

        Ok(EtlOutput {
            orders_clean,
            users: users.clone(),
            analytics,
            missingness,
            revenue,
            schema,
            timestamps,
            outliers,
        })
    }

    fn validate_inputs(&self, orders_raw: &DataFrame, users: &DataFrame) -> Result<()> {
        require_columns(orders_raw, &ORDER_COLUMNS, "orders")?;
        require_columns(users, &USER_COLUMNS, "users")?;
        assert_non_empty(orders_raw, "orders")?;
        assert_non_empty(users, "users")?;
        assert_unique_key(users, "user_id", "users")?;
        if self.config.enforce_unique_order_id {
            assert_unique_key(orders_raw, "order_id", "orders")?;
        }
        Ok(())
    }

    /// Schema, missingness report, range check, status normalization and flags.
    fn clean_orders(&self, orders_raw: &DataFrame) -> Result<(DataFrame, DataFrame, SchemaReport)> {
        let (mut orders, schema) = enforce_schema(orders_raw)?;

        let missingness = missingness_report(&orders)?;
        if self.config.save_to_disk {
            write_csv(&missingness, &self.config.missingness_report)?;
            info!(
                "Wrote missingness report: {}",
                self.config.missingness_report.display()
            );
        }

        if self.config.validate_ranges {
            assert_column_in_range(&orders, "amount", Some(0.0), None)?;
            assert_column_in_range(&orders, "quantity", Some(0.0), None)?;
        }

        let status_norm = normalize_text(&get_series(&orders, "status")?)?;
        let status_clean = apply_mapping(&status_norm, &self.config.status_mapping)?
            .with_name("status_clean".into());
        orders.with_column(status_clean)?;

        let orders = add_missing_flags(&orders, &["amount", "quantity"])?;
        Ok((orders, missingness, schema))
    }

    /// Add `amount_winsor` and `amount__is_outlier`.
    ///
    /// With no usable amounts at all the winsorized column is null and
    /// nothing is flagged.
    fn enrich_amount(&self, joined: DataFrame) -> Result<(DataFrame, usize)> {
        let amount = get_series(&joined, "amount")?;
        let mut analytics = joined;

        match winsorize(&amount, self.config.winsor_lo, self.config.winsor_hi) {
            Ok(winsor) => {
                analytics.with_column(winsor.with_name("amount_winsor".into()))?;
                analytics = add_outlier_flag(&analytics, "amount", self.config.outlier_k)?;
            }
            Err(EtlError::NoValidValues(_)) => {
                warn!("No valid amounts, skipping winsorizing and outlier detection");
                let height = analytics.height();
                analytics.with_column(Series::new(
                    "amount_winsor".into(),
                    vec![None::<f64>; height],
                ))?;
                analytics.with_column(Series::new(
                    outlier_flag_name("amount").into(),
                    vec![false; height],
                ))?;
            }
            Err(e) => return Err(e),
        }

        let flags = get_series(&analytics, &outlier_flag_name("amount"))?;
        let outliers = flags.bool()?.into_iter().filter(|v| *v == Some(true)).count();
        info!("Flagged {} amount outliers", outliers);
        Ok((analytics, outliers))
    }

    /// Every artifact a run produces, by name.
    fn output_paths(&self) -> BTreeMap<String, PathBuf> {
        let c = &self.config;
        [
            ("orders_clean", &c.out_orders_clean),
            ("users", &c.out_users),
            ("analytics", &c.out_analytics),
            ("missingness_report", &c.missingness_report),
            ("revenue_report", &c.revenue_report),
            ("run_meta", &c.run_meta),
        ]
        .into_iter()
        .map(|(name, path)| (name.to_string(), path.clone()))
        .collect()
    }

    fn write_outputs(&self, output: &EtlOutput) -> Result<()> {
        let c = &self.config;
        let parquet: [(&DataFrame, &Path); 3] = [
            (&output.orders_clean, c.out_orders_clean.as_path()),
            (&output.users, c.out_users.as_path()),
            (&output.analytics, c.out_analytics.as_path()),
        ];
        let total = parquet.len() + 1;

        for (i, (df, path)) in parquet.into_iter().enumerate() {
            self.report_write(i, total, path);
            write_parquet(df, path)?;
        }

        self.report_write(total - 1, total, &c.revenue_report);
        write_csv(&output.revenue, &c.revenue_report)?;

        info!("Wrote outputs to {}", c.paths.processed.display());
        Ok(())
    }

    fn report_write(&self, index: usize, total: usize, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Writing {}", path.display());
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Writing,
            name.clone(),
            index,
            total,
            format!("Writing {}", name),
        ));
    }
}

/// Builder for [`EtlPipeline`].
#[derive(Default)]
pub struct EtlPipelineBuilder {
    config: Option<EtlConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(EtlPipelineBuilder: Send);

impl EtlPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: EtlConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<EtlPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(EtlPipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
