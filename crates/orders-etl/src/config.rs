//! Configuration types for the ETL pipeline.
//!
//! All file-system locations are derived from a single project root by
//! [`ProjectPaths::from_root`]. [`EtlConfig`] is built once (usually through
//! [`EtlConfig::builder`]) and passed explicitly to every stage.

use crate::cleaner::default_status_mapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixed directory layout under a project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub external: PathBuf,
    pub cache: PathBuf,
    pub reports: PathBuf,
}

impl ProjectPaths {
    /// Derive the standard layout: `data/{raw,processed,external,cache}` and `reports`.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data = root.join("data");
        Self {
            raw: data.join("raw"),
            processed: data.join("processed"),
            external: data.join("external"),
            cache: data.join("cache"),
            reports: root.join("reports"),
            root,
        }
    }
}

/// Configuration for one ETL run.
///
/// # Example
///
/// ```rust,ignore
/// use orders_etl::config::EtlConfig;
///
/// let config = EtlConfig::builder("/srv/analytics")
///     .outlier_k(3.0)
///     .enforce_unique_order_id(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Directory layout derived from the project root.
    pub paths: ProjectPaths,

    /// Raw orders CSV.
    /// Default: `data/raw/orders.csv`
    pub raw_orders: PathBuf,

    /// Raw users CSV.
    /// Default: `data/raw/users.csv`
    pub raw_users: PathBuf,

    /// Schema-enforced orders with normalized status and missing flags.
    /// Default: `data/processed/orders_clean.parquet`
    pub out_orders_clean: PathBuf,

    /// Users table as loaded.
    /// Default: `data/processed/users.parquet`
    pub out_users: PathBuf,

    /// Final joined and enriched table.
    /// Default: `data/processed/analytics_table.parquet`
    pub out_analytics: PathBuf,

    /// Run metadata document.
    /// Default: `data/processed/_run_meta.json`
    pub run_meta: PathBuf,

    /// Per-column missingness of the schema-enforced orders.
    /// Default: `reports/missingness_orders.csv`
    pub missingness_report: PathBuf,

    /// Order count and revenue per country.
    /// Default: `reports/revenue_by_country.csv`
    pub revenue_report: PathBuf,

    /// Tukey fence multiplier for outlier detection.
    /// Default: 1.5
    pub outlier_k: f64,

    /// Lower quantile for winsorizing `amount`.
    /// Default: 0.01
    pub winsor_lo: f64,

    /// Upper quantile for winsorizing `amount`.
    /// Default: 0.99
    pub winsor_hi: f64,

    /// Canonical labels for normalized status values. Unknown labels pass through.
    pub status_mapping: BTreeMap<String, String>,

    /// Fail validation when `orders.order_id` is duplicated.
    /// Default: false
    pub enforce_unique_order_id: bool,

    /// Fail when `amount` or `quantity` is negative after coercion.
    /// Default: true
    pub validate_ranges: bool,

    /// Convert offset-aware timestamps to UTC (otherwise keep local wall-clock time).
    /// Default: true
    pub utc: bool,

    /// Suffix for right-hand columns that collide with left-hand names in the join.
    /// Default: "_user"
    pub join_suffix: String,

    /// Write artifacts to disk. When false the run stays in memory.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self::from_paths(ProjectPaths::from_root("."))
    }
}

impl EtlConfig {
    /// Create a new configuration builder rooted at `root`.
    pub fn builder(root: impl Into<PathBuf>) -> EtlConfigBuilder {
        EtlConfigBuilder::new(root)
    }

    /// Default configuration for a directory layout.
    pub fn from_paths(paths: ProjectPaths) -> Self {
        Self {
            raw_orders: paths.raw.join("orders.csv"),
            raw_users: paths.raw.join("users.csv"),
            out_orders_clean: paths.processed.join("orders_clean.parquet"),
            out_users: paths.processed.join("users.parquet"),
            out_analytics: paths.processed.join("analytics_table.parquet"),
            run_meta: paths.processed.join("_run_meta.json"),
            missingness_report: paths.reports.join("missingness_orders.csv"),
            revenue_report: paths.reports.join("revenue_by_country.csv"),
            paths,
            outlier_k: 1.5,
            winsor_lo: 0.01,
            winsor_hi: 0.99,
            status_mapping: default_status_mapping(),
            enforce_unique_order_id: false,
            validate_ranges: true,
            utc: true,
            join_suffix: "_user".to_string(),
            save_to_disk: true,
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.outlier_k.is_finite() || self.outlier_k < 0.0 {
            return Err(ConfigValidationError::InvalidOutlierK(self.outlier_k));
        }

        for (field, value) in [("winsor_lo", self.winsor_lo), ("winsor_hi", self.winsor_hi)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidQuantile {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.winsor_lo > self.winsor_hi {
            return Err(ConfigValidationError::InvertedQuantiles {
                lo: self.winsor_lo,
                hi: self.winsor_hi,
            });
        }

        if self.join_suffix.is_empty() {
            return Err(ConfigValidationError::EmptyJoinSuffix);
        }

        Ok(())
    }

    /// Every configuration value rendered as text, for the run metadata.
    pub fn as_text_map(&self) -> BTreeMap<String, String> {
        let path = |p: &Path| p.display().to_string();
        let mut map = BTreeMap::new();
        map.insert("root".to_string(), path(&self.paths.root));
        map.insert("raw_dir".to_string(), path(&self.paths.raw));
        map.insert("processed_dir".to_string(), path(&self.paths.processed));
        map.insert("external_dir".to_string(), path(&self.paths.external));
        map.insert("cache_dir".to_string(), path(&self.paths.cache));
        map.insert("reports_dir".to_string(), path(&self.paths.reports));
        map.insert("raw_orders".to_string(), path(&self.raw_orders));
        map.insert("raw_users".to_string(), path(&self.raw_users));
        map.insert("out_orders_clean".to_string(), path(&self.out_orders_clean));
        map.insert("out_users".to_string(), path(&self.out_users));
        map.insert("out_analytics".to_string(), path(&self.out_analytics));
        map.insert("run_meta".to_string(), path(&self.run_meta));
        map.insert("missingness_report".to_string(), path(&self.missingness_report));
        map.insert("revenue_report".to_string(), path(&self.revenue_report));
        map.insert("outlier_k".to_string(), self.outlier_k.to_string());
        map.insert("winsor_lo".to_string(), self.winsor_lo.to_string());
        map.insert("winsor_hi".to_string(), self.winsor_hi.to_string());
        map.insert(
            "status_mapping".to_string(),
            self.status_mapping
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(","),
        );
        map.insert(
            "enforce_unique_order_id".to_string(),
            self.enforce_unique_order_id.to_string(),
        );
        map.insert("validate_ranges".to_string(), self.validate_ranges.to_string());
        map.insert("utc".to_string(), self.utc.to_string());
        map.insert("join_suffix".to_string(), self.join_suffix.clone());
        map.insert("save_to_disk".to_string(), self.save_to_disk.to_string());
        map
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier multiplier: {0} (must be finite and >= 0)")]
    InvalidOutlierK(f64),

    #[error("Invalid quantile for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidQuantile { field: String, value: f64 },

    #[error("Winsor quantiles are inverted: lo={lo} > hi={hi}")]
    InvertedQuantiles { lo: f64, hi: f64 },

    #[error("Join suffix must not be empty")]
    EmptyJoinSuffix,
}

impl From<ConfigValidationError> for crate::error::EtlError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::EtlError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EtlConfig`] with fluent API.
#[derive(Debug)]
pub struct EtlConfigBuilder {
    root: PathBuf,
    raw_orders: Option<PathBuf>,
    raw_users: Option<PathBuf>,
    outlier_k: Option<f64>,
    winsor_lo: Option<f64>,
    winsor_hi: Option<f64>,
    status_mapping: Option<BTreeMap<String, String>>,
    enforce_unique_order_id: Option<bool>,
    validate_ranges: Option<bool>,
    utc: Option<bool>,
    join_suffix: Option<String>,
    save_to_disk: Option<bool>,
}

impl EtlConfigBuilder {
    fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw_orders: None,
            raw_users: None,
            outlier_k: None,
            winsor_lo: None,
            winsor_hi: None,
            status_mapping: None,
            enforce_unique_order_id: None,
            validate_ranges: None,
            utc: None,
            join_suffix: None,
            save_to_disk: None,
        }
    }

    /// Read orders from a file other than `data/raw/orders.csv`.
    pub fn raw_orders(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_orders = Some(path.into());
        self
    }

    /// Read users from a file other than `data/raw/users.csv`.
    pub fn raw_users(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_users = Some(path.into());
        self
    }

    /// Set the Tukey fence multiplier.
    pub fn outlier_k(mut self, k: f64) -> Self {
        self.outlier_k = Some(k);
        self
    }

    /// Set the winsorizing quantiles.
    ///
    /// # Arguments
    /// * `lo` - lower quantile (e.g., 0.01)
    /// * `hi` - upper quantile (e.g., 0.99)
    pub fn winsor_quantiles(mut self, lo: f64, hi: f64) -> Self {
        self.winsor_lo = Some(lo);
        self.winsor_hi = Some(hi);
        self
    }

    /// Replace the status mapping table.
    pub fn status_mapping(mut self, mapping: BTreeMap<String, String>) -> Self {
        self.status_mapping = Some(mapping);
        self
    }

    /// Require `order_id` to be unique.
    pub fn enforce_unique_order_id(mut self, enforce: bool) -> Self {
        self.enforce_unique_order_id = Some(enforce);
        self
    }

    /// Enable or disable the non-negative check on `amount` and `quantity`.
    pub fn validate_ranges(mut self, validate: bool) -> Self {
        self.validate_ranges = Some(validate);
        self
    }

    /// Convert timestamps to UTC (true) or keep local wall-clock time (false).
    pub fn utc(mut self, utc: bool) -> Self {
        self.utc = Some(utc);
        self
    }

    /// Set the suffix for colliding right-hand column names.
    pub fn join_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.join_suffix = Some(suffix.into());
        self
    }

    /// Enable or disable writing artifacts to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EtlConfig` or an error if validation fails.
    pub fn build(self) -> Result<EtlConfig, ConfigValidationError> {
        let defaults = EtlConfig::from_paths(ProjectPaths::from_root(self.root));
        let config = EtlConfig {
            raw_orders: self.raw_orders.unwrap_or(defaults.raw_orders),
            raw_users: self.raw_users.unwrap_or(defaults.raw_users),
            outlier_k: self.outlier_k.unwrap_or(defaults.outlier_k),
            winsor_lo: self.winsor_lo.unwrap_or(defaults.winsor_lo),
            winsor_hi: self.winsor_hi.unwrap_or(defaults.winsor_hi),
            status_mapping: self.status_mapping.unwrap_or(defaults.status_mapping),
            enforce_unique_order_id: self
                .enforce_unique_order_id
                .unwrap_or(defaults.enforce_unique_order_id),
            validate_ranges: self.validate_ranges.unwrap_or(defaults.validate_ranges),
            utc: self.utc.unwrap_or(defaults.utc),
            join_suffix: self.join_suffix.unwrap_or(defaults.join_suffix),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_from_root() {
        let paths = ProjectPaths::from_root("/srv/etl");
        assert_eq!(paths.raw, PathBuf::from("/srv/etl/data/raw"));
        assert_eq!(paths.processed, PathBuf::from("/srv/etl/data/processed"));
        assert_eq!(paths.external, PathBuf::from("/srv/etl/data/external"));
        assert_eq!(paths.cache, PathBuf::from("/srv/etl/data/cache"));
        assert_eq!(paths.reports, PathBuf::from("/srv/etl/reports"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = EtlConfig::builder("/srv/etl").build().unwrap();
        assert_eq!(config.outlier_k, 1.5);
        assert_eq!(config.winsor_lo, 0.01);
        assert_eq!(config.winsor_hi, 0.99);
        assert!(config.utc);
        assert!(config.validate_ranges);
        assert!(!config.enforce_unique_order_id);
        assert_eq!(config.join_suffix, "_user");
        assert_eq!(config.raw_orders, PathBuf::from("/srv/etl/data/raw/orders.csv"));
        assert_eq!(
            config.out_analytics,
            PathBuf::from("/srv/etl/data/processed/analytics_table.parquet")
        );
        assert_eq!(
            config.missingness_report,
            PathBuf::from("/srv/etl/reports/missingness_orders.csv")
        );
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EtlConfig::builder("root")
            .raw_orders("elsewhere/orders.csv")
            .outlier_k(3.0)
            .winsor_quantiles(0.05, 0.95)
            .enforce_unique_order_id(true)
            .utc(false)
            .build()
            .unwrap();

        assert_eq!(config.raw_orders, PathBuf::from("elsewhere/orders.csv"));
        assert_eq!(config.raw_users, PathBuf::from("root/data/raw/users.csv"));
        assert_eq!(config.outlier_k, 3.0);
        assert_eq!(config.winsor_lo, 0.05);
        assert_eq!(config.winsor_hi, 0.95);
        assert!(config.enforce_unique_order_id);
        assert!(!config.utc);
    }

    #[test]
    fn test_validation_negative_k() {
        let result = EtlConfig::builder(".").outlier_k(-1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidOutlierK(_)
        ));
    }

    #[test]
    fn test_validation_quantile_out_of_range() {
        let result = EtlConfig::builder(".").winsor_quantiles(0.0, 1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidQuantile { .. }
        ));
    }

    #[test]
    fn test_validation_inverted_quantiles() {
        let result = EtlConfig::builder(".").winsor_quantiles(0.9, 0.1).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvertedQuantiles { .. }
        ));
    }

    #[test]
    fn test_validation_empty_suffix() {
        let result = EtlConfig::builder(".").join_suffix("").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyJoinSuffix
        ));
    }

    #[test]
    fn test_as_text_map_covers_every_setting() {
        let config = EtlConfig::builder("/srv/etl").build().unwrap();
        let map = config.as_text_map();

        assert_eq!(map["root"], "/srv/etl");
        assert_eq!(map["outlier_k"], "1.5");
        assert_eq!(map["utc"], "true");
        assert_eq!(map["join_suffix"], "_user");
        assert!(map["status_mapping"].contains("cancelled=canceled"));
        assert!(map.contains_key("revenue_report"));
    }

    #[test]
    fn test_config_serialization() {
        let config = EtlConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EtlConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.outlier_k, deserialized.outlier_k);
        assert_eq!(config.paths, deserialized.paths);
        assert_eq!(config.status_mapping, deserialized.status_mapping);
    }
}
