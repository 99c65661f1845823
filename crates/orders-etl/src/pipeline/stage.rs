//! Pipeline stages and progress reporting.
//!
//! The pipeline is a strict sequence of stages. Every stage transition is
//! emitted as a [`ProgressUpdate`] to an optional [`ProgressReporter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use orders_etl::{EtlConfig, EtlPipeline};
//!
//! let summary = EtlPipeline::builder()
//!     .config(EtlConfig::builder("/srv/analytics").build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of an ETL run.
///
/// `Failed` is terminal and reachable from any other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the raw CSV inputs
    Loading,
    /// Required columns, non-empty inputs and key uniqueness
    Validating,
    /// Schema enforcement, normalization, flags and timestamp parsing
    Transforming,
    /// Joining orders with users
    Joining,
    /// Winsorizing, outlier flags and revenue summary
    Enriching,
    /// Persisting tables, reports and run metadata
    Writing,
    /// Run completed successfully
    Done,
    /// Run aborted with an error
    Failed,
}

impl PipelineStage {
    /// Stages in execution order, excluding the terminal states.
    pub const SEQUENCE: [PipelineStage; 6] = [
        Self::Loading,
        Self::Validating,
        Self::Transforming,
        Self::Joining,
        Self::Enriching,
        Self::Writing,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Inputs",
            Self::Validating => "Validating Inputs",
            Self::Transforming => "Transforming Orders",
            Self::Joining => "Joining Users",
            Self::Enriching => "Enriching Analytics",
            Self::Writing => "Writing Outputs",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage (0.0 - 1.0).
    ///
    /// The weights of the non-terminal stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.10,
            Self::Validating => 0.10,
            Self::Transforming => 0.30,
            Self::Joining => 0.15,
            Self::Enriching => 0.15,
            Self::Writing => 0.20,
            Self::Done | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Validating => 0.10,
            Self::Transforming => 0.20,
            Self::Joining => 0.50,
            Self::Enriching => 0.65,
            Self::Writing => 0.80,
            Self::Done => 1.0,
            Self::Failed => 0.0,
        }
    }

    /// Whether the run can make no further transitions from this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Progress update emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Optional finer-grained step (e.g., "analytics_table.parquet")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a progress update counting items within a stage.
    pub fn with_items(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn done(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Done, 1.0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Receiver for progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    /// Called on every stage transition and for each written artifact.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(PipelineStage: Send, Sync, Copy);
