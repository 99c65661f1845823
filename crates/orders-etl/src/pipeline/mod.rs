//! Pipeline module.
//!
//! Stage sequencing, progress reporting and the pipeline runner.

mod runner;
pub mod stage;

pub use runner::{EtlOutput, EtlPipeline, EtlPipelineBuilder, ORDER_COLUMNS, USER_COLUMNS};
pub use stage::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
