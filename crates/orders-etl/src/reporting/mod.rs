//! Reporting module.
//!
//! Summary tables and the per-run metadata document.

mod metadata;
mod revenue;

pub use metadata::{build_run_metadata, write_run_metadata};
pub use revenue::revenue_by_country;
