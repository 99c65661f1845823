//! Cleaning steps for the orders table.
//!
//! This module provides:
//! - Schema enforcement with per-column coercion counts
//! - Text normalization and status remapping
//! - Keep-latest deduplication

mod converters;
mod dedupe;
mod schema;
mod text;

pub use dedupe::dedupe_keep_latest;
pub use schema::{TEXT_COLUMNS, enforce_schema};
pub use text::{apply_mapping, default_status_mapping, normalize_text, normalize_value};
