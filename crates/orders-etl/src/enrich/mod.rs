//! Derived fields added after cleaning.

mod datetime;

pub use datetime::{add_time_parts, parse_datetime, parse_timestamp, timestamp_millis};
