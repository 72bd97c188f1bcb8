//! Small helpers shared across the pipeline: timestamp formatting and
//! text truncation for log and error messages.

pub mod text;
pub mod timestamps;

pub use text::truncate_chars;
pub use timestamps::{format_status_timestamp, now_utc, parse_retry_after, Timestamp};
