//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: HTML sanitization and word counting for article bodies
//! - **Time handling**: Epoch-millisecond conversions and `YYYY-MM-DD` parsing
//! - **URL validation**: Guarding where the bearer token may be sent
//!
//! # Examples
//!
//! ```
//! use feeder::util::{count_words, strip_html_tags};
//!
//! let text = strip_html_tags("<p>Hello <b>world</b></p>");
//! assert_eq!(text, "Hello world");
//! assert_eq!(count_words(&text), 2);
//! ```

mod text;
mod time;
mod url_validator;

pub use text::{count_words, strip_html_tags};
pub use time::{
    days_ago_ms, format_timestamp_ms, format_timestamp_short, generate_output_prefix,
    local_midnight_ms, parse_date,
};
pub use url_validator::{validate_base_url, UrlValidationError};
