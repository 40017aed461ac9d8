//! Normalization utilities shared by the feed parser.
//!
//! - **Text**: markup stripping and character-bounded truncation for
//!   article summaries
//! - **Dates**: best-effort parsing of the date formats feeds actually
//!   ship, with a graceful "now" fallback
//!
//! # Examples
//!
//! ```
//! use newswire::util::{parse_date, strip_markup, truncate};
//!
//! let summary = truncate(&strip_markup("<p>Hi there</p>"), 200).trim().to_string();
//! assert_eq!(summary, "Hi there");
//!
//! let when = parse_date(Some("Mon, 01 Jan 2024 00:00:00 GMT"));
//! assert_eq!(when.to_rfc3339(), "2024-01-01T00:00:00+00:00");
//! ```

mod date;
mod text;

pub use date::{format_display, parse_date};
pub use text::{strip_markup, truncate};
