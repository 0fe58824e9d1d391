//! Utility functions for Tally
//!
//! Common helper functions used across the codebase.

use std::sync::LazyLock;

/// Regex pattern for validating identifiers (rack ids, user ids, floors)
static VALID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]+$").expect("Invalid regex pattern"));

/// Validate an identifier contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen.
/// Empty identifiers are rejected.
///
/// # Examples
///
/// ```
/// use tally_common::is_valid_id;
///
/// assert!(is_valid_id("R-12"));
/// assert!(is_valid_id("warehouse.floor:2"));
/// assert!(!is_valid_id("rack 12"));
/// assert!(!is_valid_id(""));
/// ```
pub fn is_valid_id(str: &str) -> bool {
    VALID_PATTERN.is_match(str)
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
