//! Severity filtering of the issues shown to a reader.
//!
//! Returns a new vector; the report the summary was computed from is
//! untouched.

use crate::types::{Issue, Severity};

/// Keep issues whose severity is at or above `threshold`.
///
/// `Severity::Info` keeps everything.
pub fn filter_by_severity(issues: &[Issue], threshold: Severity) -> Vec<Issue> {
    issues
        .iter()
        .filter(|issue| issue.severity.ordinal() >= threshold.ordinal())
        .cloned()
        .collect()
}
