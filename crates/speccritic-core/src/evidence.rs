//! Evidence linking for SpecCritic findings.
//!
//! Every finding cites line ranges of the numbered specification. A
//! citation is only trusted once its range has been checked against the
//! real line count of the document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cited line range and the literal text the reviewer quoted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Path of the cited file as named in the prompt
    pub path: String,

    /// First cited line (1-based, inclusive)
    pub line_start: usize,

    /// Last cited line (inclusive)
    pub line_end: usize,

    /// Quoted text
    pub quote: String,
}

/// Why a cited line range was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsViolation {
    /// `line_start` is below 1
    StartBelowOne,
    /// `line_end` precedes `line_start`
    EndBeforeStart,
    /// `line_end` is past the last line of the document
    EndPastDocument,
}

impl fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsViolation::StartBelowOne => write!(f, "line_start must be at least 1"),
            BoundsViolation::EndBeforeStart => write!(f, "line_end precedes line_start"),
            BoundsViolation::EndPastDocument => write!(f, "line_end exceeds document line count"),
        }
    }
}

/// Check a raw `(line_start, line_end)` pair from model output.
///
/// `line_count == 0` means the document extent is unknown and disables the
/// upper-bound check. On success returns the range as unsigned line numbers.
pub fn check_line_range(
    line_start: i64,
    line_end: i64,
    line_count: usize,
) -> Result<(usize, usize), BoundsViolation> {
    if line_start < 1 {
        return Err(BoundsViolation::StartBelowOne);
    }
    if line_end < line_start {
        return Err(BoundsViolation::EndBeforeStart);
    }

    let start = usize::try_from(line_start).map_err(|_| BoundsViolation::EndPastDocument)?;
    let end = usize::try_from(line_end).map_err(|_| BoundsViolation::EndPastDocument)?;

    if line_count > 0 && end > line_count {
        return Err(BoundsViolation::EndPastDocument);
    }

    Ok((start, end))
}
