//! Synthesizer: Aggregates validated findings into a summary.
//!
//! The synthesizer applies strict, non-configurable policy rules:
//! 1. If ANY issue or question is CRITICAL → verdict is INVALID
//! 2. Else if ANY issue exists (WARN or INFO) → verdict is VALID_WITH_GAPS
//! 3. Else → verdict is VALID
//!
//! The score starts at 100 and loses a fixed amount per issue severity,
//! floored at zero. Questions never affect the score.
//!
//! Always synthesize from the unfiltered report. The severity filter is a
//! display concern and must never feed back into these numbers.

use crate::types::{Issue, Question, Report, Severity, Summary, Verdict};

/// Starting score before deductions.
pub const MAX_SCORE: u32 = 100;

/// Points deducted per issue of the given severity.
pub fn penalty(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 20,
        Severity::Warn => 7,
        Severity::Info => 2,
    }
}

/// Score an issue list: 100 minus per-severity penalties, never below zero.
pub fn score(issues: &[Issue]) -> u32 {
    issues
        .iter()
        .fold(MAX_SCORE, |acc, issue| acc.saturating_sub(penalty(issue.severity)))
}

/// Derive the verdict from every issue and question.
pub fn verdict(issues: &[Issue], questions: &[Question]) -> Verdict {
    let any_critical = issues.iter().any(|i| i.severity == Severity::Critical)
        || questions.iter().any(|q| q.severity == Severity::Critical);

    if any_critical {
        return Verdict::Invalid;
    }

    // With no CRITICAL present, any remaining issue (WARN or INFO) is a gap.
    if !issues.is_empty() {
        return Verdict::ValidWithGaps;
    }

    Verdict::Valid
}

/// Tally issues by severity as `(critical, warn, info)`.
pub fn counts(issues: &[Issue]) -> (usize, usize, usize) {
    issues
        .iter()
        .fold((0, 0, 0), |(c, w, i), issue| match issue.severity {
            Severity::Critical => (c + 1, w, i),
            Severity::Warn => (c, w + 1, i),
            Severity::Info => (c, w, i + 1),
        })
}

/// The Synthesizer turns a validated report into its [`Summary`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Synthesize the summary for a validated report.
    ///
    /// # Arguments
    ///
    /// * `report` - The full, unfiltered report from the output validator
    ///
    /// # Returns
    ///
    /// A `Summary` with verdict, score and per-severity counts.
    pub fn synthesize(&self, report: &Report) -> Summary {
        let (critical_count, warn_count, info_count) = counts(report.issues());

        Summary {
            verdict: verdict(report.issues(), report.questions()),
            score: score(report.issues()),
            critical_count,
            warn_count,
            info_count,
        }
    }
}
