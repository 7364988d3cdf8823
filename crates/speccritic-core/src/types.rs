//! Core types for SpecCritic reviews.
//!
//! Findings (issues and questions) only come into existence through the
//! output validator. Once a [`Report`] is built it is never mutated;
//! scoring, filtering and patch anchoring all produce new values.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// Finding severity, totally ordered `Info < Warn < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warn, Severity::Critical];

    /// Numeric ordering used by threshold comparisons.
    pub fn ordinal(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Warn => 1,
            Severity::Critical => 2,
        }
    }

    /// Wire label as it appears in model output.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Exact (case-sensitive) match against the wire label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse for configuration and command-line input (`warn`, `WARN`).
impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{}': expected info, warn, or critical", s))
    }
}

/// The defect categories a reviewer may file an issue under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    NonTestableRequirement,
    AmbiguousBehavior,
    Contradiction,
    MissingFailureMode,
    UndefinedInterface,
    MissingInvariant,
    ScopeLeak,
    OrderingUndefined,
    TerminologyInconsistent,
    UnspecifiedConstraint,
    AssumptionRequired,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::NonTestableRequirement,
        Category::AmbiguousBehavior,
        Category::Contradiction,
        Category::MissingFailureMode,
        Category::UndefinedInterface,
        Category::MissingInvariant,
        Category::ScopeLeak,
        Category::OrderingUndefined,
        Category::TerminologyInconsistent,
        Category::UnspecifiedConstraint,
        Category::AssumptionRequired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::NonTestableRequirement => "NON_TESTABLE_REQUIREMENT",
            Category::AmbiguousBehavior => "AMBIGUOUS_BEHAVIOR",
            Category::Contradiction => "CONTRADICTION",
            Category::MissingFailureMode => "MISSING_FAILURE_MODE",
            Category::UndefinedInterface => "UNDEFINED_INTERFACE",
            Category::MissingInvariant => "MISSING_INVARIANT",
            Category::ScopeLeak => "SCOPE_LEAK",
            Category::OrderingUndefined => "ORDERING_UNDEFINED",
            Category::TerminologyInconsistent => "TERMINOLOGY_INCONSISTENT",
            Category::UnspecifiedConstraint => "UNSPECIFIED_CONSTRAINT",
            Category::AssumptionRequired => "ASSUMPTION_REQUIRED",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall acceptability of a specification.
///
/// Ordered `Valid < ValidWithGaps < Invalid` so `--fail-on` can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Valid,
    ValidWithGaps,
    Invalid,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Valid => "VALID",
            Verdict::ValidWithGaps => "VALID_WITH_GAPS",
            Verdict::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Verdict::Valid, Verdict::ValidWithGaps, Verdict::Invalid]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown verdict '{}': expected VALID, VALID_WITH_GAPS, or INVALID",
                    s
                )
            })
    }
}

/// A defect found in the specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// `ISSUE-####`
    pub id: String,
    pub severity: Severity,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub evidence: Vec<Evidence>,
    pub impact: String,
    pub recommendation: String,
    pub blocking: bool,
    pub tags: BTreeSet<String>,
}

/// A clarification the reviewer needs answered before implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    /// `Q-####`
    pub id: String,
    pub severity: Severity,
    pub question: String,
    pub why_needed: String,
    /// Requirement identifiers this question blocks (opaque).
    pub blocks: Vec<String>,
    pub evidence: Vec<Evidence>,
}

/// A proposed textual substitution. Not guaranteed to match the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSuggestion {
    pub issue_id: String,
    pub before: String,
    pub after: String,
}

/// Validated model output.
///
/// Only the output validator constructs a `Report`; downstream stages get
/// read-only slices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Report {
    issues: Vec<Issue>,
    questions: Vec<Question>,
    patches: Vec<PatchSuggestion>,
}

impl Report {
    pub(crate) fn new(
        issues: Vec<Issue>,
        questions: Vec<Question>,
        patches: Vec<PatchSuggestion>,
    ) -> Self {
        Self {
            issues,
            questions,
            patches,
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn patches(&self) -> &[PatchSuggestion] {
        &self.patches
    }
}

/// Computed verdict and counts.
///
/// Always derived from the unfiltered report; severity filtering of the
/// displayed issues never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub verdict: Verdict,
    pub score: u32,
    pub critical_count: usize,
    pub warn_count: usize,
    pub info_count: usize,
}

/// Parameters of the run, echoed into the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Input {
    pub spec_file: String,
    /// `sha256:<hex>` of the original file, computed before redaction.
    pub spec_hash: String,
    pub context_files: Vec<String>,
    pub profile: String,
    pub strict: bool,
    pub severity_threshold: Severity,
}

/// Runtime metadata about the model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub model: String,
    pub temperature: f32,
    pub attempts: u8,
    pub evaluated_at: DateTime<Utc>,
}

/// The full review document handed to renderers.
///
/// `issues` holds the severity-filtered view; `summary` counts every
/// issue the validator accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReport {
    pub tool: String,
    pub version: String,
    pub input: Input,
    pub summary: Summary,
    pub issues: Vec<Issue>,
    pub questions: Vec<Question>,
    pub patches: Vec<PatchSuggestion>,
    pub meta: Meta,
}
