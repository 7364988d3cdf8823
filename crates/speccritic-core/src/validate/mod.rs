//! Output validation: the trust boundary for model output.
//!
//! Raw model text is parsed, checked against the output schema, then every
//! finding is checked for ID format, enum values, required text and
//! evidence bounds. Validation is fail-fast and all-or-nothing: a single
//! bad finding rejects the whole report.
//!
//! Errors carry index-based locations and a [`FailureCategory`] with a
//! fixed label. Neither ever contains model-generated text, so both are
//! safe to log and to embed in a repair prompt.

mod parser;
mod schema;

use std::fmt;

use thiserror::Error;

use crate::evidence::BoundsViolation;

pub use parser::{strip_fences, validate};

/// Schema violations, collapsed to a fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaViolation {
    /// JSON types or shape do not match the output schema
    MalformedStructure,
    /// Issue id is not `ISSUE-####`
    InvalidIssueId,
    /// Question id is not `Q-####`
    InvalidQuestionId,
    /// Severity is not INFO, WARN or CRITICAL
    InvalidSeverity,
    /// Category is not one of the defect categories
    UnknownCategory,
    /// Issue title is empty
    MissingTitle,
    /// Question text is empty
    MissingQuestion,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SchemaViolation::MalformedStructure => "value does not match the output schema",
            SchemaViolation::InvalidIssueId => "id does not match ISSUE-#### format",
            SchemaViolation::InvalidQuestionId => "id does not match Q-#### format",
            SchemaViolation::InvalidSeverity => "invalid severity",
            SchemaViolation::UnknownCategory => "unknown category",
            SchemaViolation::MissingTitle => "title is required",
            SchemaViolation::MissingQuestion => "question text is required",
        };
        f.write_str(text)
    }
}

/// Errors from output validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("JSON parse failed at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("schema violation at {location}: {violation}")]
    Schema {
        location: String,
        violation: SchemaViolation,
    },

    #[error("evidence out of bounds at {location}: {violation}")]
    EvidenceOutOfBounds {
        location: String,
        violation: BoundsViolation,
    },
}

impl ValidationError {
    /// The fixed category of this failure.
    pub fn category(&self) -> FailureCategory {
        match self {
            ValidationError::Syntax { .. } => FailureCategory::JsonSyntax,
            ValidationError::EvidenceOutOfBounds { .. } => FailureCategory::InvalidLineRange,
            ValidationError::Schema { violation, .. } => match violation {
                SchemaViolation::MalformedStructure => FailureCategory::SchemaMismatch,
                SchemaViolation::InvalidIssueId | SchemaViolation::InvalidQuestionId => {
                    FailureCategory::InvalidIdFormat
                }
                SchemaViolation::InvalidSeverity => FailureCategory::InvalidSeverity,
                SchemaViolation::UnknownCategory => FailureCategory::UnknownCategory,
                SchemaViolation::MissingTitle | SchemaViolation::MissingQuestion => {
                    FailureCategory::MissingRequiredField
                }
            },
        }
    }
}

/// Enumerable failure classes with fixed labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    JsonSyntax,
    InvalidSeverity,
    UnknownCategory,
    MissingRequiredField,
    InvalidIdFormat,
    InvalidLineRange,
    SchemaMismatch,
}

impl FailureCategory {
    /// Label embedded in repair prompts and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::JsonSyntax => "JSON syntax error",
            FailureCategory::InvalidSeverity => {
                "invalid enum value (severity must be INFO, WARN, or CRITICAL)"
            }
            FailureCategory::UnknownCategory => "invalid enum value (unknown defect category)",
            FailureCategory::MissingRequiredField => "missing required field",
            FailureCategory::InvalidIdFormat => "invalid ID format",
            FailureCategory::InvalidLineRange => "invalid line range in evidence",
            FailureCategory::SchemaMismatch => "schema validation error",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
