//! # speccritic-core
//!
//! Deterministic trust boundary between an LLM reviewer and the caller.
//!
//! This crate turns untrusted model text into a validated report and
//! derives everything else from it:
//! - Is the output well-formed, and does every citation exist?
//! - How acceptable is the specification (score and verdict)?
//! - Which suggested edits can actually be applied?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No LLM calls**: Model access lives in `speccritic-runtime`
//! 3. **All-or-nothing validation**: One bad finding rejects the report
//! 4. **Filtering never scores**: The summary comes from the unfiltered report
//!
//! ## Example
//!
//! ```rust,ignore
//! use speccritic_core::{anchor_all, filter_by_severity, validate, Severity, Synthesizer};
//!
//! let report = validate(&model_text, doc.line_count)?;
//! let summary = Synthesizer::new().synthesize(&report);
//! let shown = filter_by_severity(report.issues(), Severity::Warn);
//! let patches = anchor_all(&doc.raw, report.patches());
//! ```

pub mod document;
pub mod evidence;
pub mod filter;
pub mod patch;
pub mod profile;
pub mod redact;
pub mod render;
pub mod synthesizer;
pub mod types;
pub mod validate;

// Re-export main types at crate root
pub use document::{format_context_for_prompt, ContextFile, DocumentError, SourceDocument};
pub use evidence::{BoundsViolation, Evidence};
pub use filter::filter_by_severity;
pub use patch::{anchor_all, AnchorKind, PatchSet, ResolvedPatch, SkippedPatch};
pub use profile::{Profile, ProfileError};
pub use redact::redact;
pub use render::{OutputFormat, RenderError};
pub use synthesizer::Synthesizer;
pub use types::{
    Category, Input, Issue, Meta, PatchSuggestion, Question, Report, ReviewReport, Severity,
    Summary, Verdict,
};
pub use validate::{validate, FailureCategory, SchemaViolation, ValidationError};

/// Tool name written into every report.
pub const TOOL_NAME: &str = "speccritic";

/// Crate version written into every report.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
