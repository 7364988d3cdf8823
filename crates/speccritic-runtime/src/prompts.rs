//! Prompts for the specification auditor.
//!
//! The system prompt is fixed apart from strict mode and profile rules.
//! The user prompt carries the line-numbered specification, any context
//! files, and an example of the expected JSON shape.

use speccritic_core::{format_context_for_prompt, ContextFile, FailureCategory, Profile, SourceDocument};

/// Base system prompt.
///
/// Frames the model as an auditor that only reports defects with line
/// citations. Score and verdict are never requested from the model.
pub const SYSTEM_PROMPT_BASE: &str = r#"You are a specification auditor. Your job is to identify defects in software specifications.

Defect categories you must check:
- NON_TESTABLE_REQUIREMENT: requirement cannot be verified by a test
- AMBIGUOUS_BEHAVIOR: two engineers could implement differently
- CONTRADICTION: two statements cannot both be true
- MISSING_FAILURE_MODE: what happens when X fails is not stated
- UNDEFINED_INTERFACE: a referenced interface has no specification
- MISSING_INVARIANT: a property that must always hold is not stated
- SCOPE_LEAK: spec describes implementation, not behavior
- ORDERING_UNDEFINED: sequence of operations is ambiguous
- TERMINOLOGY_INCONSISTENT: same concept named differently
- UNSPECIFIED_CONSTRAINT: implicit constraint not made explicit
- ASSUMPTION_REQUIRED: must assume something unstated to implement

Severity rules:
- CRITICAL: must be resolved before implementation can begin
- WARN: should be resolved; implementation possible but risky
- INFO: note for clarity; does not block implementation

Anti-hallucination rules:
- Only cite lines that exist in the provided spec (lines are prefixed L1:, L2:, etc.)
- Do not invent requirements not present in the spec
- Do not suggest architectural solutions
- Every issue must have at least one evidence block with valid line numbers
- Issue IDs must follow format ISSUE-XXXX (four digits, zero-padded)
- Question IDs must follow format Q-XXXX

Output rules:
- Return JSON only: no prose, no markdown fences, no explanation
- JSON must match the provided schema exactly
- Do not include score or verdict; those are computed externally"#;

/// Appended to the system prompt in strict mode.
pub const STRICT_MODE_TEXT: &str = r#"
STRICT MODE ENABLED: Treat all silence as ambiguity. Any behavior not explicitly
stated must be flagged. Any assumption required to implement must be filed as CRITICAL.
Label all uncertain findings with tag "assumption"."#;

/// Example of the JSON shape the model must return.
pub const SCHEMA_EXAMPLE: &str = r#"{
  "issues": [
    {
      "id": "ISSUE-0001",
      "severity": "CRITICAL",
      "category": "NON_TESTABLE_REQUIREMENT",
      "title": "Short title describing the defect",
      "description": "Detailed explanation of the defect",
      "evidence": [{"path": "SPEC.md", "line_start": 10, "line_end": 12, "quote": "exact text from spec"}],
      "impact": "What goes wrong if this is not fixed",
      "recommendation": "Minimal corrective action",
      "blocking": true,
      "tags": []
    }
  ],
  "questions": [
    {
      "id": "Q-0001",
      "severity": "CRITICAL",
      "question": "Specific question that must be answered before implementation",
      "why_needed": "Why this question blocks implementation",
      "blocks": ["REQ-001"],
      "evidence": [{"path": "SPEC.md", "line_start": 10, "line_end": 12, "quote": "exact text"}]
    }
  ],
  "patches": [
    {
      "issue_id": "ISSUE-0001",
      "before": "exact text from spec to be replaced",
      "after": "corrected minimal replacement text"
    }
  ]
}"#;

/// System prompt for a profile, with strict mode if requested.
pub fn build_system_prompt(profile: &Profile, strict: bool) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT_BASE);

    if strict {
        prompt.push_str(STRICT_MODE_TEXT);
    }

    let rules = profile.format_rules_for_prompt();
    if !rules.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&rules);
    }

    prompt
}

/// User prompt with the numbered specification and context files.
///
/// Pass the redacted document; its text is sent verbatim.
pub fn build_user_prompt(doc: &SourceDocument, context: &[ContextFile]) -> String {
    let mut prompt = String::from("Analyze the following specification for defects.\n\n");

    prompt.push_str(&format!("<spec file={:?}>\n", doc.path));
    prompt.push_str(&doc.numbered);
    if !doc.numbered.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push_str("</spec>\n");

    if !context.is_empty() {
        prompt.push('\n');
        prompt.push_str(&format_context_for_prompt(context));
    }

    prompt.push_str("\nReturn your findings as JSON with this structure:\n");
    prompt.push_str(SCHEMA_EXAMPLE);

    prompt
}

/// User prompt for the single repair attempt.
///
/// Only the fixed category label is added. The rejected output is never
/// echoed back to the model.
pub fn repair_prompt(user_prompt: &str, category: FailureCategory) -> String {
    format!(
        "{}\n\nYour previous response failed schema validation (error category: {:?}). \
         Return only valid JSON matching the schema above.",
        user_prompt,
        category.as_str()
    )
}
