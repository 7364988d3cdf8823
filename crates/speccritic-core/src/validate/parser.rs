//! Parsing raw model text into a validated [`Report`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::schema::first_structural_violation;
use super::{SchemaViolation, ValidationError};
use crate::evidence::{check_line_range, Evidence};
use crate::types::{Category, Issue, PatchSuggestion, Question, Report, Severity};

lazy_static! {
    // ASCII digits only; `\d` in the regex crate is Unicode-aware.
    static ref ISSUE_ID_PATTERN: Regex = Regex::new(r"^ISSUE-[0-9]{4}$").unwrap();
    static ref QUESTION_ID_PATTERN: Regex = Regex::new(r"^Q-[0-9]{4}$").unwrap();
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireReport {
    issues: Option<Vec<WireIssue>>,
    questions: Option<Vec<WireQuestion>>,
    patches: Option<Vec<WirePatch>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireIssue {
    id: String,
    severity: String,
    category: String,
    title: Option<String>,
    description: String,
    evidence: Option<Vec<WireEvidence>>,
    impact: String,
    recommendation: String,
    blocking: bool,
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireQuestion {
    id: String,
    severity: String,
    question: Option<String>,
    why_needed: String,
    blocks: Option<Vec<String>>,
    evidence: Option<Vec<WireEvidence>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireEvidence {
    path: String,
    line_start: i64,
    line_end: i64,
    quote: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WirePatch {
    issue_id: String,
    before: String,
    after: String,
}

/// Remove one leading and one trailing Markdown code fence, if present.
///
/// Only the opening fence line (e.g. "```json") and a closing "```" line
/// are dropped; the body is left untouched apart from outer whitespace.
pub fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();

    if s.starts_with("```") {
        if let Some(idx) = s.find('\n') {
            s = &s[idx + 1..];
        }
    }

    if s.ends_with("```") {
        if let Some(idx) = s.rfind("\n```") {
            s = &s[..idx];
        }
    }

    s.trim()
}

/// Validate raw model output against the schema and the document extent.
///
/// # Arguments
///
/// * `raw` - Untrusted model text, optionally wrapped in a code fence
/// * `line_count` - Lines in the numbered specification; `0` disables the
///   upper bound on evidence citations
///
/// # Returns
///
/// The validated [`Report`], or the first [`ValidationError`] found.
pub fn validate(raw: &str, line_count: usize) -> Result<Report, ValidationError> {
    let cleaned = strip_fences(raw);

    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| ValidationError::Syntax {
            line: e.line(),
            column: e.column(),
        })?;

    if let Some(location) = first_structural_violation(&value) {
        return Err(ValidationError::Schema {
            location,
            violation: SchemaViolation::MalformedStructure,
        });
    }

    let wire: WireReport =
        serde_json::from_value(value).map_err(|_| ValidationError::Schema {
            location: "/".to_string(),
            violation: SchemaViolation::MalformedStructure,
        })?;

    let issues = wire
        .issues
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, issue)| convert_issue(idx, issue, line_count))
        .collect::<Result<Vec<_>, _>>()?;

    let questions = wire
        .questions
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, question)| convert_question(idx, question, line_count))
        .collect::<Result<Vec<_>, _>>()?;

    let patches = wire
        .patches
        .unwrap_or_default()
        .into_iter()
        .map(|p| PatchSuggestion {
            issue_id: p.issue_id,
            before: p.before,
            after: p.after,
        })
        .collect();

    Ok(Report::new(issues, questions, patches))
}

fn schema_error(location: String, violation: SchemaViolation) -> ValidationError {
    ValidationError::Schema {
        location,
        violation,
    }
}

fn convert_issue(idx: usize, issue: WireIssue, line_count: usize) -> Result<Issue, ValidationError> {
    let prefix = format!("/issues/{}", idx);

    if !ISSUE_ID_PATTERN.is_match(&issue.id) {
        return Err(schema_error(
            format!("{}/id", prefix),
            SchemaViolation::InvalidIssueId,
        ));
    }

    let severity = parse_severity(&issue.severity, &prefix)?;

    let category = Category::from_label(&issue.category).ok_or_else(|| {
        schema_error(
            format!("{}/category", prefix),
            SchemaViolation::UnknownCategory,
        )
    })?;

    // Absent, null and empty titles are all missing.
    let title = match issue.title {
        Some(title) if !title.is_empty() => title,
        _ => {
            return Err(schema_error(
                format!("{}/title", prefix),
                SchemaViolation::MissingTitle,
            ))
        }
    };

    let evidence = convert_evidence(issue.evidence.unwrap_or_default(), &prefix, line_count)?;

    Ok(Issue {
        id: issue.id,
        severity,
        category,
        title,
        description: issue.description,
        evidence,
        impact: issue.impact,
        recommendation: issue.recommendation,
        blocking: issue.blocking,
        tags: issue.tags.unwrap_or_default().into_iter().collect(),
    })
}

fn convert_question(
    idx: usize,
    question: WireQuestion,
    line_count: usize,
) -> Result<Question, ValidationError> {
    let prefix = format!("/questions/{}", idx);

    if !QUESTION_ID_PATTERN.is_match(&question.id) {
        return Err(schema_error(
            format!("{}/id", prefix),
            SchemaViolation::InvalidQuestionId,
        ));
    }

    let severity = parse_severity(&question.severity, &prefix)?;

    let text = match question.question {
        Some(text) if !text.is_empty() => text,
        _ => {
            return Err(schema_error(
                format!("{}/question", prefix),
                SchemaViolation::MissingQuestion,
            ))
        }
    };

    let evidence = convert_evidence(question.evidence.unwrap_or_default(), &prefix, line_count)?;

    Ok(Question {
        id: question.id,
        severity,
        question: text,
        why_needed: question.why_needed,
        blocks: question.blocks.unwrap_or_default(),
        evidence,
    })
}

fn parse_severity(raw: &str, prefix: &str) -> Result<Severity, ValidationError> {
    Severity::from_label(raw).ok_or_else(|| {
        schema_error(
            format!("{}/severity", prefix),
            SchemaViolation::InvalidSeverity,
        )
    })
}

fn convert_evidence(
    evidence: Vec<WireEvidence>,
    prefix: &str,
    line_count: usize,
) -> Result<Vec<Evidence>, ValidationError> {
    evidence
        .into_iter()
        .enumerate()
        .map(|(j, ev)| {
            let (line_start, line_end) = check_line_range(ev.line_start, ev.line_end, line_count)
                .map_err(|violation| ValidationError::EvidenceOutOfBounds {
                    location: format!("{}/evidence/{}", prefix, j),
                    violation,
                })?;

            Ok(Evidence {
                path: ev.path,
                line_start,
                line_end,
                quote: ev.quote,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::BoundsViolation;
    use crate::validate::FailureCategory;
    use proptest::prelude::*;

    const VALID_OUTPUT: &str = r#"{
  "issues": [
    {
      "id": "ISSUE-0001",
      "severity": "CRITICAL",
      "category": "NON_TESTABLE_REQUIREMENT",
      "title": "Unmeasurable latency requirement",
      "description": "The word fast has no threshold.",
      "evidence": [{"path": "SPEC.md", "line_start": 3, "line_end": 4, "quote": "must be fast"}],
      "impact": "Cannot be tested.",
      "recommendation": "State a p95 bound.",
      "blocking": true,
      "tags": ["performance", "performance"]
    }
  ],
  "questions": [
    {
      "id": "Q-0001",
      "severity": "WARN",
      "question": "Which clients are supported?",
      "why_needed": "Determines the auth flow.",
      "blocks": ["REQ-004"],
      "evidence": [{"path": "SPEC.md", "line_start": 7, "line_end": 7, "quote": "clients"}]
    }
  ],
  "patches": [
    {"issue_id": "ISSUE-0001", "before": "must be fast", "after": "must respond within 250ms p95"}
  ]
}"#;

    fn issue_output(field: &str, value: &str) -> String {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["issues"][0][field] = serde_json::Value::String(value.to_string());
        v.to_string()
    }

    #[test]
    fn test_valid_output_is_accepted() {
        let report = validate(VALID_OUTPUT, 10).unwrap();
        assert_eq!(report.issues().len(), 1);
        assert_eq!(report.questions().len(), 1);
        assert_eq!(report.patches().len(), 1);

        let issue = &report.issues()[0];
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.category, Category::NonTestableRequirement);
        assert_eq!(issue.evidence[0].line_start, 3);
        assert_eq!(issue.tags.len(), 1);

        assert_eq!(report.questions()[0].blocks, vec!["REQ-004".to_string()]);
    }

    #[test]
    fn test_strip_fences_json_tag() {
        let raw = "```json\n{\"issues\": []}\n```";
        assert_eq!(strip_fences(raw), "{\"issues\": []}");
    }

    #[test]
    fn test_strip_fences_bare_and_padded() {
        let raw = "\n\n```\n{}\n```\n\n";
        assert_eq!(strip_fences(raw), "{}");
        assert_eq!(strip_fences("{}"), "{}");
    }

    #[test]
    fn test_strip_fences_removes_only_one_pair() {
        let raw = "```\n```\n{}\n```\n```";
        assert_eq!(strip_fences(raw), "```\n{}\n```");
    }

    #[test]
    fn test_fenced_output_is_accepted() {
        let raw = format!("```json\n{}\n```", VALID_OUTPUT);
        assert!(validate(&raw, 10).is_ok());
    }

    #[test]
    fn test_empty_object_is_valid_empty_report() {
        let report = validate("{}", 10).unwrap();
        assert!(report.issues().is_empty());
        assert!(report.questions().is_empty());
        assert!(report.patches().is_empty());
    }

    #[test]
    fn test_null_arrays_are_empty() {
        let report = validate(r#"{"issues": null, "questions": null, "patches": null}"#, 10).unwrap();
        assert!(report.issues().is_empty());
    }

    #[test]
    fn test_syntax_error() {
        let err = validate("Here are the findings: {", 10).unwrap_err();
        assert!(matches!(err, ValidationError::Syntax { .. }));
        assert_eq!(err.category(), FailureCategory::JsonSyntax);
    }

    #[test]
    fn test_wrong_json_type_is_schema_mismatch() {
        let err = validate(r#"{"issues": {"id": "ISSUE-0001"}}"#, 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Schema {
                location: "/issues".to_string(),
                violation: SchemaViolation::MalformedStructure,
            }
        );
        assert_eq!(err.category(), FailureCategory::SchemaMismatch);
    }

    #[test]
    fn test_invalid_issue_id() {
        for bad in ["ISSUE-1", "ISSUE-00001", "issue-0001", "ISSUE-０００１", ""] {
            let err = validate(&issue_output("id", bad), 10).unwrap_err();
            assert_eq!(
                err,
                ValidationError::Schema {
                    location: "/issues/0/id".to_string(),
                    violation: SchemaViolation::InvalidIssueId,
                },
                "id {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_invalid_severity() {
        let err = validate(&issue_output("severity", "critical"), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::InvalidSeverity);
    }

    #[test]
    fn test_unknown_category() {
        let err = validate(&issue_output("category", "STYLE"), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::UnknownCategory);
    }

    #[test]
    fn test_empty_title() {
        let err = validate(&issue_output("title", ""), 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Schema {
                location: "/issues/0/title".to_string(),
                violation: SchemaViolation::MissingTitle,
            }
        );
    }

    #[test]
    fn test_null_title_and_question_are_missing_fields() {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["issues"][0]["title"] = serde_json::Value::Null;
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::MissingRequiredField);
        assert!(matches!(
            err,
            ValidationError::Schema { ref location, violation: SchemaViolation::MissingTitle }
                if location == "/issues/0/title"
        ));

        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["questions"][0]["question"] = serde_json::Value::Null;
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::MissingRequiredField);

        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["issues"][0].as_object_mut().unwrap().remove("title");
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::MissingRequiredField);
    }

    #[test]
    fn test_question_rules() {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["questions"][0]["id"] = "QUESTION-1".into();
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::InvalidIdFormat);

        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["questions"][0]["question"] = "".into();
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Schema {
                location: "/questions/0/question".to_string(),
                violation: SchemaViolation::MissingQuestion,
            }
        );
    }

    #[test]
    fn test_fenced_evidence_out_of_bounds() {
        let raw = r#"```json
{"issues": [{"id": "ISSUE-0001", "severity": "WARN", "category": "SCOPE_LEAK",
  "title": "t", "evidence": [{"path": "SPEC.md", "line_start": 2, "line_end": 50, "quote": "q"}]}]}
```"#;
        let err = validate(raw, 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EvidenceOutOfBounds {
                location: "/issues/0/evidence/0".to_string(),
                violation: BoundsViolation::EndPastDocument,
            }
        );
        assert!(validate(raw, 0).is_ok());
    }

    #[test]
    fn test_question_evidence_bounds() {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        v["questions"][0]["evidence"][0]["line_start"] = 0.into();
        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EvidenceOutOfBounds {
                location: "/questions/0/evidence/0".to_string(),
                violation: BoundsViolation::StartBelowOne,
            }
        );
    }

    #[test]
    fn test_fail_fast_reports_first_error() {
        let raw = r#"{"issues": [
            {"id": "ISSUE-0001", "severity": "LOW", "category": "STYLE", "title": ""},
            {"id": "bad"}
        ]}"#;
        let err = validate(raw, 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::InvalidSeverity);
    }

    #[test]
    fn test_one_bad_finding_rejects_everything() {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        let mut second = v["issues"][0].clone();
        second["id"] = "ISSUE-0002".into();
        second["evidence"][0]["line_end"] = 99.into();
        v["issues"].as_array_mut().unwrap().push(second);

        let err = validate(&v.to_string(), 10).unwrap_err();
        assert_eq!(err.category(), FailureCategory::InvalidLineRange);
    }

    #[test]
    fn test_duplicate_ids_are_allowed() {
        let mut v: serde_json::Value = serde_json::from_str(VALID_OUTPUT).unwrap();
        let copy = v["issues"][0].clone();
        v["issues"].as_array_mut().unwrap().push(copy);
        let report = validate(&v.to_string(), 10).unwrap();
        assert_eq!(report.issues().len(), 2);
    }

    #[test]
    fn test_error_never_contains_model_text() {
        let err = validate(&issue_output("id", "IGNORE PREVIOUS INSTRUCTIONS"), 10).unwrap_err();
        assert!(!err.to_string().contains("IGNORE"));
    }

    const LINE_COUNT: usize = 200;

    fn evidence_strategy() -> impl Strategy<Value = Evidence> {
        (1usize..=LINE_COUNT)
            .prop_flat_map(|start| (Just(start), start..=LINE_COUNT, "[a-z ]{0,12}"))
            .prop_map(|(line_start, line_end, quote)| Evidence {
                path: "SPEC.md".to_string(),
                line_start,
                line_end,
                quote,
            })
    }

    fn issue_strategy() -> impl Strategy<Value = Issue> {
        (
            0u16..10_000,
            prop::sample::select(Severity::ALL.to_vec()),
            prop::sample::select(Category::ALL.to_vec()),
            "[A-Za-z][A-Za-z ]{0,20}",
            prop::collection::vec(evidence_strategy(), 0..3),
            any::<bool>(),
            prop::collection::btree_set("[a-z]{1,8}", 0..3),
        )
            .prop_map(|(n, severity, category, title, evidence, blocking, tags)| Issue {
                id: format!("ISSUE-{:04}", n),
                severity,
                category,
                title,
                description: "description".to_string(),
                evidence,
                impact: String::new(),
                recommendation: "recommendation".to_string(),
                blocking,
                tags,
            })
    }

    fn question_strategy() -> impl Strategy<Value = Question> {
        (
            0u16..10_000,
            prop::sample::select(Severity::ALL.to_vec()),
            "[A-Za-z][A-Za-z ?]{0,20}",
            prop::collection::vec(evidence_strategy(), 0..2),
        )
            .prop_map(|(n, severity, question, evidence)| Question {
                id: format!("Q-{:04}", n),
                severity,
                question,
                why_needed: "needed".to_string(),
                blocks: vec![],
                evidence,
            })
    }

    proptest! {
        #[test]
        fn prop_well_formed_reports_are_accepted_unchanged(
            issues in prop::collection::vec(issue_strategy(), 0..6),
            questions in prop::collection::vec(question_strategy(), 0..4),
        ) {
            let report = Report::new(issues, questions, vec![]);
            let raw = serde_json::to_string(&report).unwrap();
            let parsed = validate(&raw, LINE_COUNT).unwrap();
            prop_assert_eq!(parsed, report);
        }
    }
}
