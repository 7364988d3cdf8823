//! JSON Schema check for the structural shape of model output.
//!
//! Validated against schema/report.schema.json. The schema only pins JSON
//! types (arrays, objects, strings, integers); ID formats, enum values and
//! line bounds are checked by the parser so each failure has a fixed
//! category.

use std::sync::OnceLock;

/// Embedded output schema (loaded at compile time).
const REPORT_SCHEMA_JSON: &str = include_str!("../../../../schema/report.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(REPORT_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Find the first structural violation in a parsed output document.
///
/// Returns the JSON pointer of the offending value. Only the location is
/// reported: schema error messages embed instance values, which are
/// model-generated and must not travel further.
pub(crate) fn first_structural_violation(output: &serde_json::Value) -> Option<String> {
    let validator = match get_validator() {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Output schema unavailable");
            return Some("/".to_string());
        }
    };

    validator
        .iter_errors(output)
        .next()
        .map(|e| {
            let pointer = e.instance_path.to_string();
            if pointer.is_empty() {
                "/".to_string()
            } else {
                pointer
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_compiles() {
        assert!(get_validator().is_ok());
    }

    #[test]
    fn test_well_formed_output_passes() {
        let value = serde_json::json!({
            "issues": [{
                "id": "ISSUE-0001",
                "severity": "WARN",
                "category": "SCOPE_LEAK",
                "title": "t",
                "evidence": [{"path": "SPEC.md", "line_start": 1, "line_end": 2, "quote": "q"}],
                "blocking": false,
                "tags": []
            }],
            "questions": null,
            "patches": []
        });
        assert_eq!(first_structural_violation(&value), None);
    }

    #[test]
    fn test_missing_fields_are_left_to_the_parser() {
        let value = serde_json::json!({ "issues": [{}] });
        assert_eq!(first_structural_violation(&value), None);
    }

    #[test]
    fn test_null_title_and_question_pass_structure() {
        let value = serde_json::json!({
            "issues": [{"id": "ISSUE-0001", "title": null}],
            "questions": [{"id": "Q-0001", "question": null}]
        });
        assert_eq!(first_structural_violation(&value), None);
    }

    #[test]
    fn test_wrong_type_reports_pointer() {
        let value = serde_json::json!({
            "issues": [{
                "id": "ISSUE-0001",
                "evidence": [{"line_start": "ten", "line_end": 12}]
            }]
        });
        assert_eq!(
            first_structural_violation(&value).as_deref(),
            Some("/issues/0/evidence/0/line_start")
        );
    }

    #[test]
    fn test_top_level_must_be_object() {
        let value = serde_json::json!([1, 2, 3]);
        assert_eq!(first_structural_violation(&value).as_deref(), Some("/"));
    }
}
