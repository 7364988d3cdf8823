//! Patch anchoring: locating suggested edits in the real document.
//!
//! A suggestion is only turned into a diff once its `before` text has
//! been found in the source, first verbatim and then after whitespace
//! normalization. Suggestions that cannot be anchored are reported as
//! skips and never fail the review.

use std::fmt;

use serde::Serialize;
use similar::TextDiff;

use crate::types::PatchSuggestion;

/// Context lines around each change in the unified diff.
const CONTEXT_RADIUS: usize = 3;

/// How a suggestion was located in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    /// `before` occurs verbatim in the original text
    Exact,
    /// `before` occurs only after CRLF and trailing-whitespace normalization
    Normalized,
}

/// A suggestion whose `before` text was found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPatch {
    pub issue_id: String,
    pub before: String,
    pub after: String,
    pub anchor: AnchorKind,
}

impl ResolvedPatch {
    /// Unified diff from `before` to `after`, or `None` when there is no change.
    pub fn unified_diff(&self) -> Option<String> {
        if self.before == self.after {
            return None;
        }

        let diff = TextDiff::from_lines(self.before.as_str(), self.after.as_str())
            .unified_diff()
            .context_radius(CONTEXT_RADIUS)
            .header(
                &format!("a/{}", self.issue_id),
                &format!("b/{}", self.issue_id),
            )
            .to_string();

        if diff.is_empty() {
            None
        } else {
            Some(diff)
        }
    }
}

/// A suggestion that could not be anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPatch {
    pub issue_id: String,
}

impl fmt::Display for SkippedPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "patch for {} could not be located in spec (before text not matched)",
            self.issue_id
        )
    }
}

/// Outcome of anchoring every suggestion of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchSet {
    pub resolved: Vec<ResolvedPatch>,
    pub skipped: Vec<SkippedPatch>,
}

impl PatchSet {
    /// Concatenated patch file text, one `# patch for ISSUE-XXXX` block per
    /// non-empty diff, in suggestion order. Empty when nothing applies.
    pub fn to_patch_text(&self) -> String {
        let mut out = String::new();

        for patch in &self.resolved {
            let Some(diff) = patch.unified_diff() else {
                continue;
            };

            out.push_str(&format!("# patch for {}\n", patch.issue_id));
            out.push_str(&diff);
            if !diff.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

/// Anchor every suggestion against `source`.
///
/// `source` is the text the patch will be applied to (the redacted raw
/// document, not the line-numbered view).
pub fn anchor_all(source: &str, suggestions: &[PatchSuggestion]) -> PatchSet {
    let mut set = PatchSet::default();
    if suggestions.is_empty() {
        return set;
    }

    let normalized_source = normalize(source);

    for suggestion in suggestions {
        match anchor(source, &normalized_source, suggestion) {
            Some(resolved) => set.resolved.push(resolved),
            None => set.skipped.push(SkippedPatch {
                issue_id: suggestion.issue_id.clone(),
            }),
        }
    }

    set
}

fn anchor(
    source: &str,
    normalized_source: &str,
    suggestion: &PatchSuggestion,
) -> Option<ResolvedPatch> {
    // An empty `before` is a substring of every document, so a plain
    // containment check would accept it. It anchors nothing, so it is
    // reported as skipped rather than applied.
    if suggestion.before.is_empty() {
        return None;
    }

    if source.contains(&suggestion.before) {
        return Some(ResolvedPatch {
            issue_id: suggestion.issue_id.clone(),
            before: suggestion.before.clone(),
            after: suggestion.after.clone(),
            anchor: AnchorKind::Exact,
        });
    }

    let before = normalize(&suggestion.before);
    if before.is_empty() || !normalized_source.contains(&before) {
        return None;
    }

    Some(ResolvedPatch {
        issue_id: suggestion.issue_id.clone(),
        before,
        after: normalize(&suggestion.after),
        anchor: AnchorKind::Normalized,
    })
}

/// Convert CRLF to LF and trim trailing spaces and tabs from every line.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "# Spec\n\nThe service must be fast.   \nUsers log in with a password.\r\nSessions expire.\n";

    fn suggestion(id: &str, before: &str, after: &str) -> PatchSuggestion {
        PatchSuggestion {
            issue_id: id.to_string(),
            before: before.to_string(),
            after: after.to_string(),
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a  \r\nb\t\nc"), "a\nb\nc");
        assert_eq!(normalize("  lead stays"), "  lead stays");
    }

    #[test]
    fn test_exact_match_keeps_original_text() {
        let set = anchor_all(
            SOURCE,
            &[suggestion("ISSUE-0001", "Sessions expire.", "Sessions expire after 30 minutes.")],
        );
        assert_eq!(set.resolved.len(), 1);
        assert!(set.skipped.is_empty());
        assert_eq!(set.resolved[0].anchor, AnchorKind::Exact);
        assert_eq!(set.resolved[0].before, "Sessions expire.");
    }

    #[test]
    fn test_normalized_match_uses_normalized_text() {
        // Source has trailing spaces and a CRLF; the suggestion does not.
        let before = "The service must be fast.\nUsers log in with a password.";
        let after = "The service must respond within 200ms p95.   \nUsers log in with a password.";
        let set = anchor_all(SOURCE, &[suggestion("ISSUE-0002", before, after)]);

        assert_eq!(set.resolved.len(), 1);
        let patch = &set.resolved[0];
        assert_eq!(patch.anchor, AnchorKind::Normalized);
        assert_eq!(patch.before, before);
        assert_eq!(
            patch.after,
            "The service must respond within 200ms p95.\nUsers log in with a password."
        );

        let text = set.to_patch_text();
        assert!(text.starts_with("# patch for ISSUE-0002\n"));
        assert!(text.contains("-The service must be fast."));
        assert!(text.contains("+The service must respond within 200ms p95."));
    }

    #[test]
    fn test_unmatched_before_is_skipped() {
        let set = anchor_all(
            SOURCE,
            &[suggestion("ISSUE-0003", "The system shall scale.", "anything")],
        );
        assert!(set.resolved.is_empty());
        assert_eq!(
            set.skipped,
            vec![SkippedPatch {
                issue_id: "ISSUE-0003".to_string()
            }]
        );
        assert_eq!(set.to_patch_text(), "");
        assert!(set.skipped[0].to_string().contains("ISSUE-0003"));
    }

    #[test]
    fn test_empty_before_is_skipped() {
        assert!(SOURCE.contains(""));
        let set = anchor_all(SOURCE, &[suggestion("ISSUE-0004", "", "New text")]);
        assert!(set.resolved.is_empty());
        assert_eq!(set.skipped.len(), 1);
        assert_eq!(set.to_patch_text(), "");
    }

    #[test]
    fn test_identical_before_after_emits_no_hunk() {
        let set = anchor_all(
            SOURCE,
            &[suggestion("ISSUE-0005", "Sessions expire.", "Sessions expire.")],
        );
        assert_eq!(set.resolved.len(), 1);
        assert!(set.skipped.is_empty());
        assert_eq!(set.to_patch_text(), "");
    }

    #[test]
    fn test_whitespace_only_change_is_empty_after_normalization() {
        let set = anchor_all(
            SOURCE,
            &[suggestion(
                "ISSUE-0006",
                "The service must be fast.\n",
                "The service must be fast.  \n",
            )],
        );
        assert_eq!(set.resolved[0].anchor, AnchorKind::Normalized);
        assert_eq!(set.to_patch_text(), "");
    }

    #[test]
    fn test_hunks_follow_suggestion_order() {
        let set = anchor_all(
            SOURCE,
            &[
                suggestion("ISSUE-0009", "Sessions expire.", "Sessions expire after 1h."),
                suggestion("ISSUE-0010", "missing text", "x"),
                suggestion("ISSUE-0001", "# Spec", "# Login Spec"),
            ],
        );
        let text = set.to_patch_text();
        let first = text.find("# patch for ISSUE-0009").unwrap();
        let second = text.find("# patch for ISSUE-0001").unwrap();
        assert!(first < second);
        assert!(!text.contains("ISSUE-0010"));
        assert_eq!(set.skipped.len(), 1);
    }

    #[test]
    fn test_no_suggestions() {
        assert_eq!(anchor_all(SOURCE, &[]), PatchSet::default());
    }
}
