//! Built-in review profiles.
//!
//! A profile adds domain rules to the system prompt: sections the document
//! must contain, vague phrases to flag, invariants for the domain, and the
//! categories the reviewer should pay extra attention to.

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::Category;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("unknown profile {0:?}: valid profiles are general, backend-api, regulated-system, event-driven")]
    Unknown(String),
}

/// A named set of review rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub required_sections: &'static [&'static str],
    pub forbidden_phrases: &'static [&'static str],
    pub domain_invariants: &'static [&'static str],
    pub emphasized_categories: &'static [Category],
}

const GENERAL: Profile = Profile {
    name: "general",
    required_sections: &[],
    forbidden_phrases: &[
        "as needed",
        "as appropriate",
        "TBD",
        "to be determined",
        "fast",
        "quickly",
        "efficiently",
        "reasonable",
        "acceptable",
        "etc.",
        "and so on",
        "handle errors appropriately",
    ],
    domain_invariants: &[
        "Every requirement must be verifiable by a test or inspection",
        "All failure modes must be explicitly stated",
        "Interfaces between components must be fully defined",
    ],
    emphasized_categories: &[],
};

const BACKEND_API: Profile = Profile {
    name: "backend-api",
    required_sections: &["Authentication", "Error Codes", "Rate Limiting"],
    forbidden_phrases: &["as needed", "as appropriate", "TBD", "fast", "quickly"],
    domain_invariants: &[
        "Every endpoint must define its request and response schemas",
        "All error codes must be enumerated with their conditions",
        "Authentication requirements must be stated per endpoint",
        "Rate limits must be expressed as numeric values with time windows",
    ],
    emphasized_categories: &[Category::UndefinedInterface, Category::MissingFailureMode],
};

const REGULATED_SYSTEM: Profile = Profile {
    name: "regulated-system",
    required_sections: &["Audit Trail", "Data Retention", "Access Control"],
    forbidden_phrases: &[
        "as needed",
        "as appropriate",
        "TBD",
        "reasonable period",
        "periodically",
        "eventually",
    ],
    domain_invariants: &[
        "Audit trail requirements must be explicit and enumerated",
        "Data retention periods must be stated as concrete durations (e.g. 7 years)",
        "Every state transition must be enumerable and auditable",
        "Rollback behavior must be defined for every mutating operation",
    ],
    emphasized_categories: &[
        Category::MissingInvariant,
        Category::MissingFailureMode,
        Category::OrderingUndefined,
    ],
};

const EVENT_DRIVEN: Profile = Profile {
    name: "event-driven",
    required_sections: &["Event Schema", "Delivery Guarantees", "Consumer Failure"],
    forbidden_phrases: &[
        "as needed",
        "eventually consistent",
        "best effort",
        "usually",
        "typically",
    ],
    domain_invariants: &[
        "Every event type must have defined ordering guarantees, or explicitly state that ordering is not guaranteed",
        "At-least-once vs exactly-once delivery semantics must be stated per event type",
        "Consumer failure modes and retry policies must be specified",
        "Schema evolution strategy (backward/forward compatibility) must be present",
    ],
    emphasized_categories: &[
        Category::OrderingUndefined,
        Category::MissingFailureMode,
        Category::UnspecifiedConstraint,
    ],
};

impl Profile {
    /// Every built-in profile.
    pub const ALL: [&'static Profile; 4] = [&GENERAL, &BACKEND_API, &REGULATED_SYSTEM, &EVENT_DRIVEN];

    /// Look up a built-in profile. An empty name selects `general`.
    pub fn get(name: &str) -> Result<&'static Profile, ProfileError> {
        if name.is_empty() {
            return Ok(&GENERAL);
        }
        Self::ALL
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    /// Rules block for the system prompt. Empty when the profile has no rules.
    pub fn format_rules_for_prompt(&self) -> String {
        if self.required_sections.is_empty()
            && self.forbidden_phrases.is_empty()
            && self.domain_invariants.is_empty()
        {
            return String::new();
        }

        let mut out = format!("Profile: {}\n", self.name);

        if !self.required_sections.is_empty() {
            out.push_str("\nRequired sections (flag MISSING_INVARIANT if absent):\n");
            for section in self.required_sections {
                let _ = writeln!(out, "- {}", section);
            }
        }

        if !self.forbidden_phrases.is_empty() {
            out.push_str(
                "\nForbidden vague phrases (flag NON_TESTABLE_REQUIREMENT or AMBIGUOUS_BEHAVIOR if present):\n",
            );
            for phrase in self.forbidden_phrases {
                let _ = writeln!(out, "- {:?}", phrase);
            }
        }

        if !self.domain_invariants.is_empty() {
            out.push_str("\nDomain invariants (flag MISSING_INVARIANT if violated):\n");
            for invariant in self.domain_invariants {
                let _ = writeln!(out, "- {}", invariant);
            }
        }

        if !self.emphasized_categories.is_empty() {
            out.push_str("\nGive particular attention to these categories:\n");
            for category in self.emphasized_categories {
                let _ = writeln!(out, "- {}", category);
            }
        }

        out
    }
}
