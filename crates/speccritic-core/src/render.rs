//! JSON and Markdown views of a [`ReviewReport`].

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use crate::evidence::Evidence;
use crate::types::ReviewReport;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("serializing report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rendering markdown: {0}")]
    Markdown(#[from] std::fmt::Error),
}

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "md" => Ok(OutputFormat::Markdown),
            other => Err(format!(
                "unknown format {:?}: supported formats are json, md",
                other
            )),
        }
    }
}

impl OutputFormat {
    pub fn render(self, report: &ReviewReport) -> Result<String, RenderError> {
        match self {
            OutputFormat::Json => render_json(report),
            OutputFormat::Markdown => render_markdown(report),
        }
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn render_json(report: &ReviewReport) -> Result<String, RenderError> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

pub fn render_markdown(report: &ReviewReport) -> Result<String, RenderError> {
    let mut out = String::new();
    let summary = &report.summary;

    writeln!(out, "# SpecCritic Report\n")?;
    writeln!(out, "**Verdict:** {}", summary.verdict)?;
    writeln!(out, "**Score:** {}/100", summary.score)?;
    writeln!(
        out,
        "**Critical:** {} | **Warn:** {} | **Info:** {}",
        summary.critical_count, summary.warn_count, summary.info_count
    )?;
    writeln!(
        out,
        "> Note: counts reflect all findings; --severity-threshold may hide some from this output."
    )?;

    if !report.issues.is_empty() {
        writeln!(out, "\n---\n\n## Issues")?;
        for issue in &report.issues {
            writeln!(
                out,
                "\n### {} · {} · {}",
                issue.id, issue.severity, issue.category
            )?;
            writeln!(out, "**{}**\n", issue.title)?;
            writeln!(out, "{}", issue.description)?;
            write_evidence(&mut out, &issue.evidence)?;
            writeln!(out, "\n**Impact:** {}", issue.impact)?;
            writeln!(out, "**Recommendation:** {}", issue.recommendation)?;
        }
    }

    if !report.questions.is_empty() {
        writeln!(out, "\n---\n\n## Clarification Questions")?;
        for question in &report.questions {
            writeln!(out, "\n### {} · {}", question.id, question.severity)?;
            writeln!(out, "{}\n", question.question)?;
            writeln!(out, "*Why needed:* {}", question.why_needed)?;
            if !question.blocks.is_empty() {
                writeln!(out, "*Blocks:* {}", question.blocks.join(", "))?;
            }
            write_evidence(&mut out, &question.evidence)?;
        }
    }

    if !report.patches.is_empty() {
        writeln!(out, "\n---\n\n## Suggested Patches")?;
        for patch in &report.patches {
            writeln!(
                out,
                "\n**{}** (see --patch-out for machine-applicable diff)\n",
                patch.issue_id
            )?;
            writeln!(out, "Before:\n```\n{}\n```", patch.before)?;
            writeln!(out, "After:\n```\n{}\n```", patch.after)?;
        }
    }

    writeln!(out, "\n---")?;
    writeln!(
        out,
        "*Model: {} | Temperature: {} | Attempts: {}*",
        report.meta.model, report.meta.temperature, report.meta.attempts
    )?;

    Ok(out)
}

fn write_evidence(out: &mut String, evidence: &[Evidence]) -> std::fmt::Result {
    for ev in evidence {
        writeln!(
            out,
            "\n> {} L{}-{}: {:?}",
            ev.path, ev.line_start, ev.line_end, ev.quote
        )?;
    }
    Ok(())
}
