//! Review orchestrator.
//!
//! Runs one review end to end:
//! - Redact the specification and build prompts
//! - Resolve a validated report (at most one repair)
//! - Score from the unfiltered report, then filter the displayed issues
//! - Anchor patch suggestions against the redacted text

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use speccritic_core::{
    anchor_all, filter_by_severity, ContextFile, DocumentError, FailureCategory, Input, Meta,
    PatchSet, Profile, ProfileError, Report, ReviewReport, SourceDocument, Synthesizer, TOOL_NAME,
    VERSION,
};

use crate::config::{ConfigError, ReviewConfig, DEFAULT_MODEL};
use crate::prompts::{build_system_prompt, build_user_prompt};
use crate::providers::{LlmProvider, ProviderError, TokenUsage};
use crate::repair::{Attempt, CancelSignal, RepairOrchestrator, ResolveError};

/// Errors surfaced to callers of a review.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Bad flags, config, profile, or unreadable input files.
    #[error("{0}")]
    InputConfiguration(String),

    /// Transport failure. `attempt` is `None` when the provider could not
    /// be constructed at all.
    #[error("provider error: {source}")]
    Provider {
        attempt: Option<Attempt>,
        #[source]
        source: ProviderError,
    },

    #[error("model output invalid after repair attempt: {category}")]
    ModelOutputInvalid { category: FailureCategory },
}

impl From<ConfigError> for ReviewError {
    fn from(err: ConfigError) -> Self {
        ReviewError::InputConfiguration(err.to_string())
    }
}

impl From<DocumentError> for ReviewError {
    fn from(err: DocumentError) -> Self {
        ReviewError::InputConfiguration(err.to_string())
    }
}

impl From<ProfileError> for ReviewError {
    fn from(err: ProfileError) -> Self {
        ReviewError::InputConfiguration(err.to_string())
    }
}

impl From<ProviderError> for ReviewError {
    fn from(source: ProviderError) -> Self {
        ReviewError::Provider {
            attempt: None,
            source,
        }
    }
}

impl From<ResolveError> for ReviewError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Provider { attempt, source } => ReviewError::Provider {
                attempt: Some(attempt),
                source,
            },
            ResolveError::ModelOutputInvalid { category, .. } => {
                ReviewError::ModelOutputInvalid { category }
            }
        }
    }
}

/// What to review.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    /// The specification as read from disk; redacted before use.
    pub document: SourceDocument,

    /// Already redacted by [`ContextFile::load_all`].
    pub context: Vec<ContextFile>,
}

/// The exact prompts sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

/// Result of a successful review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// Output document with the filtered issue view.
    pub report: ReviewReport,

    /// Everything the validator accepted.
    pub validated: Report,

    pub patches: PatchSet,

    pub usage: TokenUsage,
}

/// Runs reviews against one provider and configuration.
pub struct ReviewOrchestrator {
    repair: RepairOrchestrator,
    config: ReviewConfig,
    synthesizer: Synthesizer,
}

impl ReviewOrchestrator {
    /// Create an orchestrator. Fails if the configuration is out of range.
    pub fn new(provider: Arc<dyn LlmProvider>, config: ReviewConfig) -> Result<Self, ReviewError> {
        config.validate()?;
        if config.uses_default_model() {
            tracing::warn!(model = DEFAULT_MODEL, "SPECCRITIC_MODEL not set, using default");
        }
        let model = config.model_spec()?;
        let completion = config.completion_config(&model);

        Ok(Self {
            repair: RepairOrchestrator::new(provider, completion),
            config,
            synthesizer: Synthesizer::new(),
        })
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Build the prompts for an input without calling the model.
    pub fn prompts(&self, input: &ReviewInput) -> Result<Prompts, ReviewError> {
        let profile = Profile::get(&self.config.profile)?;
        Ok(build_prompts(profile, self.config.strict, &input.document.redacted(), &input.context))
    }

    /// Review a specification.
    ///
    /// # Execution Flow
    /// 1. Redact the document and build prompts
    /// 2. Resolve a validated report, repairing once if needed
    /// 3. Compute the summary from every validated issue
    /// 4. Filter displayed issues by the severity threshold
    /// 5. Anchor patches against the redacted text
    pub async fn review(
        &self,
        input: &ReviewInput,
        cancel: &CancelSignal,
    ) -> Result<ReviewOutcome, ReviewError> {
        let profile = Profile::get(&self.config.profile)?;
        let doc = input.document.redacted();
        let prompts = build_prompts(profile, self.config.strict, &doc, &input.context);

        let resolved = self
            .repair
            .resolve(&prompts.system, &prompts.user, doc.line_count, cancel)
            .await?;

        let summary = self.synthesizer.synthesize(&resolved.report);
        let issues = filter_by_severity(resolved.report.issues(), self.config.severity_threshold);

        let patches = anchor_all(&doc.raw, resolved.report.patches());
        if !patches.skipped.is_empty() {
            tracing::warn!(
                skipped = patches.skipped.len(),
                resolved = patches.resolved.len(),
                "Some patch suggestions could not be located in the spec"
            );
        }

        tracing::info!(
            verdict = summary.verdict.as_str(),
            score = summary.score,
            shown = issues.len(),
            total = resolved.report.issues().len(),
            "Review complete"
        );

        let report = ReviewReport {
            tool: TOOL_NAME.to_string(),
            version: VERSION.to_string(),
            input: Input {
                spec_file: doc.path.clone(),
                spec_hash: doc.hash.clone(),
                context_files: input.context.iter().map(|c| c.path.clone()).collect(),
                profile: profile.name.to_string(),
                strict: self.config.strict,
                severity_threshold: self.config.severity_threshold,
            },
            summary,
            issues,
            questions: resolved.report.questions().to_vec(),
            patches: resolved.report.patches().to_vec(),
            meta: Meta {
                model: resolved.model,
                temperature: self.config.temperature,
                attempts: resolved.attempts,
                evaluated_at: Utc::now(),
            },
        };

        Ok(ReviewOutcome {
            report,
            validated: resolved.report,
            patches,
            usage: resolved.usage,
        })
    }
}

fn build_prompts(
    profile: &Profile,
    strict: bool,
    doc: &SourceDocument,
    context: &[ContextFile],
) -> Prompts {
    Prompts {
        system: build_system_prompt(profile, strict),
        user: build_user_prompt(doc, context),
    }
}

/// Builder for ReviewOrchestrator.
pub struct ReviewOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: ReviewConfig,
}

impl ReviewOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: ReviewConfig::default(),
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: ReviewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ReviewOrchestrator, ReviewError> {
        let provider = self.provider.ok_or_else(|| {
            ReviewError::from(ProviderError::NotConfigured("No provider set".to_string()))
        })?;
        ReviewOrchestrator::new(provider, self.config)
    }
}

impl Default for ReviewOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
