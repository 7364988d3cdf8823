//! The `check` command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;

use speccritic_core::{ContextFile, OutputFormat, Severity, SourceDocument, Verdict};
use speccritic_runtime::{
    parse_timeout, CancelSignal, ProviderRegistry, ReviewConfig, ReviewError, ReviewInput,
    ReviewOrchestrator, MODEL_ENV,
};

pub const EXIT_FAIL_ON: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_PROVIDER: u8 = 4;
pub const EXIT_MODEL_OUTPUT: u8 = 5;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Specification file to review
    pub spec_file: PathBuf,

    /// Output format: json or md
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Context file paths (may be repeated)
    #[arg(long)]
    pub context: Vec<PathBuf>,

    /// Specification profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Enable strict mode (silence = ambiguity)
    #[arg(long)]
    pub strict: bool,

    /// Exit 2 if verdict >= this level (VALID_WITH_GAPS or INVALID)
    #[arg(long, value_parser = parse_fail_on)]
    pub fail_on: Option<Verdict>,

    /// Minimum severity to emit: info, warn, or critical
    #[arg(long)]
    pub severity_threshold: Option<Severity>,

    /// Write suggested patches as a unified diff to this file
    #[arg(long)]
    pub patch_out: Option<PathBuf>,

    /// LLM temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum response tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Per-call provider timeout, e.g. 90s or 5m
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fail if SPECCRITIC_MODEL is not set; enforces explicit model config in CI
    #[arg(long)]
    pub offline: bool,

    /// Print processing steps to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Dump the full redacted prompt to stderr; use only in trusted environments
    #[arg(long)]
    pub debug: bool,
}

/// How a completed check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    FailOn { verdict: Verdict, threshold: Verdict },
}

fn parse_fail_on(raw: &str) -> Result<Verdict, String> {
    match raw.parse::<Verdict>()? {
        Verdict::Valid => Err("--fail-on must be VALID_WITH_GAPS or INVALID".to_string()),
        verdict => Ok(verdict),
    }
}

impl CheckArgs {
    /// Overlay flags that were given on top of `config`.
    fn apply_to(&self, config: &mut ReviewConfig) {
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }
        if self.strict {
            config.strict = true;
        }
        if let Some(threshold) = self.severity_threshold {
            config.severity_threshold = threshold;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
    }
}

/// `--offline` requires the model to come from the environment.
fn check_offline(offline: bool, env_model: Option<&str>) -> Result<(), ReviewError> {
    if offline && env_model.map_or(true, str::is_empty) {
        return Err(ReviewError::InputConfiguration(format!(
            "{} environment variable not set (required with --offline)",
            MODEL_ENV
        )));
    }
    Ok(())
}

/// Map an error to a process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ReviewError>() {
        Some(ReviewError::Provider { .. }) => EXIT_PROVIDER,
        Some(ReviewError::ModelOutputInvalid { .. }) => EXIT_MODEL_OUTPUT,
        Some(ReviewError::InputConfiguration(_)) | None => EXIT_INPUT,
    }
}

fn load_config(args: &CheckArgs) -> Result<ReviewConfig, ReviewError> {
    check_offline(args.offline, std::env::var(MODEL_ENV).ok().as_deref())?;

    let mut config = ReviewConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

fn write_patches(path: &Path, outcome: &speccritic_runtime::ReviewOutcome) {
    for skipped in &outcome.patches.skipped {
        tracing::warn!(issue_id = ?skipped.issue_id, "Patch could not be located in spec, skipping");
    }

    tracing::info!(path = %path.display(), patches = outcome.patches.resolved.len(), "Writing patches");
    if let Err(err) = std::fs::write(path, outcome.patches.to_patch_text()) {
        tracing::warn!(path = %path.display(), error = %err, "Patch write failed");
    }
}

/// Run one review and write its output.
pub async fn execute(args: CheckArgs) -> anyhow::Result<CheckStatus> {
    let config = load_config(&args)?;

    tracing::info!(path = %args.spec_file.display(), "Loading spec");
    let document = SourceDocument::load(&args.spec_file).map_err(ReviewError::from)?;

    tracing::info!(count = args.context.len(), "Loading context files");
    let context = ContextFile::load_all(&args.context).map_err(ReviewError::from)?;

    let model = config.model_spec().map_err(ReviewError::from)?;
    let provider = ProviderRegistry::with_defaults()
        .create(&model.provider, &config.provider_settings(&model.provider))
        .map_err(ReviewError::from)?;

    let orchestrator = ReviewOrchestrator::new(provider, config)?;
    let input = ReviewInput { document, context };

    if args.debug {
        let prompts = orchestrator.prompts(&input)?;
        eprintln!("=== DEBUG: redacted prompt ===");
        eprintln!("[SYSTEM]\n{}\n\n[USER]\n{}", prompts.system, prompts.user);
        eprintln!("=== END DEBUG ===");
    }

    let (cancel_handle, cancel) = CancelSignal::pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling provider call");
            cancel_handle.cancel();
        }
    });

    tracing::info!(model = %model, "Calling LLM");
    let outcome = orchestrator.review(&input, &cancel).await;
    ctrl_c.abort();
    let outcome = outcome?;

    if let Some(path) = &args.patch_out {
        write_patches(path, &outcome);
    }

    tracing::info!(format = ?args.format, "Rendering output");
    let mut rendered = args
        .format
        .render(&outcome.report)
        .context("rendering output")?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.out {
        Some(path) => std::fs::write(path, &rendered)
            .with_context(|| format!("writing output file {}", path.display()))?,
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("writing output")?;
        }
    }

    let verdict = outcome.report.summary.verdict;
    match args.fail_on {
        Some(threshold) if verdict >= threshold => Ok(CheckStatus::FailOn { verdict, threshold }),
        _ => Ok(CheckStatus::Passed),
    }
}
