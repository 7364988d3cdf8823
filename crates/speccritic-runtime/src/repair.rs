//! Validation and the single repair attempt.
//!
//! ```text
//! FirstAttempt --valid--> Success (attempts = 1)
//!      |
//!   invalid
//!      v
//! Repairing ----valid--> Success (attempts = 2)
//!      |
//!   invalid
//!      v
//!   Failed (ModelOutputInvalid)
//! ```
//!
//! A transport failure in either state ends the run with a provider error
//! and is never retried. Every call runs under the configured timeout and
//! can be cancelled through a [`CancelSignal`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use speccritic_core::{validate, FailureCategory, Report};

use crate::prompts::repair_prompt;
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Which of the two possible calls this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Repair,
}

impl Attempt {
    pub fn as_str(self) -> &'static str {
        match self {
            Attempt::First => "first",
            Attempt::Repair => "repair",
        }
    }

    /// 1-based attempt count.
    pub fn number(self) -> u8 {
        match self {
            Attempt::First => 1,
            Attempt::Repair => 2,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failures of a resolve.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{attempt} provider call failed: {source}")]
    Provider {
        attempt: Attempt,
        #[source]
        source: ProviderError,
    },

    /// Both responses failed validation. `category` is the repair's.
    #[error("model output invalid after repair attempt: {category}")]
    ModelOutputInvalid {
        category: FailureCategory,
        first: FailureCategory,
    },
}

/// A validated report and how it was obtained.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub report: Report,

    /// `provider:model` as reported by the provider
    pub model: String,

    /// 1 or 2
    pub attempts: u8,

    /// Summed over every call made
    pub usage: TokenUsage,
}

/// Receiving half of a cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Sending half of a cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    /// A connected handle and signal.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Drives one prompt pair through validation with at most one repair.
pub struct RepairOrchestrator {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
}

impl RepairOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self { provider, config }
    }

    /// Obtain a validated report for the prompts.
    ///
    /// `line_count` bounds every evidence citation.
    pub async fn resolve(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        line_count: usize,
        cancel: &CancelSignal,
    ) -> Result<Resolved, ResolveError> {
        tracing::debug!(
            provider = self.provider.name(),
            estimated_tokens = self.provider.estimate_tokens(system_prompt)
                + self.provider.estimate_tokens(user_prompt),
            "Prompt built"
        );

        let mut usage = TokenUsage::default();

        let first = self
            .call(Attempt::First, system_prompt, user_prompt, cancel)
            .await?;
        usage += first.usage;

        let first_category = match validate(&first.content, line_count) {
            Ok(report) => return Ok(self.success(report, first.model, Attempt::First, usage)),
            Err(err) => {
                tracing::warn!(
                    attempt = Attempt::First.as_str(),
                    category = err.category().as_str(),
                    error = %err,
                    "Model output failed validation, requesting repair"
                );
                err.category()
            }
        };

        let repair_user = repair_prompt(user_prompt, first_category);
        let second = self
            .call(Attempt::Repair, system_prompt, &repair_user, cancel)
            .await?;
        usage += second.usage;

        match validate(&second.content, line_count) {
            Ok(report) => Ok(self.success(report, second.model, Attempt::Repair, usage)),
            Err(err) => {
                tracing::warn!(
                    attempt = Attempt::Repair.as_str(),
                    category = err.category().as_str(),
                    error = %err,
                    "Repaired output failed validation"
                );
                Err(ResolveError::ModelOutputInvalid {
                    category: err.category(),
                    first: first_category,
                })
            }
        }
    }

    fn success(&self, report: Report, model: String, attempt: Attempt, usage: TokenUsage) -> Resolved {
        tracing::info!(
            attempts = attempt.number(),
            issues = report.issues().len(),
            questions = report.questions().len(),
            patches = report.patches().len(),
            total_tokens = usage.total(),
            "Model output validated"
        );
        Resolved {
            report,
            model,
            attempts: attempt.number(),
            usage,
        }
    }

    /// One provider call, bounded by the timeout and the cancel signal.
    async fn call(
        &self,
        attempt: Attempt,
        system_prompt: &str,
        user_prompt: &str,
        cancel: &CancelSignal,
    ) -> Result<CompletionResponse, ResolveError> {
        tracing::info!(
            provider = self.provider.name(),
            model = %self.config.model,
            attempt = attempt.as_str(),
            "Calling model"
        );

        let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        let timeout = self.config.timeout;
        let mut cancel = cancel.clone();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.provider.complete(messages, &self.config)) => {
                outcome.unwrap_or_else(|_| Err(ProviderError::Timeout(timeout)))
            }
        };

        result.map_err(|source| {
            tracing::warn!(attempt = attempt.as_str(), error = %source, "Provider call failed");
            ResolveError::Provider { attempt, source }
        })
    }
}
