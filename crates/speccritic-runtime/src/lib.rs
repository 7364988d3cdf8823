//! # speccritic-runtime
//!
//! Model access for SpecCritic.
//!
//! Everything that talks to a provider lives here: configuration,
//! prompts, the HTTP transports, and the repair protocol that turns one
//! or two model responses into a validated report.
//!
//! ## Important
//!
//! Nothing in `speccritic-core` calls a model. This crate hands it the raw
//! text and trusts only what comes back through its validator.
//!
//! ## Example
//!
//! ```rust,ignore
//! use speccritic_runtime::{CancelSignal, ProviderRegistry, ReviewConfig, ReviewInput, ReviewOrchestrator};
//!
//! let config = ReviewConfig::load(None)?;
//! let model = config.model_spec()?;
//! let provider = ProviderRegistry::with_defaults()
//!     .create(&model.provider, &config.provider_settings(&model.provider))?;
//!
//! let orchestrator = ReviewOrchestrator::new(provider, config)?;
//! let outcome = orchestrator.review(&input, &CancelSignal::never()).await?;
//! println!("{}", outcome.report.summary.score);
//! ```

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod repair;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{parse_timeout, ConfigError, ReviewConfig, DEFAULT_MODEL, MODEL_ENV};
pub use orchestrator::{
    Prompts, ReviewError, ReviewInput, ReviewOrchestrator, ReviewOrchestratorBuilder,
    ReviewOutcome,
};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ModelSpec, ProviderError,
    ProviderRegistry, TokenUsage,
};
pub use repair::{Attempt, CancelHandle, CancelSignal, RepairOrchestrator, ResolveError, Resolved};
