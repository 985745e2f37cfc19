//! Assistant replies
//!
//! The [`ResponseGenerator`] port turns one assembled prompt into one reply.
//! Callers classify failures with [`ReplyFailure`] and apply the single
//! overload retry through [`generate_with_retry`] or the voice orb.

mod gemini;
mod prompt;

use std::time::Duration;

use async_trait::async_trait;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, classify_failure};
pub use prompt::PromptBuilder;

use crate::{Error, Result};

/// Spoken when a voice reply fails
pub const APOLOGY_TEXT: &str = "I'm experiencing technical difficulties. Please try again later.";

/// Spoken when the single overload retry also fails
pub const OVERLOADED_TEXT: &str =
    "The AI service is still overloaded. Please try again in a moment.";

/// Spoken when no AI credential is configured
pub const MISSING_KEY_TEXT: &str = "I need a Gemini API key to process your request. Please set the GEMINI_API_KEY environment variable.";

/// Delay before the overload retry
pub const OVERLOAD_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Input modality of a conversation turn
///
/// Voice and text turns keep separate conversation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Voice,
}

impl Modality {
    /// Whether messages of this modality carry the voice flag
    #[must_use]
    pub const fn is_voice(self) -> bool {
        matches!(self, Self::Voice)
    }

    /// Modality of a stored message
    #[must_use]
    pub const fn of(is_voice: bool) -> Self {
        if is_voice { Self::Voice } else { Self::Text }
    }
}

/// Produces one assistant reply for one prompt
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when credentials are missing (before any
    /// network call), [`Error::Overloaded`] for the transient overload class,
    /// or another error for transport/provider failures
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Failure classes distinguished by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFailure {
    /// No credential configured
    MissingCredentials,
    /// Upstream overloaded; retried once
    Overloaded,
    /// Any other transport or provider error
    Failed,
}

impl ReplyFailure {
    /// Classify a generator error
    #[must_use]
    pub const fn classify(error: &Error) -> Self {
        if error.is_config() {
            Self::MissingCredentials
        } else if error.is_overloaded() {
            Self::Overloaded
        } else {
            Self::Failed
        }
    }
}

/// Overload retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: OVERLOAD_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting (tests, scripted sessions)
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }
}

/// Generate a reply, retrying exactly once if the first attempt is overloaded
///
/// # Errors
///
/// Returns the first non-overload error, or the retry's error
pub async fn generate_with_retry(
    generator: &dyn ResponseGenerator,
    prompt: &str,
    policy: RetryPolicy,
) -> Result<String> {
    match generator.generate(prompt).await {
        Err(e) if e.is_overloaded() => {
            tracing::warn!(error = %e, delay_ms = policy.delay.as_millis(), "AI service overloaded, retrying once");
            tokio::time::sleep(policy.delay).await;
            generator.generate(prompt).await
        }
        other => other,
    }
}
