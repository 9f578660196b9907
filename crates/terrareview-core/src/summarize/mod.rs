//! AI summarization of validated plans.
//!
//! [`summarize`] is the only entry point the pipeline uses. It enforces the
//! credential precondition, builds the prompt, and folds every outcome into
//! a [`SummaryReport`].
//!
//! ```text
//! excerpt + Option<Credential>
//!     |
//!     +-- None --> SummaryReport::Error("missing credential")   (no request)
//!     |
//!     +-- Some --> build_prompt --> Summarizer::complete
//!                                       |
//!                                       +-- Ok(text)  --> SummaryReport::Text
//!                                       +-- Err(e)    --> SummaryReport::Error
//! ```

pub mod client;
pub mod errors;
pub mod trait_def;
pub mod types;

pub use client::{ChatCompletionsClient, SummarizerConfig};
pub use errors::SummarizeError;
pub use trait_def::Summarizer;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::prompt::build_prompt;
use crate::session::Credential;

/// Result of one summarization attempt: reply text or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryReport {
    /// Raw model reply, unmodified.
    Text(String),
    /// Diagnostic for a skipped or failed request.
    Error(String),
}

impl SummaryReport {
    /// The report produced when no credential is available.
    pub fn missing_credential() -> Self {
        Self::Error(SummarizeError::MissingCredential.to_string())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Error(e) => Some(e),
        }
    }
}

/// Summarize a plan excerpt.
///
/// Without a credential this returns [`SummaryReport::missing_credential`]
/// and never calls `summarizer`. Otherwise exactly one request is made.
pub async fn summarize(
    summarizer: &dyn Summarizer,
    excerpt: &str,
    credential: Option<&Credential>,
) -> SummaryReport {
    let Some(credential) = credential else {
        debug!("no credential available; skipping summarization");
        return SummaryReport::missing_credential();
    };

    let prompt = build_prompt(excerpt);
    match summarizer.complete(&prompt, credential.expose()).await {
        Ok(text) => {
            info!(
                model = summarizer.model(),
                reply_chars = text.chars().count(),
                "summarization succeeded"
            );
            SummaryReport::Text(text)
        }
        Err(err) => {
            warn!(model = summarizer.model(), error = %err, "summarization failed");
            SummaryReport::Error(format!("AI analysis error: {err}"))
        }
    }
}
