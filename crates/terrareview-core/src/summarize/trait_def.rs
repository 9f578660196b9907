//! The `Summarizer` trait -- the seam to the remote language model.
//!
//! The HTTP implementation is [`super::ChatCompletionsClient`]; tests plug
//! in scripted implementations. The trait is object-safe so the review
//! pipeline can hold an `Arc<dyn Summarizer>`.

use async_trait::async_trait;

use super::errors::SummarizeError;

/// One-shot text completion against a remote model.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send `prompt` and return the raw reply text.
    ///
    /// Implementations make exactly one request and never retry.
    async fn complete(&self, prompt: &str, credential: &str) -> Result<String, SummarizeError>;
}

// Compile-time assertion: Summarizer must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Summarizer) {}
};
