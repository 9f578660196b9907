//! Summarization error types.

use thiserror::Error;

/// Errors that can occur while requesting a summary.
///
/// Every variant surfaces to the caller as a `SummaryReport::Error`; none is
/// retried.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// No credential was available, so no request was made.
    #[error("missing credential")]
    MissingCredential,

    /// TCP/HTTP connection to the endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The endpoint did not answer within the client timeout.
    #[error("request timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response (authentication failures land here).
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The body was not a usable chat completion.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// The HTTP client could not be built.
    #[error("config error: {reason}")]
    Config { reason: String },
}
