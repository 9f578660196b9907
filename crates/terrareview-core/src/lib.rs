//! Terraform plan validation and AI summarization.
//!
//! ```text
//! upload bytes
//!     |
//!     v
//! upload::UploadStore::stage ---> StagedUpload (deleted on drop)
//!     |
//!     v
//! sniff::classify -------------> ValidationResult { is_valid, message, excerpt }
//!     |  (valid only)
//!     v
//! summarize::summarize --------> SummaryReport::Text | SummaryReport::Error
//!     |  (text only)
//!     v
//! format::format_reply --------> Vec<DisplayBlock>
//! ```
//!
//! [`review::Reviewer`] drives the whole chain; [`session::SessionStore`]
//! supplies the caller's credential.

pub mod format;
pub mod prompt;
pub mod review;
pub mod session;
pub mod sniff;
pub mod summarize;
pub mod upload;

pub use format::DisplayBlock;
pub use review::{ReviewOutcome, Reviewer};
pub use session::{Credential, SessionId, SessionKey, SessionStore};
pub use sniff::{MarkerSet, PlanKind, ValidationResult};
pub use summarize::{ChatCompletionsClient, Summarizer, SummarizerConfig, SummaryReport};
pub use upload::{StagedUpload, UploadError, UploadStore};
