//! Plan format sniffing.
//!
//! Classifies uploaded bytes as a structured (`terraform show -json`) or
//! textual (`terraform plan`) plan by checking for marker fields or
//! substrings. This is an existence check, not a schema validator: a single
//! matching marker is enough, so the check does not couple to any one plan
//! format version.
//!
//! ```text
//! bytes + filename
//!     |
//!     +-- *.json --> serde_json::Value --> top-level marker field? --+
//!     |                                                              |
//!     +-- *.txt  --> UTF-8 text -------> marker substring? ---------+--> excerpt
//! ```

pub mod markers;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use markers::{MarkerError, MarkerSet};

/// Maximum number of characters kept in a plan excerpt.
pub const EXCERPT_CHARS: usize = 1000;

/// The plan format implied by an upload's filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// `.json` output of `terraform show -json`.
    Structured,
    /// `.txt` output of `terraform plan`.
    Textual,
    /// Any other suffix.
    Unrecognized,
}

impl PlanKind {
    /// Detect the kind from the filename suffix (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        match extension(filename).as_deref() {
            Some("json") => Self::Structured,
            Some("txt") => Self::Textual,
            _ => Self::Unrecognized,
        }
    }

    /// Short label for display (`JSON` / `Text`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Structured => "JSON",
            Self::Textual => "Text",
            Self::Unrecognized => "Unknown",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Structured => "structured",
            Self::Textual => "textual",
            Self::Unrecognized => "unrecognized",
        };
        f.write_str(s)
    }
}

/// Lower-cased suffix after the last `.`, if the name has one.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Reasons a document is not accepted as a plan.
#[derive(Debug, Error)]
pub enum SniffError {
    #[error("File type not allowed: {filename:?} (expected .json or .txt)")]
    BadExtension { filename: String },

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unable to decode text file: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("{} document has no recognized plan structure", .kind.label())]
    StructureNotRecognized { kind: PlanKind },
}

/// Outcome of classifying one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub kind: PlanKind,
    pub is_valid: bool,
    pub message: String,
    /// First [`EXCERPT_CHARS`] characters of the plan; only set when valid.
    pub excerpt: Option<String>,
}

impl ValidationResult {
    fn accepted(kind: PlanKind, excerpt: String) -> Self {
        let message = match kind {
            PlanKind::Structured => "Valid Terraform JSON plan detected",
            _ => "Valid Terraform text plan detected",
        };
        Self {
            kind,
            is_valid: true,
            message: message.to_string(),
            excerpt: Some(excerpt),
        }
    }

    fn rejected(kind: PlanKind, err: &SniffError) -> Self {
        Self {
            kind,
            is_valid: false,
            message: err.to_string(),
            excerpt: None,
        }
    }

    /// Whether plan content was extracted for summarization.
    pub fn has_plan_data(&self) -> bool {
        self.excerpt.is_some()
    }
}

/// Classify `bytes` as a plan, returning an immutable [`ValidationResult`].
pub fn classify(bytes: &[u8], filename: &str, markers: &MarkerSet) -> ValidationResult {
    let kind = PlanKind::from_filename(filename);
    match sniff(bytes, filename, markers) {
        Ok(excerpt) => {
            debug!(%kind, filename, excerpt_chars = excerpt.chars().count(), "plan accepted");
            ValidationResult::accepted(kind, excerpt)
        }
        Err(err) => {
            debug!(%kind, filename, error = %err, "plan rejected");
            ValidationResult::rejected(kind, &err)
        }
    }
}

/// Run the sniffer and return the excerpt, or the reason for rejection.
pub fn sniff(bytes: &[u8], filename: &str, markers: &MarkerSet) -> Result<String, SniffError> {
    match PlanKind::from_filename(filename) {
        PlanKind::Structured => sniff_structured(bytes, markers),
        PlanKind::Textual => sniff_textual(bytes, markers),
        PlanKind::Unrecognized => Err(SniffError::BadExtension {
            filename: filename.to_string(),
        }),
    }
}

fn sniff_structured(bytes: &[u8], markers: &MarkerSet) -> Result<String, SniffError> {
    let doc: serde_json::Value = serde_json::from_slice(bytes)?;
    let recognized = doc
        .as_object()
        .is_some_and(|object| markers.matches_fields(object));
    if !recognized {
        return Err(SniffError::StructureNotRecognized {
            kind: PlanKind::Structured,
        });
    }
    // Excerpt is taken from the compact re-serialization.
    let compact = serde_json::to_string(&doc)?;
    Ok(excerpt(&compact))
}

fn sniff_textual(bytes: &[u8], markers: &MarkerSet) -> Result<String, SniffError> {
    let text = std::str::from_utf8(bytes)?;
    if !markers.matches_text(text) {
        return Err(SniffError::StructureNotRecognized {
            kind: PlanKind::Textual,
        });
    }
    Ok(excerpt(text))
}

/// The first [`EXCERPT_CHARS`] characters of `text`, split on a char boundary.
pub fn excerpt(text: &str) -> String {
    truncate_chars(text, EXCERPT_CHARS)
}

/// The first `max` characters of `text`, split on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
