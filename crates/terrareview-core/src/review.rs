//! The review pipeline: classify, summarize, format.
//!
//! [`Reviewer`] owns the marker set and the summarizer and is shared by all
//! requests. It never touches session state; callers resolve the
//! credential and pass it in.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::format::{DisplayBlock, format_reply};
use crate::session::Credential;
use crate::sniff::{MarkerSet, ValidationResult, classify};
use crate::summarize::{Summarizer, SummaryReport, summarize};
use crate::upload::{StagedUpload, UploadError};

/// Everything produced for one uploaded plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    pub filename: String,
    pub validation: ValidationResult,
    /// `None` when validation failed and no summary was attempted.
    pub report: Option<SummaryReport>,
    /// Formatted reply; empty unless `report` holds text.
    pub blocks: Vec<DisplayBlock>,
}

impl ReviewOutcome {
    pub fn has_analysis(&self) -> bool {
        !self.blocks.is_empty()
    }
}

/// Shared pipeline state.
pub struct Reviewer {
    markers: MarkerSet,
    summarizer: Arc<dyn Summarizer>,
}

impl std::fmt::Debug for Reviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reviewer")
            .field("markers", &self.markers)
            .field("model", &self.summarizer.model())
            .finish()
    }
}

impl Reviewer {
    pub fn new(markers: MarkerSet, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            markers,
            summarizer,
        }
    }

    /// Classify a staged upload without summarizing it.
    pub async fn validate(&self, staged: &StagedUpload) -> Result<ValidationResult, UploadError> {
        let bytes = read_staged(staged).await?;
        Ok(classify(&bytes, staged.filename(), &self.markers))
    }

    /// Run the full pipeline on a staged upload.
    pub async fn review(
        &self,
        staged: &StagedUpload,
        credential: Option<&Credential>,
    ) -> Result<ReviewOutcome, UploadError> {
        let bytes = read_staged(staged).await?;
        Ok(self
            .review_bytes(&bytes, staged.filename(), credential)
            .await)
    }

    /// Run the full pipeline on in-memory content.
    pub async fn review_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
        credential: Option<&Credential>,
    ) -> ReviewOutcome {
        let validation = classify(bytes, filename, &self.markers);
        info!(
            filename,
            kind = %validation.kind,
            is_valid = validation.is_valid,
            "plan classified"
        );

        let report = match validation.excerpt.as_deref() {
            Some(excerpt) => Some(summarize(self.summarizer.as_ref(), excerpt, credential).await),
            None => None,
        };

        let blocks = report
            .as_ref()
            .and_then(SummaryReport::text)
            .map(format_reply)
            .unwrap_or_default();

        ReviewOutcome {
            filename: filename.to_string(),
            validation,
            report,
            blocks,
        }
    }
}

async fn read_staged(staged: &StagedUpload) -> Result<Vec<u8>, UploadError> {
    staged.read().await.map_err(|source| UploadError::Io {
        dir: staged
            .path()
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default(),
        source,
    })
}
