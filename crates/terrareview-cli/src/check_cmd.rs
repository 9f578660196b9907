use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use terrareview_core::format::DisplayBlock;
use terrareview_core::session::Credential;
use terrareview_core::sniff::{MarkerSet, classify};
use terrareview_core::summarize::{Summarizer, SummaryReport};
use terrareview_core::upload::MAX_UPLOAD_BYTES;
use terrareview_core::{ChatCompletionsClient, ReviewOutcome, Reviewer};

use crate::config::TerrareviewConfig;

/// Execute `terrareview check`. Returns whether the file is a valid plan.
pub async fn run_check(
    config: &TerrareviewConfig,
    path: &Path,
    summarize: bool,
    api_key: Option<&str>,
) -> Result<bool> {
    let summarizer: Option<Arc<dyn Summarizer>> = if summarize {
        let client = ChatCompletionsClient::new(config.summarizer.clone())
            .context("failed to build summarizer client")?;
        Some(Arc::new(client))
    } else {
        None
    };

    let outcome = check_file(&config.markers, summarizer, path, api_key).await?;
    print!("{}", format_outcome(&outcome));
    Ok(outcome.validation.is_valid)
}

/// Classify a local file, summarizing it when a summarizer is given.
pub async fn check_file(
    markers: &MarkerSet,
    summarizer: Option<Arc<dyn Summarizer>>,
    path: &Path,
    api_key: Option<&str>,
) -> Result<ReviewOutcome> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("not a file path: {}", path.display()))?;

    let size = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    if size > MAX_UPLOAD_BYTES as u64 {
        bail!(
            "{} is {size} bytes; the limit is {MAX_UPLOAD_BYTES} bytes",
            path.display()
        );
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let outcome = match summarizer {
        Some(summarizer) => {
            let reviewer = Reviewer::new(markers.clone(), summarizer);
            let credential = api_key.and_then(Credential::new);
            reviewer
                .review_bytes(&bytes, &filename, credential.as_ref())
                .await
        }
        None => ReviewOutcome {
            validation: classify(&bytes, &filename, markers),
            filename,
            report: None,
            blocks: Vec::new(),
        },
    };
    Ok(outcome)
}

/// Plain-text rendering of a review for the terminal.
pub fn format_outcome(outcome: &ReviewOutcome) -> String {
    let validation = &outcome.validation;
    let mut out = String::new();
    let verdict = if validation.is_valid { "valid" } else { "invalid" };
    let _ = writeln!(
        out,
        "{}: {verdict} ({})",
        outcome.filename,
        validation.kind.label()
    );
    let _ = writeln!(out, "  {}", validation.message);

    match &outcome.report {
        Some(SummaryReport::Text(_)) => {
            for block in &outcome.blocks {
                match block {
                    DisplayBlock::Header(text) => {
                        let _ = write!(out, "\n{text}\n");
                    }
                    DisplayBlock::BulletItem(text) | DisplayBlock::Paragraph(text) => {
                        let _ = writeln!(out, "  {text}");
                    }
                }
            }
        }
        Some(SummaryReport::Error(err)) => {
            let _ = write!(out, "\nAI analysis unavailable: {err}\n");
        }
        None => {}
    }
    out
}
