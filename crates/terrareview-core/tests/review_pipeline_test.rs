//! Integration tests for the review pipeline: staging, classification,
//! summarization and formatting wired together.

use std::sync::Arc;

use terrareview_core::format::DisplayBlock;
use terrareview_core::session::{Credential, SessionId, SessionStore};
use terrareview_core::sniff::{MarkerSet, PlanKind};
use terrareview_core::summarize::SummaryReport;
use terrareview_core::upload::UploadStore;
use terrareview_core::Reviewer;
use terrareview_test_utils::{
    JSON_PLAN, MODEL_REPLY, NON_PLAN_JSON, NON_PLAN_TEXT, ScriptedSummarizer, TEXT_PLAN,
    dir_is_empty,
};

fn reviewer(summarizer: &ScriptedSummarizer) -> Reviewer {
    Reviewer::new(MarkerSet::default(), Arc::new(summarizer.clone()))
}

#[tokio::test]
async fn text_plan_is_summarized_and_formatted() {
    let tmp = tempfile::TempDir::new().unwrap();
    let uploads = UploadStore::new(tmp.path());
    let summarizer = ScriptedSummarizer::replying(MODEL_REPLY);
    let reviewer = reviewer(&summarizer);
    let credential = Credential::new("nvapi-test").unwrap();

    let staged = uploads.stage("plan.txt", TEXT_PLAN.as_bytes()).unwrap();
    let outcome = reviewer.review(&staged, Some(&credential)).await.unwrap();
    staged.release().unwrap();

    assert_eq!(outcome.filename, "plan.txt");
    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.validation.kind, PlanKind::Textual);
    assert_eq!(outcome.report, Some(SummaryReport::Text(MODEL_REPLY.to_string())));
    assert_eq!(outcome.blocks[0], DisplayBlock::Header("Overview".to_string()));
    assert!(
        outcome
            .blocks
            .contains(&DisplayBlock::BulletItem("• aws_s3_bucket.logs - log storage".to_string()))
    );
    assert!(outcome.has_analysis());

    assert_eq!(summarizer.calls(), 1);
    assert_eq!(summarizer.credentials().await, vec!["nvapi-test"]);
    assert!(dir_is_empty(tmp.path()));
}

#[tokio::test]
async fn json_plan_without_credential_reports_missing_credential() {
    let summarizer = ScriptedSummarizer::replying(MODEL_REPLY);
    let reviewer = reviewer(&summarizer);

    let outcome = reviewer
        .review_bytes(JSON_PLAN.as_bytes(), "plan.json", None)
        .await;

    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.validation.kind, PlanKind::Structured);
    assert_eq!(
        outcome.report,
        Some(SummaryReport::Error("missing credential".to_string()))
    );
    assert!(outcome.blocks.is_empty());
    assert_eq!(summarizer.calls(), 0, "no remote call without a credential");
}

#[tokio::test]
async fn invalid_documents_are_never_summarized() {
    let summarizer = ScriptedSummarizer::replying(MODEL_REPLY);
    let reviewer = reviewer(&summarizer);
    let credential = Credential::new("nvapi-test").unwrap();

    for (bytes, filename) in [
        (NON_PLAN_JSON.as_bytes(), "package.json"),
        (NON_PLAN_TEXT.as_bytes(), "notes.txt"),
        (b"{broken".as_slice(), "plan.json"),
        (&[0xff, 0xfe, 0x00][..], "plan.txt"),
    ] {
        let outcome = reviewer.review_bytes(bytes, filename, Some(&credential)).await;
        assert!(!outcome.validation.is_valid, "{filename} should be invalid");
        assert!(outcome.validation.excerpt.is_none());
        assert!(outcome.report.is_none());
    }
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn summarization_failure_is_reported_not_raised() {
    let summarizer = ScriptedSummarizer::failing(502);
    let reviewer = reviewer(&summarizer);
    let credential = Credential::new("nvapi-test").unwrap();

    let outcome = reviewer
        .review_bytes(TEXT_PLAN.as_bytes(), "plan.txt", Some(&credential))
        .await;

    assert!(outcome.validation.is_valid);
    let error = outcome.report.as_ref().and_then(SummaryReport::error).unwrap();
    assert!(error.contains("HTTP 502"), "unexpected error: {error}");
    assert!(outcome.blocks.is_empty());
    assert_eq!(summarizer.calls(), 1);
}

#[tokio::test]
async fn cleared_credential_is_not_reused() {
    let summarizer = ScriptedSummarizer::replying(MODEL_REPLY);
    let reviewer = reviewer(&summarizer);
    let sessions = SessionStore::default();
    let session = SessionId::new();

    let credential = sessions.resolve_credential(session, Some("nvapi-test"));
    let first = reviewer
        .review_bytes(TEXT_PLAN.as_bytes(), "plan.txt", credential.as_ref())
        .await;
    assert!(first.has_analysis());

    sessions.clear_credential(session);
    let credential = sessions.resolve_credential(session, None);
    let second = reviewer
        .review_bytes(TEXT_PLAN.as_bytes(), "plan.txt", credential.as_ref())
        .await;

    assert_eq!(second.report, Some(SummaryReport::missing_credential()));
    assert_eq!(summarizer.calls(), 1);
}

#[tokio::test]
async fn validate_only_classifies() {
    let tmp = tempfile::TempDir::new().unwrap();
    let uploads = UploadStore::new(tmp.path());
    let summarizer = ScriptedSummarizer::replying(MODEL_REPLY);
    let reviewer = reviewer(&summarizer);

    let staged = uploads.stage("plan.json", JSON_PLAN.as_bytes()).unwrap();
    let validation = reviewer.validate(&staged).await.unwrap();
    drop(staged);

    assert!(validation.is_valid);
    assert!(validation.has_plan_data());
    assert_eq!(summarizer.calls(), 0);
    assert!(dir_is_empty(tmp.path()));
}
