//! Shared test utilities for terrareview integration tests.
//!
//! Provides sample plan documents and a [`ScriptedSummarizer`] that answers
//! without network access and counts how often it was called.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use terrareview_core::summarize::{SummarizeError, Summarizer};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Human-readable `terraform plan` output.
pub const TEXT_PLAN: &str = r#"
Terraform used the selected providers to generate the following execution
plan. Resource actions are indicated with the following symbols:
  + create
  - destroy

Terraform will perform the following actions:

  # aws_s3_bucket.logs will be created
  + resource "aws_s3_bucket" "logs" {
      + bucket = "acme-logs"
    }

  # aws_instance.legacy will be destroyed
  - resource "aws_instance" "legacy" {
      - ami           = "ami-0abc" -> null
      - instance_type = "t2.micro" -> null
    }

Plan: 1 to add, 0 to change, 1 to destroy.
"#;

/// Minimal `terraform show -json` output.
pub const JSON_PLAN: &str = r#"{
  "format_version": "1.2",
  "terraform_version": "1.7.5",
  "planned_values": {"root_module": {}},
  "resource_changes": [
    {
      "address": "aws_s3_bucket.logs",
      "type": "aws_s3_bucket",
      "change": {"actions": ["create"]}
    }
  ]
}"#;

/// Well-formed JSON that is not a plan.
pub const NON_PLAN_JSON: &str = r#"{"name": "my-package", "version": "1.0.0"}"#;

/// Plain text that is not a plan.
pub const NON_PLAN_TEXT: &str = "Meeting notes: discuss Q3 roadmap.\n";

/// A reply in the shape the prompt asks for, with stray markup.
pub const MODEL_REPLY: &str = "## Overview:\nThis plan adds a log bucket and removes a legacy instance.\n\nKey Resources:\nCreating:\n• aws_s3_bucket.logs - log storage\n#\nDestroying:\n• aws_instance.legacy - t2.micro host\n\nNext Steps:\n• Confirm nothing still targets the legacy host\n";

// ---------------------------------------------------------------------------
// Scripted summarizer
// ---------------------------------------------------------------------------

/// What a [`ScriptedSummarizer`] answers with.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    HttpStatus(u16),
}

/// A [`Summarizer`] with a canned answer. Clones share the call log.
#[derive(Debug, Clone)]
pub struct ScriptedSummarizer {
    script: Script,
    calls: Arc<AtomicUsize>,
    credentials: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSummarizer {
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(Script::Reply(text.into()))
    }

    pub fn failing(status: u16) -> Self {
        Self::new(Script::HttpStatus(status))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            credentials: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Credentials received, in call order.
    pub async fn credentials(&self) -> Vec<String> {
        self.credentials.lock().await.clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str, credential: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().await.push(credential.to_string());
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::HttpStatus(status) => Err(SummarizeError::HttpError {
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

/// Whether `dir` contains no entries.
pub fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
