//! Marker tokens that identify plan-like content.
//!
//! The default set is defined in `markers.toml` and embedded in the binary
//! at compile time. Deployments can replace it through the `[markers]`
//! section of the config file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The embedded default marker TOML.
static DEFAULT_MARKERS_TOML: &str = include_str!("markers.toml");

/// Errors from loading or validating a marker set.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("marker list {0:?} must not be empty")]
    EmptyList(&'static str),

    #[error("marker list {0:?} contains a blank token")]
    BlankToken(&'static str),
}

/// Tokens whose presence marks a document as a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    /// Top-level field names checked on structured (JSON) plans.
    pub structured_fields: Vec<String>,
    /// Substrings checked on textual plans.
    pub textual_substrings: Vec<String>,
}

impl MarkerSet {
    /// Parse and validate a marker set from TOML.
    pub fn from_toml(content: &str) -> Result<Self, MarkerError> {
        let set: MarkerSet = toml::from_str(content)?;
        set.validate()?;
        Ok(set)
    }

    /// Reject empty lists and blank tokens.
    ///
    /// A blank substring would match every document.
    pub fn validate(&self) -> Result<(), MarkerError> {
        check_list("structured_fields", &self.structured_fields)?;
        check_list("textual_substrings", &self.textual_substrings)
    }

    /// Whether any structured marker is a key of `object`.
    pub fn matches_fields(&self, object: &serde_json::Map<String, serde_json::Value>) -> bool {
        self.structured_fields
            .iter()
            .any(|field| object.contains_key(field))
    }

    /// Whether any textual marker occurs in `text`.
    pub fn matches_text(&self, text: &str) -> bool {
        self.textual_substrings
            .iter()
            .any(|marker| text.contains(marker.as_str()))
    }
}

impl Default for MarkerSet {
    /// Load the embedded default marker set.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. If the binary was built, the
    /// TOML is valid.
    fn default() -> Self {
        Self::from_toml(DEFAULT_MARKERS_TOML).expect("embedded markers.toml is invalid")
    }
}

fn check_list(name: &'static str, tokens: &[String]) -> Result<(), MarkerError> {
    if tokens.is_empty() {
        return Err(MarkerError::EmptyList(name));
    }
    if tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(MarkerError::BlankToken(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_loads() {
        let set = MarkerSet::default();
        assert_eq!(set.structured_fields.len(), 4);
        assert!(set.structured_fields.contains(&"resource_changes".to_string()));
        assert!(
            set.textual_substrings
                .contains(&"No changes. Infrastructure is up-to-date.".to_string())
        );
    }

    #[test]
    fn custom_set_parses() {
        let toml_str = r#"
structured_fields = ["pulumi_version"]
textual_substrings = ["Previewing update"]
"#;
        let set = MarkerSet::from_toml(toml_str).expect("should parse");
        assert_eq!(set.structured_fields, vec!["pulumi_version"]);
        assert!(set.matches_text("Previewing update (dev)"));
        assert!(!set.matches_text("Plan: 1 to add"));
    }

    #[test]
    fn rejects_empty_list() {
        let toml_str = r#"
structured_fields = []
textual_substrings = ["Plan:"]
"#;
        let err = MarkerSet::from_toml(toml_str).unwrap_err();
        assert!(
            matches!(err, MarkerError::EmptyList("structured_fields")),
            "expected EmptyList, got: {err}"
        );
    }

    #[test]
    fn rejects_blank_token() {
        let toml_str = r#"
structured_fields = ["format_version"]
textual_substrings = ["Plan:", "  "]
"#;
        let err = MarkerSet::from_toml(toml_str).unwrap_err();
        assert!(matches!(err, MarkerError::BlankToken("textual_substrings")));
    }

    #[test]
    fn rejects_missing_key() {
        let err = MarkerSet::from_toml("structured_fields = [\"a\"]").unwrap_err();
        assert!(matches!(err, MarkerError::Toml(_)));
    }

    #[test]
    fn matches_fields_checks_top_level_keys_only() {
        let set = MarkerSet::default();
        let top: serde_json::Value = serde_json::json!({ "planned_values": {} });
        let nested: serde_json::Value =
            serde_json::json!({ "wrapper": { "planned_values": {} } });
        assert!(set.matches_fields(top.as_object().unwrap()));
        assert!(!set.matches_fields(nested.as_object().unwrap()));
    }
}
