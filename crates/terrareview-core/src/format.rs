//! Reply formatting: model text to display blocks.
//!
//! The model is asked for headers ending in a colon and `•` bullets (see
//! [`crate::prompt`]). Replies are free-form, so each line is classified on
//! its own and anything unexpected becomes a [`DisplayBlock::Paragraph`]
//! rather than an error.

use serde::Serialize;

/// The bullet character the prompt asks the model to use.
pub const BULLET: char = '•';

/// One rendered unit of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DisplayBlock {
    /// Section header, trailing colon removed.
    Header(String),
    /// A line starting with [`BULLET`], kept verbatim.
    BulletItem(String),
    /// Any other non-blank line, kept verbatim.
    Paragraph(String),
}

impl DisplayBlock {
    pub fn text(&self) -> &str {
        match self {
            Self::Header(t) | Self::BulletItem(t) | Self::Paragraph(t) => t,
        }
    }
}

/// Split a model reply into display blocks, preserving line order.
pub fn format_reply(reply: &str) -> Vec<DisplayBlock> {
    reply
        .replace("##", "")
        .lines()
        .filter_map(classify_line)
        .collect()
}

/// Classify a single reply line. Returns `None` for lines that are blank
/// once heading markup is removed.
pub fn classify_line(raw: &str) -> Option<DisplayBlock> {
    let line = strip_heading_markup(raw.trim()).trim();
    if line.is_empty() {
        return None;
    }

    let block = if line.starts_with(BULLET) {
        DisplayBlock::BulletItem(line.to_string())
    } else if let Some(header) = line.strip_suffix(':') {
        DisplayBlock::Header(header.to_string())
    } else {
        DisplayBlock::Paragraph(line.to_string())
    };
    Some(block)
}

fn strip_heading_markup(line: &str) -> &str {
    if line == "#" {
        return "";
    }
    line.strip_prefix("# ").unwrap_or(line)
}
