//! Summary prompt construction.
//!
//! Pure logic: embeds a plan excerpt into a fixed instruction template. The
//! template pins the header and bullet style that [`crate::format`] parses.

/// Top-level section headers the model is asked to produce, in order.
pub const SECTIONS: [&str; 5] = [
    "Overview",
    "Key Resources",
    "Security & Risk Assessment",
    "Cost Impact",
    "Next Steps",
];

/// Sub-lists requested under "Key Resources", in order.
pub const RESOURCE_SUBSECTIONS: [&str; 3] = ["Creating", "Modifying", "Destroying"];

/// Stand-in used when the excerpt is blank.
const NO_PLAN_DATA: &str = "No plan data";

/// Build the summarization prompt for a plan excerpt.
///
/// The excerpt is expected to be truncated already by the sniffer.
pub fn build_prompt(excerpt: &str) -> String {
    let plan = if excerpt.trim().is_empty() {
        NO_PLAN_DATA
    } else {
        excerpt
    };

    format!(
        r#"Analyze this Terraform plan and provide a clean, well-formatted summary:

Plan Details: {plan}

Please format your response exactly like this structure (no # symbols, clean headers with colons):

Overview:
Brief description of what this plan will accomplish.

Key Resources:
Creating:
• Resource 1 - description
• Resource 2 - description

Modifying:
• Resource 1 - description (if any)

Destroying:
• Resource 1 - description (if any)

Security & Risk Assessment:
• Risk 1 - description and impact
• Risk 2 - description and mitigation

Cost Impact:
• Brief cost analysis and considerations

Next Steps:
• Step 1 - what to do next
• Step 2 - monitoring recommendations

Keep it concise, use consistent bullet points (•), and clean headers ending with colons only.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BULLET;

    #[test]
    fn embeds_excerpt() {
        let prompt = build_prompt("Plan: 2 to add, 0 to change, 1 to destroy.");
        assert!(prompt.contains("Plan Details: Plan: 2 to add, 0 to change, 1 to destroy."));
    }

    #[test]
    fn blank_excerpt_uses_placeholder() {
        let prompt = build_prompt("   ");
        assert!(prompt.contains("Plan Details: No plan data"));
    }

    #[test]
    fn sections_appear_in_order_with_colons() {
        let prompt = build_prompt("x");
        let expected = [
            SECTIONS[0],
            SECTIONS[1],
            RESOURCE_SUBSECTIONS[0],
            RESOURCE_SUBSECTIONS[1],
            RESOURCE_SUBSECTIONS[2],
            SECTIONS[2],
            SECTIONS[3],
            SECTIONS[4],
        ];
        let positions: Vec<usize> = expected
            .iter()
            .map(|section| {
                prompt
                    .find(&format!("\n{section}:\n"))
                    .unwrap_or_else(|| panic!("section {section:?} missing"))
            })
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "sections out of order: {positions:?}"
        );
    }

    #[test]
    fn mandates_bullet_character() {
        let prompt = build_prompt("x");
        assert!(prompt.contains(BULLET));
        assert!(prompt.contains("no # symbols"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("same"), build_prompt("same"));
    }
}
