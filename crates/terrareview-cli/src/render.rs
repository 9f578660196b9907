//! HTML pages for the web front end.
//!
//! Pages are plain `format!` strings. Every piece of user or model supplied
//! text passes through [`escape_html`].

use terrareview_core::format::DisplayBlock;
use terrareview_core::sniff::PlanKind;
use terrareview_core::summarize::SummaryReport;
use terrareview_core::ReviewOutcome;

const TITLE: &str = "TerraReviewBot";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
<html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{TITLE}</title>\
<link rel=\"stylesheet\" href=\"https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css\">\
</head><body><main class=\"container py-4\">\
<h1 class=\"mb-4\"><a href=\"/\" class=\"text-decoration-none\">{TITLE}</a></h1>\
{body}\
</main></body></html>"
    )
}

fn key_status(has_key: bool) -> &'static str {
    if has_key {
        "<p class=\"text-success\" id=\"key-status\">An API key is stored for this session.</p>\
<form method=\"post\" action=\"/clear-api-key\"><button type=\"submit\" class=\"btn btn-sm btn-outline-secondary\">Clear API key</button></form>"
    } else {
        "<p class=\"text-muted\" id=\"key-status\">No API key stored for this session.</p>"
    }
}

/// The upload form with pending notices.
pub fn index_page(flashes: &[String], has_key: bool) -> String {
    let notices: String = flashes
        .iter()
        .map(|msg| {
            format!(
                "<div class=\"alert alert-warning\" role=\"alert\">{}</div>",
                escape_html(msg)
            )
        })
        .collect();

    let body = format!(
        "{notices}\
<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\" class=\"mb-3\">\
<div class=\"mb-3\"><label for=\"file\" class=\"form-label\">Terraform plan (.json or .txt)</label>\
<input type=\"file\" class=\"form-control\" id=\"file\" name=\"file\" accept=\".json,.txt\"></div>\
<div class=\"mb-3\"><label for=\"api_key\" class=\"form-label\">API key</label>\
<input type=\"password\" class=\"form-control\" id=\"api_key\" name=\"api_key\" autocomplete=\"off\" \
placeholder=\"Leave blank to use the key stored for this session\"></div>\
<button type=\"submit\" class=\"btn btn-primary\">Validate plan</button>\
</form>\
{status}\
<p class=\"text-muted small mt-4\">Generate a plan with <code>terraform plan &gt; plan.txt</code> or \
<code>terraform show -json plan.tfplan &gt; plan.json</code>.</p>",
        status = key_status(has_key),
    );
    layout(&body)
}

/// One display block as HTML.
pub fn render_block(block: &DisplayBlock) -> String {
    match block {
        DisplayBlock::Header(text) => {
            format!("<h4 class=\"text-primary mt-4 mb-2\">{}</h4>", escape_html(text))
        }
        DisplayBlock::BulletItem(text) => {
            format!("<div class=\"ms-3 mb-1\">{}</div>", escape_html(text))
        }
        DisplayBlock::Paragraph(text) => format!("<p class=\"mb-2\">{}</p>", escape_html(text)),
    }
}

fn analysis_section(outcome: &ReviewOutcome) -> String {
    match &outcome.report {
        None => String::new(),
        Some(SummaryReport::Text(_)) => {
            let blocks: Vec<String> = outcome.blocks.iter().map(render_block).collect();
            format!(
                "<section class=\"card mt-4\"><div class=\"card-body\" id=\"analysis\">\
<h3 class=\"card-title\">AI Analysis</h3>\n{}\n</div></section>",
                blocks.join("\n")
            )
        }
        Some(SummaryReport::Error(err)) => format!(
            "<section class=\"alert alert-danger mt-4\" id=\"analysis-error\">{}</section>",
            escape_html(err)
        ),
    }
}

/// The validation result page for one upload.
pub fn result_page(outcome: &ReviewOutcome, has_key: bool) -> String {
    let validation = &outcome.validation;
    let (badge_class, badge) = if validation.is_valid {
        ("bg-success", "Valid")
    } else {
        ("bg-danger", "Invalid")
    };

    let excerpt = match (&validation.excerpt, validation.kind) {
        (Some(text), PlanKind::Structured) => format!(
            "<h3 class=\"mt-4\">Plan summary</h3><pre class=\"bg-light p-3\"><code>{}</code></pre>",
            escape_html(text)
        ),
        _ => String::new(),
    };

    let body = format!(
        "<h2>{filename} <span class=\"badge {badge_class}\">{badge}</span></h2>\
<dl class=\"row\">\
<dt class=\"col-sm-3\">File type</dt><dd class=\"col-sm-9\">{label}</dd>\
<dt class=\"col-sm-3\">Result</dt><dd class=\"col-sm-9\">{message}</dd>\
</dl>\
{excerpt}\
{analysis}\
<div class=\"mt-4\">{status}</div>\
<p class=\"mt-4\"><a href=\"/\" class=\"btn btn-secondary\">Validate another plan</a></p>",
        filename = escape_html(&outcome.filename),
        label = validation.kind.label(),
        message = escape_html(&validation.message),
        analysis = analysis_section(outcome),
        status = key_status(has_key),
    );
    layout(&body)
}
