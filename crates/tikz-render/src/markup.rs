//! Markup shown in place of a rendered diagram.
//!
//! Blank sources get a placeholder prompt; failed renders get an error panel
//! carrying the failure message so the block always has something to display.

use crate::consts::{ERROR_HINT, ERROR_TITLE, PLACEHOLDER_MARKUP, UNKNOWN_ERROR};

/// Placeholder shown for blank TikZ source.
#[must_use]
pub fn placeholder_markup() -> &'static str {
    PLACEHOLDER_MARKUP
}

/// Build the error panel for a failed render.
///
/// `None` or a blank message falls back to a generic "unknown error" text.
/// The message is HTML-escaped; server-supplied text is never injected raw.
#[must_use]
pub fn error_markup(message: Option<&str>) -> String {
    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(UNKNOWN_ERROR);
    format!(
        r#"<div class="tikz-render-error"><h4>{ERROR_TITLE}</h4><p>{}</p><p>{ERROR_HINT}</p></div>"#,
        escape_html(message)
    )
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
