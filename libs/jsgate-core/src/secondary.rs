//! Fallback bodies served to denied domains.

use crate::model::{SecondaryContent, SecondaryLink};

/// Renders the configured secondary content, or `None` when nothing usable
/// is configured.
pub fn render(content: &SecondaryContent) -> Option<String> {
    if !content.is_configured() {
        return None;
    }
    match content {
        SecondaryContent::Js(code) => Some(code.clone()),
        SecondaryContent::Links(links) => Some(render_links(links)),
    }
}

/// One hidden wrapper holding a `<p><a>` per link, inserted with a single
/// `insertAdjacentHTML` call.
pub fn render_links(links: &[SecondaryLink]) -> String {
    let mut markup = String::from("<div style=\"display:none;\">");
    for link in links.iter().filter(|l| !l.url.trim().is_empty()) {
        markup.push_str("<p><a href=\"");
        markup.push_str(&escape_html(link.url.trim()));
        markup.push_str("\">");
        markup.push_str(&escape_html(link.keyword.trim()));
        markup.push_str("</a></p>");
    }
    markup.push_str("</div>");

    format!(
        "(function(){{var h='{}';var t=document.body||document.documentElement;\
         t.insertAdjacentHTML('beforeend',h);}})();",
        escape_js_single_quoted(&markup)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn escape_js_single_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out.replace("</", "<\\/")
}
