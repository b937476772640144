//! Body rendering. Post and comment bodies are Markdown that may embed HTML
//! from the rich-text editor; both pass through the same sanitizer.

use ammonia::Builder;
use comrak::{markdown_to_html, Options};
use std::collections::HashSet;

const EXTRA_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "pre", "code", "blockquote", "hr", "table", "thead",
    "tbody", "tr", "th", "td", "img", "figure", "figcaption", "del", "s", "sup", "sub",
];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

pub fn render_markdown(raw: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true; // sanitized below

    sanitize_html(&markdown_to_html(raw, &options))
}

pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = EXTRA_TAGS.iter().copied().collect();
    let schemes: HashSet<&str> = URL_SCHEMES.iter().copied().collect();

    let mut builder = Builder::default();
    builder
        .add_tags(&tags)
        .add_tag_attributes("a", &["href", "title"])
        .add_tag_attributes("img", &["src", "alt", "title", "width", "height"])
        .add_tag_attributes("code", &["class"])
        .add_tag_attributes("td", &["align"])
        .add_tag_attributes("th", &["align"])
        .url_schemes(schemes)
        .link_rel(Some("noopener noreferrer"));

    builder.clean(html).to_string()
}

/// Escape text for interpolation into an HTML fragment.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
