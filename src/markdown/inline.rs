//! Inline and single-line block substitutions.
//!
//! Input is prose that has already been HTML-escaped, so `>` arrives as `&gt;`.  Each
//! substitution is its own function; [`substitute`] applies them in a fixed order.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("code span regex is valid"));
static BLOCK_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^&gt; (.*)$").expect("quote regex is valid"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,3}) (.+)$").expect("header regex is valid"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold regex is valid"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").expect("italic regex is valid")
});
static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*$").expect("rule regex is valid"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*] (.+)$").expect("list regex is valid"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(\d+)\. (.+)$").expect("list regex is valid"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("link regex is valid")
});

/// Apply every substitution in order.
pub fn substitute(text: &str) -> String {
    let text = code_spans(text);
    let text = links(&text);
    let text = block_quotes(&text);
    let text = headers(&text);
    let text = bold(&text);
    let text = italic(&text);
    let text = rules(&text);
    let text = unordered_items(&text);
    ordered_items(&text)
}

/// `` `code` `` → `<code>`.  Emphasis and link markers inside the span are neutralised.
pub fn code_spans(text: &str) -> String {
    CODE_SPAN
        .replace_all(text, |caps: &Captures| {
            let inner = caps[1].replace('*', "&#42;").replace('[', "&#91;");
            format!("<code>{inner}</code>")
        })
        .into_owned()
}

/// `> quote` → `<blockquote>`.
pub fn block_quotes(text: &str) -> String {
    BLOCK_QUOTE
        .replace_all(text, "<blockquote>${1}</blockquote>")
        .into_owned()
}

/// `#`, `##`, `###` → `h1`–`h3`.
pub fn headers(text: &str) -> String {
    HEADER
        .replace_all(text, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>", caps[2].trim_end())
        })
        .into_owned()
}

/// `**bold**` → `<strong>`.
pub fn bold(text: &str) -> String {
    BOLD.replace_all(text, "<strong>${1}</strong>").into_owned()
}

/// `*italic*` → `<em>`.  Asterisks surrounded by spaces (`2 * 3`) are left alone.
pub fn italic(text: &str) -> String {
    ITALIC.replace_all(text, "<em>${1}</em>").into_owned()
}

/// A line of three or more dashes → `<hr>`.
pub fn rules(text: &str) -> String {
    RULE.replace_all(text, "<hr>").into_owned()
}

/// `- item` or `* item` → `<li>`.
pub fn unordered_items(text: &str) -> String {
    UNORDERED_ITEM
        .replace_all(text, "<li>${1}</li>")
        .into_owned()
}

/// `3. item` → `<li value="3">`; the value marks the item as belonging to an ordered list.
pub fn ordered_items(text: &str) -> String {
    ORDERED_ITEM
        .replace_all(text, "<li value=\"${1}\">${2}</li>")
        .into_owned()
}

/// `[text](url)` → anchor opening in a new tab.  Script-bearing schemes stay literal.
///
/// Runs before emphasis, so asterisks in the URL are encoded to keep them out of the markup.
pub fn links(text: &str) -> String {
    LINK.replace_all(text, |caps: &Captures| {
        let label = &caps[1];
        let url = &caps[2];
        if is_safe_url(url) {
            let url = url.replace('*', "&#42;");
            format!("<a href=\"{url}\" target=\"_blank\" rel=\"noopener\">{label}</a>")
        } else {
            caps[0].to_string()
        }
    })
    .into_owned()
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    const SCHEMES: &[&str] = &["http://", "https://", "mailto:"];
    if SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return true;
    }
    // Relative and fragment URLs carry no scheme.
    match lower.find(':') {
        None => true,
        Some(colon) => lower[..colon].contains('/') || lower[..colon].contains('#'),
    }
}
