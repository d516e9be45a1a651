//! Fenced code blocks.
//!
//! Fences are cut out of the text before any other stage runs and replaced with opaque
//! placeholder tokens.  The tokens survive every later stage untouched and are swapped back
//! for the pre-rendered fragments at the very end.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::escape_code;

/// Delimits placeholder tokens; stripped from input before extraction so tokens are unique.
pub(crate) const TOKEN_MARK: char = '\u{0}';

static CLOSED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([A-Za-z0-9_+#.\-]*)[ \t]*\n([\s\S]*?)```").expect("fence regex is valid")
});

static OPEN_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```([A-Za-z0-9_+#.\-]*)[ \t]*\n").expect("open fence regex is valid")
});

static TRAILING_TICKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?`{1,2}$").expect("tick regex is valid"));

/// Returns the placeholder token for the `index`th fence.
pub fn placeholder(index: usize) -> String {
    format!("{TOKEN_MARK}FENCE{index}{TOKEN_MARK}")
}

/// Returns true if `line` is exactly one placeholder token.
pub fn is_placeholder(line: &str) -> bool {
    line.len() > 2
        && line.starts_with(TOKEN_MARK)
        && line.ends_with(TOKEN_MARK)
        && line[1..line.len() - 1].starts_with("FENCE")
}

/// Replace every fence with a placeholder and return the rendered fragments.
///
/// Complete fences may appear anywhere.  A fence that is opened at the start of a line and
/// never closed (the common state while a reply streams) runs to the end of the text.
pub fn extract(text: &str) -> (String, Vec<String>) {
    let mut fragments = Vec::new();
    let replaced = CLOSED_FENCE.replace_all(text, |caps: &Captures| {
        let lang = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        let body = body.strip_suffix('\n').unwrap_or(body);
        fragments.push(render_code_block(lang, body));
        format!("\n\n{}\n\n", placeholder(fragments.len() - 1))
    });
    let mut text = replaced.into_owned();

    if let Some(caps) = OPEN_FENCE.captures(&text) {
        let (start, end) = match caps.get(0) {
            Some(m) => (m.start(), m.end()),
            None => return (text, fragments),
        };
        let lang = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let body = TRAILING_TICKS.replace(&text[end..], "").into_owned();
        fragments.push(render_code_block(&lang, &body));
        text.truncate(start);
        text.push_str("\n\n");
        text.push_str(&placeholder(fragments.len() - 1));
    }

    (text, fragments)
}

/// Render a code block fragment with a header naming its language.
pub fn render_code_block(lang: &str, body: &str) -> String {
    let label = if lang.is_empty() { "code" } else { lang };
    let class = if lang.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{lang}\"")
    };
    format!(
        "<div class=\"code-block\"><div class=\"code-header\"><span>{label}</span></div><pre><code{class}>{}</code></pre></div>",
        escape_code(body)
    )
}

/// Swap placeholder tokens back for their fragments.
pub fn restore(html: &str, fragments: &[String]) -> String {
    let mut html = html.to_string();
    for (index, fragment) in fragments.iter().enumerate() {
        let token = placeholder(index);
        let wrapped = format!("<p>{token}</p>");
        if html.contains(&wrapped) {
            html = html.replace(&wrapped, fragment);
        }
        html = html.replace(&token, fragment);
    }
    html
}
