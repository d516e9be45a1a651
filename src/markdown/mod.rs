//! Markdown to HTML for chat replies.
//!
//! [`to_html`] runs on every update of a streaming reply, so it accepts any prefix of a
//! document: unterminated fences, half-typed tables, and stray pipes all render as something
//! reasonable and never panic.  Blocks that are complete stay stable as the text grows.
//!
//! The conversion is an ordered pipeline of pure stages.  Order matters: fences are cut out
//! first so nothing later can touch code, and prose is escaped before any tag is emitted so
//! the only markup in the output is markup the stages produced.
//!
//! 1. [`fence::extract`] swaps fenced code for placeholder tokens.
//! 2. [`escape_html`] escapes the remaining prose.
//! 3. [`normalize_whitespace`] canonicalizes paragraph boundaries.
//! 4. [`table::render_tables`] turns pipe runs into tables.
//! 5. [`inline::substitute`] handles code spans, quotes, headers, emphasis, rules, list items,
//!    and links.
//! 6. [`blocks::paragraphs`] builds paragraphs and line breaks around block lines.
//! 7. [`blocks::group_lists`] wraps item runs in `<ul>`/`<ol>`.
//! 8. [`fence::restore`] puts the code fragments back.

pub mod blocks;
pub mod fence;
pub mod inline;
pub mod table;

use std::sync::LazyLock;

use regex::Regex;

use crate::observability::RENDER_CALLS;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+$").expect("blank line regex is valid"));
static EXTRA_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline regex is valid"));

/// Render markdown to sanitized HTML.
///
/// Blank input renders to an empty string; anything else renders to one or more block
/// elements.
pub fn to_html(markdown: &str) -> String {
    RENDER_CALLS.click();
    let text = markdown
        .replace("\r\n", "\n")
        .replace(fence::TOKEN_MARK, "");
    if text.trim().is_empty() {
        return String::new();
    }

    let (text, fences) = fence::extract(&text);
    let text = escape_html(&text);
    let text = normalize_whitespace(&text);
    let text = table::render_tables(&text);
    let text = inline::substitute(&text);
    let html = blocks::paragraphs(&text);
    let html = blocks::group_lists(&html);
    fence::restore(&html, &fences)
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_code(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Collapse three or more newlines (and whitespace-only lines between them) to exactly two.
pub fn normalize_whitespace(text: &str) -> String {
    let text = BLANK_LINE.replace_all(text, "");
    EXTRA_NEWLINES.replace_all(&text, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_TAGS: &[&str] = &[
        "<p>",
        "<h1>",
        "<h2>",
        "<h3>",
        "<hr>",
        "<table>",
        "<ul>",
        "<ol>",
        "<li",
        "<blockquote>",
        "<div class=\"code-block\">",
    ];

    fn starts_with_block(html: &str) -> bool {
        BLOCK_TAGS.iter().any(|tag| html.starts_with(tag))
    }

    fn count(html: &str, tag: &str) -> usize {
        html.matches(tag).count()
    }

    #[test]
    fn plain_text_is_a_paragraph() {
        assert_eq!(to_html("Hello"), "<p>Hello</p>");
        assert_eq!(to_html(""), "");
        assert_eq!(to_html("  \n\n "), "");
    }

    #[test]
    fn user_markup_is_escaped() {
        let html = to_html("<script>alert(\"x\")</script> & <b>hi</b>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp;"));
    }

    #[test]
    fn no_raw_angle_brackets_from_content() {
        let inputs = [
            "a < b > c",
            "# Heading with <tag>\n\n> quoted <x>\n- item <y>\n1. one <z>",
            "**<bold>** and *<em>*",
            "[<label>](https://example.com)",
            "<<<>>>",
        ];
        for input in inputs {
            let html = to_html(input);
            assert!(starts_with_block(&html), "{input:?} -> {html}");
            // Strip the tags the renderer emits; nothing angle-bracketed may remain.
            let stripped = regex::Regex::new(
                r#"</?(?:p|h[1-3]|hr|table|thead|tbody|tr|th|td|ul|ol|li|blockquote|strong|em|code|a|br)(?: [^<>]*)?>"#,
            )
            .unwrap()
            .replace_all(&html, "");
            assert!(
                !stripped.contains('<') && !stripped.contains('>'),
                "{input:?} -> {html}"
            );
        }
    }

    #[test]
    fn nonempty_input_yields_block_output() {
        for input in ["x", "- a", "1. a", "---", "|a|", "> q", "`c`", "```", "**"] {
            let html = to_html(input);
            assert!(!html.is_empty(), "{input:?}");
            assert!(starts_with_block(&html), "{input:?} -> {html}");
        }
    }

    #[test]
    fn fence_round_trip() {
        let html = to_html("Run this:\n\n```python\nprint(1)\n**bold**\n```\n\nDone.");
        assert!(html.contains("<span>python</span>"));
        assert!(html.contains("<code class=\"language-python\">print(1)\n**bold**</code>"));
        assert!(!html.contains("<strong>bold</strong>"));
        assert!(html.starts_with("<p>Run this:</p><div class=\"code-block\">"));
        assert!(html.ends_with("</div><p>Done.</p>"));
    }

    #[test]
    fn fence_body_is_escaped_once() {
        let html = to_html("```html\n<div>&nbsp;</div>\n```");
        assert!(html.contains("&lt;div&gt;&amp;nbsp;&lt;/div&gt;"));
        assert!(!html.contains("&amp;lt;"));
    }

    #[test]
    fn table_detection() {
        let html = to_html("|a|b|\n|---|---|\n|1|2|");
        assert_eq!(count(&html, "<table>"), 1);
        assert_eq!(count(&html, "<th>"), 2);
        assert_eq!(count(&html, "<tr>"), 2);
        assert!(html.contains("<th>a</th><th>b</th>"));
        assert!(html.contains("<td>1</td><td>2</td>"));

        let html = to_html("|a|b|");
        assert!(!html.contains("<table>"));
        assert_eq!(html, "<p>|a|b|</p>");
    }

    #[test]
    fn headings_lists_and_rules() {
        let html = to_html("# Title\nIntro line\n\n- one\n- two\n\n---\n\n1. first\n2. second");
        assert_eq!(
            html,
            "<h1>Title</h1><p>Intro line</p><ul><li>one</li><li>two</li></ul><hr>\
             <ol><li value=\"1\">first</li><li value=\"2\">second</li></ol>"
        );
    }

    #[test]
    fn quotes_links_and_emphasis() {
        let html = to_html("> **Note:** see [the guide](https://example.com/guide).");
        assert_eq!(
            html,
            "<blockquote><strong>Note:</strong> see <a href=\"https://example.com/guide\" \
             target=\"_blank\" rel=\"noopener\">the guide</a>.</blockquote>"
        );
    }

    #[test]
    fn asterisks_in_urls_are_not_emphasis() {
        assert_eq!(
            to_html("see [x](https://e.com/*a*/b)"),
            "<p>see <a href=\"https://e.com/&#42;a&#42;/b\" target=\"_blank\" \
             rel=\"noopener\">x</a></p>"
        );
    }

    #[test]
    fn line_breaks_within_paragraph() {
        assert_eq!(to_html("a\nb\n\n\n\nc"), "<p>a<br>b</p><p>c</p>");
        assert_eq!(to_html("a\r\nb"), "<p>a<br>b</p>");
    }

    #[test]
    fn malformed_input_never_panics() {
        let inputs = [
            "```",
            "```python\nprint(",
            "| a | b\n| 1",
            "|||\n|",
            "**unclosed bold",
            "[link](",
            "[](https://x)",
            "1.",
            "- ",
            "#",
            "\u{0}FENCE0\u{0}",
            "```\n```\n```",
            "> ",
            "é|ü|\n|—|",
        ];
        for input in inputs {
            let _ = to_html(input);
        }
    }

    #[test]
    fn smuggled_placeholder_is_removed() {
        let html = to_html("x \u{0}FENCE0\u{0} y\n```a\ncode\n```");
        assert_eq!(count(&html, "<div class=\"code-block\">"), 1);
        assert!(html.starts_with("<p>x FENCE0 y</p>"));
    }

    #[test]
    fn open_fence_renders_while_streaming() {
        let html = to_html("Here:\n```rust\nfn main() {");
        assert!(html.starts_with("<p>Here:</p><div class=\"code-block\">"));
        assert!(html.contains("fn main() {</code>"));
    }

    #[test]
    fn completed_blocks_survive_growth() {
        let document = "# Plan\n\nSome intro text.\n\n|k|v|\n|---|---|\n|a|1|\n\n\
                        - step one\n- step two\n\n```sh\ncargo build\n```\n\n> done\n\nTail";
        let boundaries: Vec<usize> = document.match_indices("\n\n").map(|(i, _)| i + 2).collect();
        let full = to_html(document);
        for end in boundaries {
            let prefix = to_html(&document[..end]);
            for tag in BLOCK_TAGS {
                assert!(
                    count(&prefix, tag) <= count(&full, tag),
                    "{tag} lost growing from {:?}",
                    &document[..end]
                );
            }
        }
    }

    #[test]
    fn every_prefix_renders() {
        let document = "## Steps\n1. **Install** `tool`\n2. Run:\n```bash\ntool --go\n```\n|a|b|\n|-|-|\n|1|2|";
        for (end, _) in document.char_indices() {
            let html = to_html(&document[..end]);
            if !document[..end].trim().is_empty() {
                assert!(starts_with_block(&html), "{:?} -> {html}", &document[..end]);
            }
        }
    }
}
