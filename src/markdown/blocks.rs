//! Paragraphs, line breaks, and list grouping.

use super::fence;

const BLOCK_OPENERS: &[&str] = &[
    "<h1>",
    "<h2>",
    "<h3>",
    "<hr>",
    "<table>",
    "<li>",
    "<li value=",
    "<blockquote>",
];

/// Returns true if a line was turned into a block element by an earlier stage.
pub fn is_block_line(line: &str) -> bool {
    let line = line.trim_start();
    BLOCK_OPENERS.iter().any(|tag| line.starts_with(tag)) || fence::is_placeholder(line)
}

/// Convert blank-line separated text into paragraphs.
///
/// Runs of inline lines become one `<p>` with `<br>` between lines.  Block lines are emitted
/// bare, so no break follows a closing heading, rule, table, list item, or quote.  Blank and
/// whitespace-only lines never produce empty paragraphs or doubled breaks.
pub fn paragraphs(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 16);
    let mut inline: Vec<&str> = Vec::new();

    for block in text.split("\n\n") {
        for line in block.split('\n') {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if is_block_line(line) {
                flush_paragraph(&mut inline, &mut html);
                html.push_str(line.trim_start());
            } else {
                inline.push(line);
            }
        }
        flush_paragraph(&mut inline, &mut html);
    }

    html
}

fn flush_paragraph(lines: &mut Vec<&str>, html: &mut String) {
    if lines.is_empty() {
        return;
    }
    html.push_str("<p>");
    html.push_str(&lines.join("<br>"));
    html.push_str("</p>");
    lines.clear();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn open(self) -> &'static str {
        match self {
            ListKind::Unordered => "<ul>",
            ListKind::Ordered => "<ol>",
        }
    }

    fn close(self) -> &'static str {
        match self {
            ListKind::Unordered => "</ul>",
            ListKind::Ordered => "</ol>",
        }
    }
}

/// Wrap each run of adjacent list items in `<ul>` or `<ol>`.
///
/// Ordered items carry a `value` attribute; a change of kind starts a new list.
pub fn group_lists(html: &str) -> String {
    const CLOSE: &str = "</li>";
    let mut out = String::with_capacity(html.len() + 16);
    let mut open: Option<ListKind> = None;
    let mut rest = html;

    while let Some(start) = find_item(rest) {
        let Some(len) = rest[start..].find(CLOSE).map(|end| end + CLOSE.len()) else {
            break;
        };
        let (before, tail) = rest.split_at(start);
        let item = &tail[..len];
        let kind = if item.starts_with("<li value=") {
            ListKind::Ordered
        } else {
            ListKind::Unordered
        };

        if (!before.is_empty() || open != Some(kind))
            && let Some(current) = open.take()
        {
            out.push_str(current.close());
        }
        out.push_str(before);
        if open.is_none() {
            out.push_str(kind.open());
            open = Some(kind);
        }
        out.push_str(item);
        rest = &tail[len..];
    }

    if let Some(current) = open {
        out.push_str(current.close());
    }
    out.push_str(rest);
    out
}

fn find_item(html: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = html[offset..].find("<li") {
        let at = offset + pos;
        let next = html[at + 3..].chars().next();
        if matches!(next, Some('>') | Some(' ')) {
            return Some(at);
        }
        offset = at + 3;
    }
    None
}
