//! Pipe tables.

use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|(?:[ \t]*:?-+:?[ \t]*\|)+$").expect("separator regex is valid")
});

/// Replace runs of two or more pipe-delimited lines with HTML tables.
///
/// Each table is emitted on a single line so that later line-oriented stages leave it alone.
/// A single pipe line, or a run made only of separator rows, is left as text.
pub fn render_tables(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if is_table_line(line) {
            run.push(line);
            continue;
        }
        flush(&mut run, &mut out);
        out.push(line.to_string());
    }
    flush(&mut run, &mut out);

    out.join("\n")
}

fn is_table_line(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2 && line.starts_with('|') && line.ends_with('|')
}

fn flush(run: &mut Vec<&str>, out: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    let rendered = if run.len() >= 2 { render_table(run) } else { None };
    match rendered {
        Some(table) => out.push(table),
        None => out.extend(run.iter().map(|line| line.to_string())),
    }
    run.clear();
}

fn render_table(lines: &[&str]) -> Option<String> {
    let mut rows = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !SEPARATOR_ROW.is_match(line));
    let header = rows.next()?;

    let mut html = String::from("<table><thead><tr>");
    for cell in cells(header) {
        html.push_str(&format!("<th>{cell}</th>"));
    }
    html.push_str("</tr></thead>");

    let body: Vec<&str> = rows.collect();
    if !body.is_empty() {
        html.push_str("<tbody>");
        for row in body {
            html.push_str("<tr>");
            for cell in cells(row) {
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody>");
    }
    html.push_str("</table>");
    Some(html)
}

fn cells(row: &str) -> impl Iterator<Item = &str> {
    let inner = row
        .strip_prefix('|')
        .and_then(|r| r.strip_suffix('|'))
        .unwrap_or(row);
    inner.split('|').map(str::trim)
}
