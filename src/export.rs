//! Standalone HTML transcripts.

use crate::markdown::{escape_html, to_html};
use crate::preferences::Theme;
use crate::types::{Chat, Role};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
body.dark{background:#1a1a1a;color:#e8e8e8}\
body.light{background:#ffffff;color:#1a1a1a}\
.message{margin:1.5rem 0}\
.meta{font-size:.8rem;opacity:.7}\
.code-block{border:1px solid #8884;border-radius:6px;overflow:auto}\
.code-header{font-size:.75rem;padding:.25rem .5rem;border-bottom:1px solid #8884}\
pre{margin:0;padding:.5rem}\
table{border-collapse:collapse}th,td{border:1px solid #8886;padding:.25rem .5rem}";

/// Renders a chat as a complete HTML page.
///
/// Assistant replies go through the markdown renderer; user messages are escaped and keep their
/// line breaks.
pub fn chat_to_html(chat: &Chat, theme: Theme) -> String {
    let title = escape_html(&chat.title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n\
         <body class=\"{theme}\">\n<h1>{title}</h1>\n"
    );

    for message in &chat.messages {
        let body = match message.role {
            Role::User => format!("<p>{}</p>", escape_html(&message.content).replace('\n', "<br>")),
            Role::Assistant => to_html(&message.content),
        };
        let attachment = message
            .attachment
            .as_deref()
            .map(|name| format!(" &middot; {}", escape_html(name)))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div class=\"message {role}\">\n<div class=\"meta\">{role} &middot; {time}{attachment}</div>\n{body}\n</div>\n",
            role = message.role,
            time = message.display_time(),
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}
