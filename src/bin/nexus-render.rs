//! Renders markdown files to HTML the way chat replies are rendered.
//!
//! ```bash
//! # Render a reply body to stdout
//! nexus-render reply.md
//!
//! # Wrap it in a standalone page using the light theme
//! nexus-render --page --theme light reply.md > reply.html
//!
//! # Read from stdin
//! cat reply.md | nexus-render
//! ```

use std::io::{Read, Write};

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use nexuschat::export::chat_to_html;
use nexuschat::markdown::to_html;
use nexuschat::{Chat, Message, Theme};

/// Command-line arguments for the nexus-render tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Wrap the output in a standalone HTML page.
    #[arrrg(flag, "Emit a standalone HTML page")]
    page: bool,

    /// Theme of the standalone page.
    #[arrrg(optional, "Page theme: dark, light (default: dark)", "THEME")]
    theme: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, files) = Args::from_command_line_relaxed("nexus-render [OPTIONS] [FILES]...");
    let theme: Theme = match args.theme.as_deref() {
        Some(theme) => theme.parse()?,
        None => Theme::default(),
    };

    let mut inputs = Vec::with_capacity(files.len().max(1));
    if files.is_empty() {
        let mut markdown = String::new();
        std::io::stdin().read_to_string(&mut markdown)?;
        inputs.push(("stdin".to_string(), markdown));
    } else {
        for file in files {
            let markdown = std::fs::read_to_string(&file)
                .map_err(|err| format!("could not read {file}: {err}"))?;
            inputs.push((file, markdown));
        }
    }

    let mut stdout = std::io::stdout().lock();
    for (name, markdown) in inputs {
        if args.page {
            let mut chat = Chat::new(name);
            let mut reply = Message::assistant_placeholder();
            reply.content = markdown;
            reply.is_streaming = false;
            chat.messages.push(reply);
            writeln!(stdout, "{}", chat_to_html(&chat, theme))?;
        } else {
            writeln!(stdout, "{}", to_html(&markdown))?;
        }
    }
    Ok(())
}
