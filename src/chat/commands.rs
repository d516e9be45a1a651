//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`.  They stand in for the
//! buttons and shortcuts of a graphical client: starting a chat, switching between chats,
//! attaching an image, toggling the theme, and so on.  Commands are never sent to the backend.

/// A parsed chat command.
///
/// Positions are 1-based, as printed by `/chats` and by the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Deselect the current chat; the next prompt starts a new one.
    New,

    /// List chats, starred first.
    Chats,

    /// Select the chat at a position of the `/chats` list.
    Select(usize),

    /// Rename the current chat.
    Rename(String),

    /// Star or unstar the current chat.
    Star,

    /// Delete the chat at a position of the `/chats` list, or the current chat.
    Delete(Option<usize>),

    /// Resend the prompt of a message, or of the last reply.
    Retry(Option<usize>),

    /// Change the model, or show the current one.
    Model(Option<String>),

    /// List the model catalog.
    Models,

    /// Attach an image file to the next prompt.
    Attach(String),

    /// Drop the pending attachment.
    Detach,

    /// Toggle between the light and dark themes.
    Theme,

    /// Write the current chat to an HTML file.
    Export(String),

    /// Save every chat to a JSON file.
    Save(String),

    /// Replace every chat with those in a JSON file.
    Load(String),

    /// Ask the backend to forget this session's memory.
    Forget,

    /// Show the about page.
    About,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use nexuschat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model GPT-4o").is_some());
/// assert!(parse_command("Hello, Nexus!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "chats" | "list" => ChatCommand::Chats,
        "select" | "open" => match argument {
            Some(arg) => parse_position(arg, ChatCommand::Select, "/select"),
            None => ChatCommand::Invalid("/select requires a chat number".to_string()),
        },
        "rename" => match argument {
            Some(title) => ChatCommand::Rename(title.to_string()),
            None => ChatCommand::Invalid("/rename requires a title".to_string()),
        },
        "star" => ChatCommand::Star,
        "delete" => match argument {
            Some(arg) => parse_position(arg, |n| ChatCommand::Delete(Some(n)), "/delete"),
            None => ChatCommand::Delete(None),
        },
        "retry" => match argument {
            Some(arg) => parse_position(arg, |n| ChatCommand::Retry(Some(n)), "/retry"),
            None => ChatCommand::Retry(None),
        },
        "model" => ChatCommand::Model(argument.map(|s| s.to_string())),
        "models" => ChatCommand::Models,
        "attach" | "image" => match argument {
            Some(path) => ChatCommand::Attach(path.to_string()),
            None => ChatCommand::Invalid("/attach requires an image path".to_string()),
        },
        "detach" => ChatCommand::Detach,
        "theme" => ChatCommand::Theme,
        "export" => match argument {
            Some(path) => ChatCommand::Export(path.to_string()),
            None => ChatCommand::Invalid("/export requires a file path".to_string()),
        },
        "save" => match argument {
            Some(path) => ChatCommand::Save(path.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(path) => ChatCommand::Load(path.to_string()),
            None => ChatCommand::Invalid("/load requires a file path".to_string()),
        },
        "forget" => ChatCommand::Forget,
        "about" => ChatCommand::About,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_position<F>(argument: &str, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(usize) -> ChatCommand,
{
    match argument.parse::<usize>() {
        Ok(value) if value > 0 => constructor(value),
        _ => ChatCommand::Invalid(format!("{} expects a number from the list", name)),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat with the next prompt
  /chats                 List chats (starred first)
  /select <n>            Switch to chat n of /chats
  /rename <title>        Rename the current chat
  /star                  Star or unstar the current chat
  /delete [n]            Delete chat n, or the current chat
  /retry [n]             Resend message n, or the last prompt
  /model [name]          Show or change the model
  /models                List available models
  /attach <path>         Attach an image to the next prompt
  /detach                Drop the pending attachment
  /theme                 Toggle light/dark theme
  /export <file>         Export the current chat as HTML
  /save <file>           Save all chats to a JSON file
  /load <file>           Load chats from a JSON file
  /forget                Clear the assistant's memory of this session
  /about                 About NexusAI
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_chat_management() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/CHATS"), Some(ChatCommand::Chats));
        assert_eq!(parse_command("/select 2"), Some(ChatCommand::Select(2)));
        assert_eq!(parse_command("/star"), Some(ChatCommand::Star));
        assert_eq!(parse_command("/delete"), Some(ChatCommand::Delete(None)));
        assert_eq!(parse_command("/delete 3"), Some(ChatCommand::Delete(Some(3))));
        assert_eq!(
            parse_command("/rename  Rust questions "),
            Some(ChatCommand::Rename("Rust questions".to_string()))
        );
    }

    #[test]
    fn positions_must_be_positive() {
        assert!(matches!(
            parse_command("/select 0"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
        assert!(matches!(
            parse_command("/retry two"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("/retry")
        ));
        assert!(matches!(
            parse_command("/select"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_retry() {
        assert_eq!(parse_command("/retry"), Some(ChatCommand::Retry(None)));
        assert_eq!(parse_command("/retry 4"), Some(ChatCommand::Retry(Some(4))));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model GPT-4o"),
            Some(ChatCommand::Model(Some("GPT-4o".to_string())))
        );
        assert_eq!(parse_command("/model"), Some(ChatCommand::Model(None)));
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
    }

    #[test]
    fn parse_attachments() {
        assert_eq!(
            parse_command("/attach ./cat photo.png"),
            Some(ChatCommand::Attach("./cat photo.png".to_string()))
        );
        assert_eq!(parse_command("/detach"), Some(ChatCommand::Detach));
        assert!(matches!(
            parse_command("/attach"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_files_and_misc() {
        assert_eq!(
            parse_command("/export chat.html"),
            Some(ChatCommand::Export("chat.html".to_string()))
        );
        assert_eq!(
            parse_command("/save chats.json"),
            Some(ChatCommand::Save("chats.json".to_string()))
        );
        assert_eq!(
            parse_command("/load chats.json"),
            Some(ChatCommand::Load("chats.json".to_string()))
        );
        assert_eq!(parse_command("/theme"), Some(ChatCommand::Theme));
        assert_eq!(parse_command("/forget"), Some(ChatCommand::Forget));
        assert_eq!(parse_command("/about"), Some(ChatCommand::About));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, Nexus!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_every_command() {
        let help = help_text();
        for command in [
            "/new", "/chats", "/select", "/rename", "/star", "/delete", "/retry", "/model",
            "/models", "/attach", "/detach", "/theme", "/export", "/save", "/load", "/forget",
            "/about", "/stats", "/help", "/quit",
        ] {
            assert!(help.contains(command), "{command}");
        }
    }
}
