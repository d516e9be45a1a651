//! Interactive chat application for conversing with NexusAI.
//!
//! This binary provides a streaming REPL interface for chatting with a NexusAI backend.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage against http://localhost:8000
//! nexus-chat
//!
//! # Talk to another backend with a different model
//! nexus-chat --base-url http://nexus.internal:8000 --model GPT-4o
//!
//! # Disable colors (useful for piping output)
//! nexus-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new chat
//! - `/chats` - List chats
//! - `/attach <path>` - Send an image with the next prompt
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use nexuschat::about;
use nexuschat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use nexuschat::{Attachment, Chat, MODELS, Role};

/// Main entry point for the nexus-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("nexus-chat [OPTIONS]");
    init_tracing();

    let config = ChatConfig::from(args).load_preferences();
    let use_color = config.use_color;

    let mut session = ChatSession::new(config)?;
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color_and_interrupt(use_color, interrupted.clone());

    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("{} (model: {})", about::APP_TITLE, session.model());
    println!("Type /help for commands, /quit to exit\n");

    let mut pending: Option<Attachment> = None;

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let prompt = if pending.is_some() { "You [image]: " } else { "You: " };
        let readline = rl.readline(prompt);

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::New => {
                            session.store_mut().new_chat();
                            renderer.print_info("The next prompt starts a new chat.");
                        }
                        ChatCommand::Chats => print_chats(&session),
                        ChatCommand::Select(position) => match chat_id_at(&session, position) {
                            Some(id) => match session.store_mut().select(&id) {
                                Ok(()) => {
                                    if let Some(chat) = session.current_chat() {
                                        print_transcript(chat);
                                    }
                                }
                                Err(err) => renderer.print_error(&err.to_string()),
                            },
                            None => renderer.print_error(&format!("No chat at position {position}")),
                        },
                        ChatCommand::Rename(title) => match current_id(&session) {
                            Some(id) => match session.store_mut().rename(&id, &title) {
                                Ok(()) => renderer.print_info(&format!("Renamed to: {title}")),
                                Err(err) => renderer.print_error(&err.to_string()),
                            },
                            None => renderer.print_error("No chat is selected."),
                        },
                        ChatCommand::Star => match current_id(&session) {
                            Some(id) => match session.store_mut().toggle_star(&id) {
                                Ok(true) => renderer.print_info("Chat starred."),
                                Ok(false) => renderer.print_info("Chat unstarred."),
                                Err(err) => renderer.print_error(&err.to_string()),
                            },
                            None => renderer.print_error("No chat is selected."),
                        },
                        ChatCommand::Delete(position) => {
                            let id = match position {
                                Some(position) => chat_id_at(&session, position),
                                None => current_id(&session),
                            };
                            match id {
                                Some(id) => match session.store_mut().delete(&id) {
                                    Ok(chat) => {
                                        renderer.print_info(&format!("Deleted: {}", chat.title))
                                    }
                                    Err(err) => renderer.print_error(&err.to_string()),
                                },
                                None => renderer.print_error("No such chat."),
                            }
                        }
                        ChatCommand::Retry(position) => {
                            println!("NexusAI:");
                            let result = match position {
                                Some(position) => session.retry(position - 1, &mut renderer).await,
                                None => session.retry_last(&mut renderer).await,
                            };
                            if let Err(err) = result {
                                renderer.print_error(&err.to_string());
                            }
                        }
                        ChatCommand::Model(None) => {
                            let model = session.model();
                            renderer.print_info(&format!(
                                "Model: {} ({})",
                                model.key, model.description
                            ));
                        }
                        ChatCommand::Model(Some(name)) => match session.set_model(&name) {
                            Ok(model) => {
                                renderer.print_info(&format!("Model changed to: {}", model.key));
                                if pending.is_some() && !model.supports_vision {
                                    renderer.print_info(
                                        "This model cannot read the pending image attachment.",
                                    );
                                }
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Models => print_models(session.model().key),
                        ChatCommand::Attach(path) => match Attachment::from_path(&path) {
                            Ok(attachment) => {
                                renderer.print_info(&format!(
                                    "Attached {} ({} bytes)",
                                    attachment.file_name,
                                    attachment.bytes.len()
                                ));
                                pending = Some(attachment);
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Detach => {
                            if pending.take().is_some() {
                                renderer.print_info("Attachment removed.");
                            } else {
                                renderer.print_info("No attachment pending.");
                            }
                        }
                        ChatCommand::Theme => match session.toggle_theme() {
                            Ok(theme) => renderer.print_info(&format!("Theme: {theme}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Export(path) => match session.export_current(&path) {
                            Ok(()) => renderer.print_info(&format!("Chat exported to {path}")),
                            Err(err) => {
                                renderer.print_error(&format!("Failed to export chat: {err}"))
                            }
                        },
                        ChatCommand::Save(path) => match session.save_chats_to(&path) {
                            Ok(()) => renderer.print_info(&format!("Chats saved to {path}")),
                            Err(err) => {
                                renderer.print_error(&format!("Failed to save chats: {err}"))
                            }
                        },
                        ChatCommand::Load(path) => match session.load_chats_from(&path) {
                            Ok(count) => {
                                renderer.print_info(&format!("Loaded {count} chats from {path}"))
                            }
                            Err(err) => {
                                renderer.print_error(&format!("Failed to load chats: {err}"))
                            }
                        },
                        ChatCommand::Forget => match session.forget().await {
                            Ok(()) => renderer.print_info("The assistant's memory was cleared."),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::About => println!("{}", about::render_text()),
                        ChatCommand::Stats => print_stats(&session),
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                println!("NexusAI:");
                match session.send(line, pending.clone(), &mut renderer).await {
                    Ok(_) => pending = None,
                    Err(e) => renderer.print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn current_id(session: &ChatSession) -> Option<String> {
    session.store().current_id().map(str::to_string)
}

fn chat_id_at(session: &ChatSession, position: usize) -> Option<String> {
    session
        .store()
        .list()
        .get(position.checked_sub(1)?)
        .map(|chat| chat.id.clone())
}

fn print_chats(session: &ChatSession) {
    let chats = session.store().list();
    if chats.is_empty() {
        println!("    No chats yet.");
        return;
    }
    let current = session.store().current_id();
    for (i, chat) in chats.iter().enumerate() {
        let marker = if Some(chat.id.as_str()) == current { ">" } else { " " };
        let star = if chat.starred { "*" } else { " " };
        println!("  {marker}{star}{:>3}. {}", i + 1, chat.title);
        if !chat.preview.is_empty() {
            println!("          {}", chat.preview);
        }
    }
}

fn print_transcript(chat: &Chat) {
    println!("    {}", chat.title);
    for (i, message) in chat.messages.iter().enumerate() {
        let who = match message.role {
            Role::User => "You",
            Role::Assistant => "NexusAI",
        };
        let attachment = message
            .attachment
            .as_deref()
            .map(|name| format!(" [{name}]"))
            .unwrap_or_default();
        println!(
            "{:>3}. {who} ({}){attachment}:",
            i + 1,
            message.display_time()
        );
        println!("{}", message.content);
    }
}

fn print_models(current: &str) {
    println!("    Models:");
    for model in MODELS {
        let marker = if model.key == current { "*" } else { " " };
        let vision = if model.supports_vision { "  [images]" } else { "" };
        println!(
            "     {marker} {:<12} {}{vision}",
            model.key, model.description
        );
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    let activity = session.activity();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Session: {}", stats.session_id);
    println!("      Theme: {}", stats.theme);
    println!("      Chats: {}", stats.chat_count);
    println!("      Messages in chat: {}", stats.message_count);
    println!("      Prompts sent: {}", stats.total_requests);
    println!("      Failed replies: {}", stats.failed_requests);
    println!("      Replies with web search: {}", stats.search_replies);
    println!(
        "      Status: {}",
        if activity.is_loading() { "streaming" } else { "idle" }
    );
}
