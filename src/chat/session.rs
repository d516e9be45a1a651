//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the chat store, submits prompts to
//! the backend, and drives a [`StreamConsumer`] over each reply.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::Error;
use crate::chat::config::ChatConfig;
use crate::client::{ChatTransport, NexusClient};
use crate::client_logger::ClientLogger;
use crate::consumer::{ActivityState, OpenReply, StreamConsumer, TurnOutcome, TurnStatus};
use crate::error::Result;
use crate::export::chat_to_html;
use crate::preferences::Theme;
use crate::render::Renderer;
use crate::sse::decode_frames;
use crate::store::ChatStore;
use crate::types::{Attachment, Chat, ChatRequest, Message, ModelOption, Role, StreamFrame};

/// Title given to a chat whose first prompt is only an image.
pub const IMAGE_CHAT_TITLE: &str = "Image";

/// A chat session that manages conversation state and backend interactions.
///
/// The session owns every chat and sends prompts on behalf of the current one.  Only one
/// prompt is in flight at a time; the loading flag in [`ActivityState`] enforces it.
pub struct ChatSession<T: ChatTransport = NexusClient> {
    transport: T,
    config: ChatConfig,
    store: ChatStore,
    activity: Arc<ActivityState>,
    logger: Option<Arc<dyn ClientLogger>>,
    request_count: u64,
    failure_count: u64,
    search_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for new prompts.
    pub model: &'static ModelOption,
    /// The session identifier sent to the backend.
    pub session_id: String,
    /// The active theme.
    pub theme: Theme,
    /// The number of chats.
    pub chat_count: usize,
    /// The number of messages in the current chat.
    pub message_count: usize,
    /// Total number of prompts sent.
    pub total_requests: u64,
    /// Prompts whose reply failed.
    pub failed_requests: u64,
    /// Replies for which the backend searched the web.
    pub search_replies: u64,
}

impl ChatSession<NexusClient> {
    /// Creates a new chat session talking HTTP to the configured backend.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = NexusClient::with_options(config.base_url.clone(), Some(config.timeout))?;
        Ok(Self::with_transport(client, config))
    }
}

impl<T: ChatTransport> ChatSession<T> {
    /// Creates a new chat session over a custom transport.
    pub fn with_transport(transport: T, config: ChatConfig) -> Self {
        Self {
            transport,
            config,
            store: ChatStore::new(),
            activity: Arc::new(ActivityState::new()),
            logger: None,
            request_count: 0,
            failure_count: 0,
            search_count: 0,
        }
    }

    /// Reports requests, frames and replies to `logger`.
    pub fn set_logger(&mut self, logger: Option<Arc<dyn ClientLogger>>) {
        self.logger = logger;
    }

    /// Sends a prompt and streams the reply into the current chat.
    ///
    /// This method:
    /// 1. Rejects blank prompts, concurrent prompts, and images the model cannot see
    /// 2. Creates and selects a chat if none is current
    /// 3. Appends the user message and an empty streaming reply
    /// 4. Streams the backend's reply into it, notifying the renderer per chunk
    ///
    /// # Errors
    ///
    /// Returns an error only when the prompt is rejected before anything is sent.  Failures
    /// after that are reported in the returned outcome; the reply then holds the apology text.
    pub async fn send(
        &mut self,
        prompt: &str,
        attachment: Option<Attachment>,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        if prompt.trim().is_empty() && attachment.is_none() {
            return Err(Error::validation(
                "Message cannot be empty",
                Some("message".to_string()),
            ));
        }
        let _loading = self
            .activity
            .begin()
            .ok_or_else(|| Error::busy("A reply is still streaming"))?;
        let model = self.config.model;
        if attachment.is_some() && !model.supports_vision {
            return Err(Error::validation(
                format!("{} cannot read images; choose a vision model", model.key),
                Some("attachment".to_string()),
            ));
        }

        let reply = self.open_reply(prompt, attachment.as_ref())?;
        renderer.start_reply(model.key);

        let request = ChatRequest::new(prompt, self.config.session_id.clone(), model.key);
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        self.request_count += 1;

        let mut consumer =
            StreamConsumer::new(reply, &self.activity).with_logger(self.logger.as_deref());
        let outcome = match attachment {
            Some(image) => {
                match self.transport.chat_with_image(&request, &image).await {
                    Ok(answer) if answer.success => {
                        let chunk = StreamFrame::chunk(answer.response);
                        let done = StreamFrame {
                            search_used: Some(answer.search_used),
                            ..StreamFrame::done()
                        };
                        consumer.apply(&mut self.store, &chunk, renderer);
                        consumer.apply(&mut self.store, &done, renderer);
                    }
                    Ok(_) => {
                        let err =
                            Error::streaming("the backend could not answer the image prompt", None);
                        consumer.fail(&mut self.store, &err, renderer);
                    }
                    Err(err) => consumer.fail(&mut self.store, &err, renderer),
                }
                consumer.outcome()
            }
            None => match self.transport.stream_chat(&request).await {
                Ok(bytes) => {
                    let frames = Box::pin(decode_frames(bytes));
                    consumer.consume(&mut self.store, frames, renderer).await
                }
                Err(err) => {
                    consumer.fail(&mut self.store, &err, renderer);
                    consumer.outcome()
                }
            },
        };

        if outcome.status == TurnStatus::Failed {
            self.failure_count += 1;
        }
        if outcome.search_used {
            self.search_count += 1;
        }
        Ok(outcome)
    }

    /// Resends the prompt of the message at `index` of the current chat.
    ///
    /// If `index` names a reply, the user message before it is resent.  That user message and
    /// everything after it are removed first, so the retry replays the prompt from scratch.
    pub async fn retry(
        &mut self,
        index: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        if self.activity.is_loading() {
            return Err(Error::busy("A reply is still streaming"));
        }
        let chat = self.store.current_mut().ok_or_else(no_current_chat)?;
        if index >= chat.messages.len() {
            return Err(Error::not_found(
                format!("No message at position {}", index + 1),
                Some("message".to_string()),
                None,
            ));
        }
        let prompt_index = chat.messages[..=index]
            .iter()
            .rposition(|m| m.role == Role::User)
            .ok_or_else(|| {
                Error::not_found(
                    "No prompt precedes that message",
                    Some("message".to_string()),
                    None,
                )
            })?;
        let prompt = chat.messages[prompt_index].content.clone();
        // Image bytes are not kept, so an image-only prompt cannot be replayed.
        if prompt.trim().is_empty() {
            return Err(Error::validation(
                "Only text prompts can be retried",
                Some("message".to_string()),
            ));
        }
        chat.messages.truncate(prompt_index);
        chat.refresh_preview();
        tracing::debug!(chat = %chat.id, prompt_index, "retrying prompt");

        self.send(&prompt, None, renderer).await
    }

    /// Resends the last prompt of the current chat.
    pub async fn retry_last(&mut self, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        let len = self
            .store
            .current()
            .map(|chat| chat.messages.len())
            .ok_or_else(no_current_chat)?;
        if len == 0 {
            return Err(Error::not_found(
                "The current chat has no messages",
                Some("message".to_string()),
                None,
            ));
        }
        self.retry(len - 1, renderer).await
    }

    /// Asks the backend to forget what it remembers about this session.
    pub async fn forget(&self) -> Result<()> {
        self.transport.clear_session(&self.config.session_id).await
    }

    /// Changes the model used for new prompts.
    pub fn set_model(&mut self, name: &str) -> Result<&'static ModelOption> {
        let model = ModelOption::find(name).ok_or_else(|| {
            Error::validation(format!("Unknown model: {name}"), Some("model".to_string()))
        })?;
        self.config.model = model;
        Ok(model)
    }

    /// Returns the current model.
    pub fn model(&self) -> &'static ModelOption {
        self.config.model
    }

    /// Switches between the light and dark themes and persists the choice.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.config.theme.toggle();
        self.config.preference_store().save_theme(theme)?;
        self.config.theme = theme;
        Ok(theme)
    }

    /// Returns the active theme.
    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the loading and tool status shared with the front-end.
    pub fn activity(&self) -> Arc<ActivityState> {
        Arc::clone(&self.activity)
    }

    /// Returns the chat store.
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Returns the chat store for mutation.
    pub fn store_mut(&mut self) -> &mut ChatStore {
        &mut self.store
    }

    /// Returns the current chat, if any.
    pub fn current_chat(&self) -> Option<&Chat> {
        self.store.current()
    }

    /// Writes the current chat to `path` as a standalone HTML page.
    pub fn export_current<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let chat = self.store.current().ok_or_else(no_current_chat)?;
        let html = chat_to_html(chat, self.config.theme);
        std::fs::write(path.as_ref(), html)
            .map_err(|err| Error::io("failed to write export file", err))
    }

    /// Saves every chat to `path` as JSON.
    pub fn save_chats_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let chats: Vec<Chat> = self.store.list().into_iter().cloned().collect();
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create chats file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &ChatsFile::new(chats)).map_err(|err| {
            Error::serialization("failed to serialize chats", Some(Box::new(err)))
        })
    }

    /// Replaces every chat with those saved at `path`.
    pub fn load_chats_from<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        if self.activity.is_loading() {
            return Err(Error::busy("A reply is still streaming"));
        }
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open chats file", err))?;
        let reader = BufReader::new(file);
        let saved: ChatsFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse chats file", Some(Box::new(err)))
        })?;
        let mut chats = saved.chats;
        for chat in &mut chats {
            for message in &mut chat.messages {
                message.is_streaming = false;
            }
        }
        let count = chats.len();
        self.store.load(chats);
        Ok(count)
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model,
            session_id: self.config.session_id.clone(),
            theme: self.config.theme,
            chat_count: self.store.len(),
            message_count: self.store.current().map_or(0, |c| c.messages.len()),
            total_requests: self.request_count,
            failed_requests: self.failure_count,
            search_replies: self.search_count,
        }
    }

    /// Selects or creates the chat for a prompt and appends the user message and reply.
    fn open_reply(&mut self, prompt: &str, attachment: Option<&Attachment>) -> Result<OpenReply> {
        let chat_id = match self.store.current_id() {
            Some(id) => id.to_string(),
            None => {
                let title = if prompt.trim().is_empty() {
                    IMAGE_CHAT_TITLE.to_string()
                } else {
                    Chat::title_from_prompt(prompt)
                };
                self.store.create(title)
            }
        };
        let model = self.config.model.key;
        let chat = self.store.get_mut(&chat_id)?;

        // A reply abandoned by a dropped send stays open; settle it.
        for message in chat.messages.iter_mut().filter(|m| m.is_streaming) {
            message.is_streaming = false;
        }

        let mut user = Message::user(prompt);
        if let Some(image) = attachment {
            user = user.with_attachment(image.file_name.clone());
        }
        chat.messages.push(user);
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();
        chat.messages.push(placeholder);
        chat.model = Some(model.to_string());
        chat.refresh_preview();

        Ok(OpenReply {
            chat_id,
            message_id,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ChatsFile {
    version: u8,
    chats: Vec<Chat>,
}

impl ChatsFile {
    fn new(chats: Vec<Chat>) -> Self {
        Self { version: 1, chats }
    }
}

fn no_current_chat() -> Error {
    Error::not_found("No chat is selected", Some("chat".to_string()), None)
}
