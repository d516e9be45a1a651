//! The streaming reply state machine.
//!
//! A [`StreamConsumer`] owns one in-flight reply.  It holds the reply by chat id and message id
//! ([`OpenReply`]) and applies decoded frames to it in arrival order until the stream ends.
//! Loading and tool status live in a shared [`ActivityState`] so a front-end can watch them
//! while the reply streams.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{STREAM_DURATION, STREAM_ERRORS, STREAM_UNTERMINATED};
use crate::render::Renderer;
use crate::store::ChatStore;
use crate::types::{Message, StreamFrame};

/// Reply text shown when a request fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Name reported to renderers while the backend searches the web.
pub const SEARCH_TOOL: &str = "web search";

/// Loading and tool status of a session, observable from other tasks.
#[derive(Debug, Default)]
pub struct ActivityState {
    loading: AtomicBool,
    tool_in_use: AtomicBool,
}

impl ActivityState {
    /// Creates an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Returns true while the backend reports a tool in use.
    pub fn is_tool_in_use(&self) -> bool {
        self.tool_in_use.load(Ordering::Acquire)
    }

    pub(crate) fn set_tool_in_use(&self, in_use: bool) {
        self.tool_in_use.store(in_use, Ordering::Release);
    }

    /// Raises the loading flag, or returns `None` if it is already raised.
    pub fn begin(self: &Arc<Self>) -> Option<LoadingGuard> {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(LoadingGuard {
            state: Arc::clone(self),
        })
    }
}

/// Clears the loading and tool flags when dropped.
#[derive(Debug)]
pub struct LoadingGuard {
    state: Arc<ActivityState>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state.tool_in_use.store(false, Ordering::Release);
        self.state.loading.store(false, Ordering::Release);
    }
}

/// Addresses the reply a consumer is filling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenReply {
    /// Chat that owns the reply.
    pub chat_id: String,
    /// The streaming assistant message.
    pub message_id: String,
}

/// How a reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The backend sent its terminal frame.
    Completed,
    /// The stream ended without a terminal frame; the reply was finalized anyway.
    Unterminated,
    /// The user interrupted the reply.
    Interrupted,
    /// The request or the stream failed; the reply holds the apology text.
    Failed,
}

/// Result of one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The reply that was filled.
    pub reply: OpenReply,
    /// How the reply ended.
    pub status: TurnStatus,
    /// Whether the backend searched the web for this reply.
    pub search_used: bool,
    /// Number of frames applied.
    pub frames: usize,
    /// Description of the failure, for [`TurnStatus::Failed`].
    pub error: Option<String>,
}

impl TurnOutcome {
    /// Returns true if the reply completed normally.
    pub fn is_completed(&self) -> bool {
        self.status == TurnStatus::Completed
    }

    /// Returns true if the reply failed.
    pub fn is_failed(&self) -> bool {
        self.status == TurnStatus::Failed
    }
}

/// What the consumer does after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// Stop reading; the reply is final.
    Stop,
}

/// Applies the frames of one stream to one open reply.
pub struct StreamConsumer<'a> {
    reply: OpenReply,
    activity: &'a ActivityState,
    logger: Option<&'a dyn ClientLogger>,
    search_used: bool,
    frames: usize,
    status: Option<TurnStatus>,
    error: Option<String>,
}

impl<'a> StreamConsumer<'a> {
    /// Creates a consumer for `reply`.
    pub fn new(reply: OpenReply, activity: &'a ActivityState) -> Self {
        Self {
            reply,
            activity,
            logger: None,
            search_used: false,
            frames: 0,
            status: None,
            error: None,
        }
    }

    /// Reports frames and the final reply to `logger`.
    pub fn with_logger(mut self, logger: Option<&'a dyn ClientLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the reply this consumer fills.
    pub fn reply(&self) -> &OpenReply {
        &self.reply
    }

    /// Applies one frame.
    ///
    /// A chunk is appended verbatim, `search_used` raises the tool status, and `done` finalizes
    /// the reply.  An `error` frame replaces the reply with the apology text.
    pub fn apply(
        &mut self,
        store: &mut ChatStore,
        frame: &StreamFrame,
        renderer: &mut dyn Renderer,
    ) -> Flow {
        if self.status.is_some() {
            return Flow::Stop;
        }
        self.frames += 1;
        if let Some(logger) = self.logger {
            logger.log_frame(frame);
        }

        if let Some(message) = &frame.error {
            self.fail(store, &Error::streaming(message.clone(), None), renderer);
            return Flow::Stop;
        }
        if let Some(chunk) = frame.chunk.as_deref().filter(|c| !c.is_empty()) {
            match self.open_message(store) {
                Some(message) => message.content.push_str(chunk),
                None => {
                    tracing::debug!(reply = ?self.reply, "reply vanished mid-stream");
                    self.status = Some(TurnStatus::Failed);
                    self.error = Some("reply no longer exists".to_string());
                    return Flow::Stop;
                }
            }
            renderer.print_text(chunk);
        }
        if frame.is_search_used() && !self.search_used {
            self.search_used = true;
            self.activity.set_tool_in_use(true);
            renderer.start_tool_use(SEARCH_TOOL);
        }
        if frame.is_done() {
            self.finish(store, TurnStatus::Completed, renderer);
            return Flow::Stop;
        }
        Flow::Continue
    }

    /// Reads frames until the reply is final and returns how it ended.
    ///
    /// Transport errors end the reply with the apology text; they are not returned.  A stream
    /// that ends without a terminal frame is finalized as [`TurnStatus::Unterminated`].
    pub async fn consume<S>(
        mut self,
        store: &mut ChatStore,
        mut frames: S,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome
    where
        S: Stream<Item = Result<StreamFrame>> + Unpin,
    {
        let start = Instant::now();
        while self.status.is_none() {
            if renderer.should_interrupt() {
                self.finish(store, TurnStatus::Interrupted, renderer);
                break;
            }
            match frames.next().await {
                Some(Ok(frame)) => {
                    self.apply(store, &frame, renderer);
                }
                Some(Err(err)) => {
                    self.fail(store, &err, renderer);
                }
                None => {
                    STREAM_UNTERMINATED.click();
                    tracing::debug!(
                        reply = ?self.reply,
                        frames = self.frames,
                        "stream ended without a done frame; finalizing reply"
                    );
                    self.finish(store, TurnStatus::Unterminated, renderer);
                }
            }
        }
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        self.outcome()
    }

    /// Replaces the reply with the apology text and finalizes it.
    pub fn fail(&mut self, store: &mut ChatStore, err: &Error, renderer: &mut dyn Renderer) {
        if self.status.is_some() {
            return;
        }
        STREAM_ERRORS.click();
        tracing::warn!(error = %err, reply = ?self.reply, "chat request failed");
        if let Some(message) = self.open_message(store) {
            message.content = APOLOGY.to_string();
        }
        self.error = Some(err.to_string());
        renderer.print_error(&err.to_string());
        self.finish(store, TurnStatus::Failed, renderer);
    }

    /// Returns the outcome so far.  A reply still open is reported as unterminated.
    pub fn outcome(&self) -> TurnOutcome {
        TurnOutcome {
            reply: self.reply.clone(),
            status: self.status.unwrap_or(TurnStatus::Unterminated),
            search_used: self.search_used,
            frames: self.frames,
            error: self.error.clone(),
        }
    }

    fn open_message<'s>(&self, store: &'s mut ChatStore) -> Option<&'s mut Message> {
        store
            .get_mut(&self.reply.chat_id)
            .ok()?
            .message_mut(&self.reply.message_id)
            .filter(|m| m.is_streaming)
    }

    fn finish(&mut self, store: &mut ChatStore, status: TurnStatus, renderer: &mut dyn Renderer) {
        self.status = Some(status);
        if self.search_used {
            self.activity.set_tool_in_use(false);
            renderer.finish_tool_use();
        }
        if status == TurnStatus::Interrupted {
            renderer.print_interrupted();
        }
        let Ok(chat) = store.get_mut(&self.reply.chat_id) else {
            return;
        };
        let Some(message) = chat.message_mut(&self.reply.message_id) else {
            return;
        };
        message.is_streaming = false;
        let message = message.clone();
        chat.refresh_preview();
        renderer.finish_response(&message);
        if let Some(logger) = self.logger {
            logger.log_reply(&message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::render::HtmlRenderer;

    fn open(store: &mut ChatStore) -> OpenReply {
        let chat_id = store.create("t");
        let chat = store.get_mut(&chat_id).unwrap();
        chat.messages.push(Message::user("hi"));
        let reply = Message::assistant_placeholder();
        let message_id = reply.id.clone();
        chat.messages.push(reply);
        OpenReply {
            chat_id,
            message_id,
        }
    }

    fn reply_of<'s>(store: &'s ChatStore, reply: &OpenReply) -> &'s Message {
        store.get(&reply.chat_id).unwrap().last_message().unwrap()
    }

    fn frames(items: Vec<Result<StreamFrame>>) -> impl Stream<Item = Result<StreamFrame>> + Unpin {
        stream::iter(items)
    }

    #[tokio::test]
    async fn chunks_then_done() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let mut renderer = HtmlRenderer::new();

        let outcome = StreamConsumer::new(reply.clone(), &activity)
            .consume(
                &mut store,
                frames(vec![
                    Ok(StreamFrame::chunk("He")),
                    Ok(StreamFrame::chunk("llo")),
                    Ok(StreamFrame::done()),
                    Ok(StreamFrame::chunk(" ignored")),
                ]),
                &mut renderer,
            )
            .await;

        assert_eq!(outcome.status, TurnStatus::Completed);
        assert_eq!(outcome.frames, 3);
        let message = reply_of(&store, &reply);
        assert_eq!(message.content, "Hello");
        assert!(!message.is_streaming);
        assert_eq!(renderer.html(), "<p>Hello</p>");
        assert!(renderer.is_finished());
        assert_eq!(store.get(&reply.chat_id).unwrap().preview, "Hello");
    }

    #[tokio::test]
    async fn transport_error_becomes_apology() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let mut renderer = HtmlRenderer::new();

        let outcome = StreamConsumer::new(reply.clone(), &activity)
            .consume(
                &mut store,
                frames(vec![
                    Ok(StreamFrame::chunk("Partial")),
                    Err(Error::connection("connection reset", None)),
                ]),
                &mut renderer,
            )
            .await;

        assert!(outcome.is_failed());
        assert!(outcome.error.is_some());
        let message = reply_of(&store, &reply);
        assert_eq!(message.content, APOLOGY);
        assert!(!message.is_streaming);
        assert_eq!(renderer.errors().len(), 1);
    }

    #[tokio::test]
    async fn error_frame_becomes_apology() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let mut renderer = HtmlRenderer::new();
        let error = StreamFrame {
            error: Some("agent exploded".to_string()),
            ..StreamFrame::default()
        };

        let outcome = StreamConsumer::new(reply.clone(), &activity)
            .consume(
                &mut store,
                frames(vec![Ok(StreamFrame::chunk("x")), Ok(error)]),
                &mut renderer,
            )
            .await;

        assert_eq!(outcome.status, TurnStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("Streaming error: agent exploded"));
        assert_eq!(reply_of(&store, &reply).content, APOLOGY);
    }

    #[tokio::test]
    async fn missing_done_still_finalizes() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let mut renderer = HtmlRenderer::new();

        let outcome = StreamConsumer::new(reply.clone(), &activity)
            .consume(
                &mut store,
                frames(vec![Ok(StreamFrame::chunk("cut off"))]),
                &mut renderer,
            )
            .await;

        assert_eq!(outcome.status, TurnStatus::Unterminated);
        let message = reply_of(&store, &reply);
        assert_eq!(message.content, "cut off");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn search_raises_tool_status_until_done() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let mut renderer = HtmlRenderer::new();
        let mut consumer = StreamConsumer::new(reply.clone(), &activity);

        let searching = StreamFrame {
            search_used: Some(true),
            ..StreamFrame::default()
        };
        assert_eq!(consumer.apply(&mut store, &searching, &mut renderer), Flow::Continue);
        assert!(activity.is_tool_in_use());
        assert!(renderer.tool_in_use());

        assert_eq!(
            consumer.apply(&mut store, &StreamFrame::done(), &mut renderer),
            Flow::Stop
        );
        assert!(!activity.is_tool_in_use());
        assert!(!renderer.tool_in_use());
        assert!(consumer.outcome().search_used);
        assert_eq!(renderer.tools_used(), [SEARCH_TOOL.to_string()]);
    }

    #[test]
    fn loading_guard_is_exclusive_and_resets() {
        let activity = Arc::new(ActivityState::new());
        let guard = activity.begin().unwrap();
        assert!(activity.is_loading());
        assert!(activity.begin().is_none());
        activity.set_tool_in_use(true);
        drop(guard);
        assert!(!activity.is_loading());
        assert!(!activity.is_tool_in_use());
        assert!(activity.begin().is_some());
    }

    #[derive(Default)]
    struct RecordingLogger {
        frames: Mutex<usize>,
        replies: Mutex<Vec<String>>,
    }

    impl ClientLogger for RecordingLogger {
        fn log_request(&self, _: &crate::types::ChatRequest) {}

        fn log_frame(&self, _: &StreamFrame) {
            *self.frames.lock().unwrap() += 1;
        }

        fn log_reply(&self, message: &Message) {
            self.replies.lock().unwrap().push(message.content.clone());
        }
    }

    #[tokio::test]
    async fn logger_sees_frames_and_reply() {
        let mut store = ChatStore::new();
        let reply = open(&mut store);
        let activity = ActivityState::new();
        let logger = RecordingLogger::default();
        let mut renderer = HtmlRenderer::new();

        StreamConsumer::new(reply, &activity)
            .with_logger(Some(&logger))
            .consume(
                &mut store,
                frames(vec![Ok(StreamFrame::chunk("ok")), Ok(StreamFrame::done())]),
                &mut renderer,
            )
            .await;

        assert_eq!(*logger.frames.lock().unwrap(), 2);
        assert_eq!(*logger.replies.lock().unwrap(), vec!["ok".to_string()]);
    }
}
