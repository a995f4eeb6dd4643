// src/chat/controller.rs
// Chat Session Controller: session lifecycle, history and one streamed turn

use std::sync::Arc;

use chrono::Local;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::reducer::{StreamReducer, ToolFailure};
use super::{PENDING_USER_MESSAGE_ID, STREAMING_ASSISTANT_MESSAGE_ID};
use crate::api::{ApiError, ChatApi};
use crate::cache::{Invalidation, QueryCache, QueryKey};
use crate::types::{ChatContext, ChatMessage, ChatRole, ChatSession};

/// Offered while the conversation is empty
pub const QUICK_SUGGESTIONS: [&str; 3] = [
    "Suggest meals for this week",
    "What's a quick weeknight dinner?",
    "Help me use up leftovers",
];

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no chat session started")]
    NoSession,

    #[error("a reply is still streaming")]
    AlreadyStreaming,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    NoSession,
    Idle,
    Streaming,
}

/// Snapshot of everything the chat panel renders
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub state: ChatState,
    /// History followed by the ephemeral pending and streaming messages
    pub messages: Vec<ChatMessage>,
    pub tool_status: Option<String>,
    pub show_typing_indicator: bool,
    pub quick_suggestions: Vec<&'static str>,
    pub last_tool_error: Option<ToolFailure>,
}

pub struct ChatController<A: ChatApi> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    session: Option<ChatSession>,
    history: Vec<ChatMessage>,
    pending_user: Option<ChatMessage>,
    /// Present exactly while a reply streams
    stream: Option<StreamReducer>,
    last_tool_error: Option<ToolFailure>,
    observers: Vec<mpsc::UnboundedSender<ChatView>>,
}

impl<A: ChatApi> ChatController<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            cache,
            session: None,
            history: Vec::new(),
            pending_user: None,
            stream: None,
            last_tool_error: None,
            observers: Vec::new(),
        }
    }

    /// Receive a view snapshot after every state change
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChatView> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn state(&self) -> ChatState {
        match (&self.session, &self.stream) {
            (None, _) => ChatState::NoSession,
            (Some(_), Some(_)) => ChatState::Streaming,
            (Some(_), None) => ChatState::Idle,
        }
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// History polling is suspended while a reply streams
    pub fn should_poll(&self) -> bool {
        self.state() == ChatState::Idle
    }

    /// Create a session for `context` and load its history
    pub async fn start_session(&mut self, context: ChatContext) -> Result<&ChatSession, ChatError> {
        if self.stream.is_some() {
            return Err(ChatError::AlreadyStreaming);
        }

        let session = self.api.create_chat_session(&context.into()).await?;
        info!(
            "Chat session {} started ({})",
            session.id,
            context.context_type()
        );

        self.session = Some(session);
        self.history.clear();
        self.last_tool_error = None;
        self.publish();

        self.refresh_history().await?;
        self.session.as_ref().ok_or(ChatError::NoSession)
    }

    /// Refetch persisted messages. Skipped while streaming.
    pub async fn refresh_history(&mut self) -> Result<(), ChatError> {
        let session_id = self.session_id()?;
        if self.stream.is_some() {
            debug!(session_id, "Skipping history refresh while streaming");
            return Ok(());
        }

        self.history = self.api.fetch_chat_messages(session_id).await?;
        self.cache.mark_fresh(QueryKey::ChatMessages(session_id));
        self.publish();
        Ok(())
    }

    /// Send one user message and consume the assistant's reply.
    ///
    /// Pending and streamed state is always cleared and the history
    /// refetched before returning, also when the stream fails. Blank
    /// messages are ignored.
    pub async fn send(&mut self, content: &str) -> Result<(), ChatError> {
        let session_id = self.session_id()?;
        if self.stream.is_some() {
            return Err(ChatError::AlreadyStreaming);
        }
        if content.trim().is_empty() {
            return Ok(());
        }

        self.pending_user = Some(ChatMessage {
            id: PENDING_USER_MESSAGE_ID,
            session_id,
            role: ChatRole::User,
            content: content.to_string(),
            created_at: Local::now().naive_local(),
        });
        self.stream = Some(StreamReducer::new());
        self.last_tool_error = None;
        self.publish();

        let outcome = self.consume_reply(session_id, content).await;

        self.pending_user = None;
        self.stream = None;
        self.cache.invalidate(Invalidation::ChatMessages(session_id));
        let refetch = self.refresh_history().await;
        self.publish();

        match (outcome, refetch) {
            (Err(e), refetch) => {
                if let Err(refetch_error) = refetch {
                    warn!("History refetch after failed reply also failed: {}", refetch_error);
                }
                Err(e)
            }
            (Ok(()), refetch) => refetch,
        }
    }

    /// Send the quick suggestion at `index`; false if there is none
    pub async fn send_suggestion(&mut self, index: usize) -> Result<bool, ChatError> {
        if !self.shows_suggestions() {
            return Ok(false);
        }
        let Some(text) = QUICK_SUGGESTIONS.get(index).copied() else {
            return Ok(false);
        };
        self.send(text).await?;
        Ok(true)
    }

    async fn consume_reply(&mut self, session_id: i64, content: &str) -> Result<(), ChatError> {
        let mut events = self.api.stream_chat_message(session_id, content).await?;

        while let Some(event) = events.next().await {
            let event = event?;
            let Some(reducer) = self.stream.as_mut() else { break };

            if let Some(scope) = reducer.apply(&event) {
                self.cache.invalidate(scope);
            }
            self.last_tool_error = reducer.last_tool_error().cloned();
            let finished = reducer.is_finished();
            self.publish();

            if finished {
                break;
            }
        }
        Ok(())
    }

    fn session_id(&self) -> Result<i64, ChatError> {
        self.session.as_ref().map(|s| s.id).ok_or(ChatError::NoSession)
    }

    fn shows_suggestions(&self) -> bool {
        self.state() == ChatState::Idle && self.history.is_empty() && self.pending_user.is_none()
    }

    pub fn view(&self) -> ChatView {
        let mut messages = self.history.clone();
        messages.extend(self.pending_user.clone());

        let text = self.stream.as_ref().map(StreamReducer::text).unwrap_or("");
        let tool_status = self
            .stream
            .as_ref()
            .and_then(StreamReducer::tool_status)
            .map(str::to_string);

        if let Some(session) = &self.session
            && !text.is_empty()
        {
            messages.push(ChatMessage {
                id: STREAMING_ASSISTANT_MESSAGE_ID,
                session_id: session.id,
                role: ChatRole::Assistant,
                content: text.to_string(),
                created_at: Local::now().naive_local(),
            });
        }

        let state = self.state();
        ChatView {
            state,
            show_typing_indicator: state == ChatState::Streaming
                && text.is_empty()
                && tool_status.is_none(),
            tool_status,
            quick_suggestions: if self.shows_suggestions() {
                QUICK_SUGGESTIONS.to_vec()
            } else {
                Vec::new()
            },
            last_tool_error: self.last_tool_error.clone(),
            messages,
        }
    }

    fn publish(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let view = self.view();
        self.observers.retain(|tx| tx.send(view.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResult, ChatEventStream};
    use crate::types::{ChatSessionInput, ChatStreamEvent};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use futures::stream;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    fn ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Scripted chat backend. Each send plays the next script and, when it
    /// completes, the server stores both sides of the turn.
    #[derive(Default)]
    struct FakeChat {
        messages: Mutex<Vec<ChatMessage>>,
        scripts: Mutex<Vec<Vec<ApiResult<ChatStreamEvent>>>>,
        history_fetches: Mutex<usize>,
        reject_stream: Mutex<bool>,
    }

    impl FakeChat {
        fn script(&self, events: Vec<ApiResult<ChatStreamEvent>>) {
            self.scripts.lock().unwrap().push(events);
        }

        fn store(&self, role: ChatRole, content: &str) {
            let mut messages = self.messages.lock().unwrap();
            let id = messages.len() as i64 + 1;
            messages.push(ChatMessage {
                id,
                session_id: 1,
                role,
                content: content.into(),
                created_at: ts(),
            });
        }
    }

    #[async_trait]
    impl ChatApi for FakeChat {
        async fn create_chat_session(&self, input: &ChatSessionInput) -> ApiResult<ChatSession> {
            Ok(ChatSession {
                id: 1,
                context_type: input.context_type.clone(),
                week_plan_id: input.week_plan_id,
                recipe_id: input.recipe_id,
                created_at: ts(),
            })
        }

        async fn fetch_chat_messages(&self, _session_id: i64) -> ApiResult<Vec<ChatMessage>> {
            *self.history_fetches.lock().unwrap() += 1;
            Ok(self.messages.lock().unwrap().clone())
        }

        async fn stream_chat_message(
            &self,
            _session_id: i64,
            content: &str,
        ) -> ApiResult<ChatEventStream> {
            if *self.reject_stream.lock().unwrap() {
                return Err(ApiError::StreamOpen {
                    status: StatusCode::NOT_FOUND,
                    body: "Chat session not found".into(),
                });
            }
            let events = self.scripts.lock().unwrap().remove(0);
            self.store(ChatRole::User, content);
            let reply: String = events
                .iter()
                .filter_map(|e| match e {
                    Ok(ChatStreamEvent::Text { content }) => Some(content.as_str()),
                    _ => None,
                })
                .collect();
            self.store(ChatRole::Assistant, &reply);
            Ok(Box::pin(stream::iter(events)))
        }
    }

    fn text(s: &str) -> ApiResult<ChatStreamEvent> {
        Ok(ChatStreamEvent::Text { content: s.into() })
    }

    fn controller(api: &Arc<FakeChat>) -> (ChatController<FakeChat>, Arc<QueryCache>) {
        let cache = Arc::new(QueryCache::new());
        (ChatController::new(api.clone(), cache.clone()), cache)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChatView>) -> Vec<ChatView> {
        let mut views = Vec::new();
        while let Ok(view) = rx.try_recv() {
            views.push(view);
        }
        views
    }

    #[tokio::test]
    async fn test_send_without_session_is_rejected() {
        let api = Arc::new(FakeChat::default());
        let (mut chat, _) = controller(&api);
        assert_eq!(chat.state(), ChatState::NoSession);
        assert!(matches!(chat.send("hi").await, Err(ChatError::NoSession)));
        assert!(!chat.should_poll());
    }

    #[tokio::test]
    async fn test_start_session_offers_suggestions() {
        let api = Arc::new(FakeChat::default());
        let (mut chat, cache) = controller(&api);

        let session = chat.start_session(ChatContext::WeekPlan(3)).await.unwrap();
        assert_eq!(session.context_type, "week_plan");
        assert_eq!(session.week_plan_id, Some(3));

        let view = chat.view();
        assert_eq!(view.state, ChatState::Idle);
        assert_eq!(view.quick_suggestions, QUICK_SUGGESTIONS.to_vec());
        assert!(cache.is_fresh(&QueryKey::ChatMessages(1)));
        assert!(chat.should_poll());
    }

    #[tokio::test]
    async fn test_streamed_turn_shows_pending_then_refetches() {
        let api = Arc::new(FakeChat::default());
        api.script(vec![
            text("How about "),
            text("shakshuka?"),
            Ok(ChatStreamEvent::Done),
        ]);
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();
        let mut rx = chat.subscribe();

        assert!(chat.send_suggestion(0).await.unwrap());
        let views = drain(&mut rx);

        // Pending bubble first, typing indicator until text arrives
        let first = &views[0];
        assert_eq!(first.state, ChatState::Streaming);
        assert!(first.show_typing_indicator);
        assert_eq!(first.messages.len(), 1);
        assert_eq!(first.messages[0].id, PENDING_USER_MESSAGE_ID);
        assert_eq!(first.messages[0].content, "Suggest meals for this week");
        assert!(first.quick_suggestions.is_empty());

        let streaming: Vec<&ChatView> = views
            .iter()
            .filter(|v| v.state == ChatState::Streaming)
            .collect();
        let last_streaming = streaming.last().unwrap();
        assert_eq!(last_streaming.messages[0].id, PENDING_USER_MESSAGE_ID);
        assert_eq!(last_streaming.messages[1].id, STREAMING_ASSISTANT_MESSAGE_ID);
        assert_eq!(last_streaming.messages[1].content, "How about shakshuka?");
        assert!(!last_streaming.show_typing_indicator);

        let done = chat.view();
        assert_eq!(done.state, ChatState::Idle);
        assert_eq!(done.messages.len(), 2);
        assert!(done.messages.iter().all(|m| !m.is_ephemeral()));
        assert_eq!(done.messages[1].content, "How about shakshuka?");
    }

    #[tokio::test]
    async fn test_events_after_done_are_not_processed() {
        let api = Arc::new(FakeChat::default());
        api.script(vec![
            text("Sure."),
            Ok(ChatStreamEvent::Done),
            Ok(ChatStreamEvent::ToolDone {
                tool: "add_to_plan".into(),
                result: json!({}),
            }),
        ]);
        let (mut chat, cache) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();
        let week = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        cache.mark_fresh(QueryKey::WeekPlan(week));

        chat.send("Plan something").await.unwrap();
        assert!(cache.is_fresh(&QueryKey::WeekPlan(week)));
    }

    #[tokio::test]
    async fn test_tool_done_invalidates_matching_caches() {
        let api = Arc::new(FakeChat::default());
        api.script(vec![
            Ok(ChatStreamEvent::ToolStart {
                tool: "add_to_plan".into(),
                label: "Adding to meal plan...".into(),
            }),
            Ok(ChatStreamEvent::ToolDone {
                tool: "add_to_plan".into(),
                result: json!({"success": true}),
            }),
            text("Added."),
            Ok(ChatStreamEvent::Done),
        ]);
        let (mut chat, cache) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();
        let week = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        cache.mark_fresh(QueryKey::WeekPlan(week));
        cache.mark_fresh(QueryKey::Recipes);
        let mut rx = chat.subscribe();

        chat.send("Add tacos to Tuesday").await.unwrap();

        assert!(!cache.is_fresh(&QueryKey::WeekPlan(week)));
        assert!(cache.is_fresh(&QueryKey::Recipes));

        let views = drain(&mut rx);
        assert!(
            views
                .iter()
                .any(|v| v.tool_status.as_deref() == Some("Adding to meal plan..."))
        );
        assert!(chat.view().tool_status.is_none());
    }

    #[tokio::test]
    async fn test_tool_error_is_recorded_not_inserted() {
        let api = Arc::new(FakeChat::default());
        api.script(vec![
            Ok(ChatStreamEvent::ToolError {
                tool: "create_recipe".into(),
                error: "name is required".into(),
            }),
            text("I couldn't save that."),
            Ok(ChatStreamEvent::Done),
        ]);
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::Recipe(8)).await.unwrap();

        chat.send("Save it").await.unwrap();
        let view = chat.view();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.last_tool_error.unwrap().tool, "create_recipe");
    }

    #[tokio::test]
    async fn test_stream_error_still_cleans_up() {
        let api = Arc::new(FakeChat::default());
        api.script(vec![
            text("Partial"),
            Err(ApiError::Http {
                status: StatusCode::BAD_GATEWAY,
                body: "connection reset".into(),
            }),
        ]);
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();
        let fetches = *api.history_fetches.lock().unwrap();

        let err = chat.send("Hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Api(ApiError::Http { .. })));
        assert_eq!(chat.state(), ChatState::Idle);
        assert!(chat.view().messages.iter().all(|m| !m.is_ephemeral()));
        assert_eq!(*api.history_fetches.lock().unwrap(), fetches + 1);
    }

    #[tokio::test]
    async fn test_rejected_stream_open() {
        let api = Arc::new(FakeChat::default());
        *api.reject_stream.lock().unwrap() = true;
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();

        let err = chat.send("Hello").await.unwrap_err();
        assert_eq!(err.to_string(), "Chat error: 404");
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let api = Arc::new(FakeChat::default());
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();
        chat.send("   ").await.unwrap();
        assert!(chat.view().messages.is_empty());
    }

    #[tokio::test]
    async fn test_no_suggestions_once_history_exists() {
        let api = Arc::new(FakeChat::default());
        api.store(ChatRole::User, "hi");
        let (mut chat, _) = controller(&api);
        chat.start_session(ChatContext::General).await.unwrap();

        assert!(chat.view().quick_suggestions.is_empty());
        assert!(!chat.send_suggestion(0).await.unwrap());
    }
}
