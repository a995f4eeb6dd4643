// src/api/chat.rs
// Chat sessions, message history and the streamed assistant reply

use reqwest::header::ACCEPT;
use serde_json::json;
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use super::stream::{ChatEventStream, chat_event_stream};
use super::ApiClient;
use crate::types::{ChatMessage, ChatSession, ChatSessionInput};

impl ApiClient {
    pub async fn create_chat_session(&self, input: &ChatSessionInput) -> ApiResult<ChatSession> {
        let session: ChatSession = self.post("/api/chat/sessions", input).await?;
        info!(
            "Chat session {} created (context={})",
            session.id, session.context_type
        );
        Ok(session)
    }

    pub async fn fetch_chat_messages(&self, session_id: i64) -> ApiResult<Vec<ChatMessage>> {
        self.get(&format!("/api/chat/sessions/{}/messages", session_id), &[])
            .await
    }

    /// Post a user message and stream the assistant's reply.
    ///
    /// No request timeout here; the stream lasts as long as the reply.
    pub async fn stream_chat_message(
        &self,
        session_id: i64,
        content: &str,
    ) -> ApiResult<ChatEventStream> {
        let url = self.url(&format!("/api/chat/sessions/{}/messages", session_id))?;
        debug!(session_id, chars = content.len(), "Opening chat stream");

        let response = self
            .http()
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(&json!({ "content": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::stream_rejected(response).await);
        }

        Ok(Box::pin(chat_event_stream(response.bytes_stream())))
    }
}
