//! Test utilities for Querychat
//!
//! [`FakeChatApi`] is an in-memory stand-in for the remote chat service. It
//! records every call as a short string so tests can assert on traffic.

use crate::api::{
    ChatApi, ChatReply, ChatSummary, ContinueChatResponse, HistoryMessage, MessageData,
    NewChatResponse,
};
use crate::error::{QuerychatError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Mutable state behind [`FakeChatApi`]
#[derive(Default)]
pub struct FakeState {
    /// Listing returned by `list_chats`
    pub chats: Vec<ChatSummary>,
    /// Stored messages per chat id
    pub histories: HashMap<String, Vec<HistoryMessage>>,
    /// Make both send endpoints fail with a network error
    pub fail_sends: bool,
    /// Make every call fail with an authentication error
    pub unauthorized: bool,
    /// Chat ids whose history fetch fails
    pub failing_fetches: HashSet<String>,
    /// Result rows served by `message_data`, per message id
    pub message_data: HashMap<String, MessageData>,
    /// Counter behind generated chat ids
    pub next_chat_id: u32,
    /// Recorded calls, e.g. `new:hello`, `fetch:a`
    pub calls: Vec<String>,
}

/// In-memory chat service
#[derive(Default)]
pub struct FakeChatApi {
    state: Mutex<FakeState>,
}

fn stored(id: String, role: &str, content: String) -> HistoryMessage {
    HistoryMessage {
        id,
        role: role.to_string(),
        content,
        response_type: Some("text".to_string()),
        ..Default::default()
    }
}

fn text_reply(content: String) -> ChatReply {
    ChatReply {
        kind: Some("text".to_string()),
        content,
        ..Default::default()
    }
}

impl FakeChatApi {
    /// Service holding one two-message chat per id, listed in the given order
    pub fn with_chats(ids: &[&str]) -> Self {
        let api = Self::default();
        {
            let mut state = api.state();
            for id in ids {
                state.chats.push(ChatSummary {
                    id: id.to_string(),
                    title: format!("Chat {}", id),
                    updated_at: Some("2024-01-01T00:00:00Z".to_string()),
                    message_count: 2,
                    last_message: None,
                });
                state.histories.insert(
                    id.to_string(),
                    vec![
                        stored(format!("{}-1", id), "user", format!("question in {}", id)),
                        stored(format!("{}-2", id), "assistant", format!("answer in {}", id)),
                    ],
                );
            }
        }
        api
    }

    /// Lock the state for inspection or tweaking
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Snapshot of recorded calls
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn guard(state: &FakeState) -> Result<()> {
        if state.unauthorized {
            return Err(QuerychatError::Authentication("token rejected".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn new_chat(&self, message: &str) -> Result<NewChatResponse> {
        let mut state = self.state();
        state.calls.push(format!("new:{}", message));
        Self::guard(&state)?;
        if state.fail_sends {
            return Err(QuerychatError::Network("connection reset".to_string()).into());
        }

        state.next_chat_id += 1;
        let chat_id = format!("chat-{}", state.next_chat_id);
        let answer = format!("echo: {}", message);
        state.chats.insert(
            0,
            ChatSummary {
                id: chat_id.clone(),
                title: format!("Title for {}", message),
                updated_at: None,
                message_count: 2,
                last_message: Some(message.to_string()),
            },
        );
        state.histories.insert(
            chat_id.clone(),
            vec![
                stored(format!("{}-1", chat_id), "user", message.to_string()),
                stored(format!("{}-2", chat_id), "assistant", answer.clone()),
            ],
        );

        Ok(NewChatResponse {
            chat_id: chat_id.clone(),
            title: format!("Title for {}", message),
            message_id: Some(format!("{}-2", chat_id)),
            created_at: None,
            response: text_reply(answer),
        })
    }

    async fn continue_chat(&self, chat_id: &str, message: &str) -> Result<ContinueChatResponse> {
        let mut state = self.state();
        state.calls.push(format!("continue:{}:{}", chat_id, message));
        Self::guard(&state)?;
        if state.fail_sends {
            return Err(QuerychatError::Network("connection reset".to_string()).into());
        }

        let answer = format!("echo: {}", message);
        let history = state.histories.entry(chat_id.to_string()).or_default();
        let next = history.len();
        history.push(stored(
            format!("{}-{}", chat_id, next + 1),
            "user",
            message.to_string(),
        ));
        history.push(stored(
            format!("{}-{}", chat_id, next + 2),
            "assistant",
            answer.clone(),
        ));

        Ok(ContinueChatResponse {
            message_id: Some(format!("{}-{}", chat_id, next + 2)),
            response: text_reply(answer),
        })
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let mut state = self.state();
        state.calls.push("list".to_string());
        Self::guard(&state)?;
        Ok(state.chats.clone())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<HistoryMessage>> {
        let mut state = self.state();
        state.calls.push(format!("fetch:{}", chat_id));
        Self::guard(&state)?;
        if state.failing_fetches.contains(chat_id) {
            return Err(QuerychatError::Network("timed out".to_string()).into());
        }
        Ok(state.histories.get(chat_id).cloned().unwrap_or_default())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("delete:{}", chat_id));
        Self::guard(&state)?;
        state.chats.retain(|c| c.id != chat_id);
        state.histories.remove(chat_id);
        Ok(())
    }

    async fn message_data(&self, message_id: &str) -> Result<MessageData> {
        let mut state = self.state();
        state.calls.push(format!("data:{}", message_id));
        Self::guard(&state)?;
        state.message_data.get(message_id).cloned().ok_or_else(|| {
            QuerychatError::Api {
                status: 404,
                message: "Message data not found".to_string(),
            }
            .into()
        })
    }
}
