//! Chat session and message lifecycle
//!
//! [`ChatController`] owns the session registry and the displayed message
//! sequence and is the only thing that mutates them. All mutation happens
//! through `&mut self` on the caller's task; network work can run elsewhere
//! but its result comes back through [`ChatController::complete_send`].
//!
//! A message exchange moves `Idle -> Sending -> {Succeeded, Failed}` and is
//! back to `Idle` as soon as it completes. Each exchange is tagged with the
//! view it was issued from; a reply whose tag no longer matches the view
//! on screen is dropped without touching any state.

use std::sync::Arc;
use std::time::Instant;

use crate::api::{ChatApi, ContinueChatResponse, NewChatResponse};
use crate::chat::reconcile::{
    apply_message_data, assistant_message, history_message, parse_timestamp,
    session_from_summary, summarize,
};
use crate::chat::registry::SessionRegistry;
use crate::chat::types::{ChatSession, Message};
use crate::error::{QuerychatError, Result};

/// Shown in the chat pane when an exchange fails
pub const SEND_FAILURE_NOTICE: &str =
    "Sorry, I couldn't process your question. Check your connection and try again.";

/// Whether an exchange is in flight for the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    /// Ready for input
    #[default]
    Idle,
    /// Waiting for the service
    Sending,
}

/// Identifies the view an exchange was issued from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTag {
    session_id: Option<String>,
    epoch: u64,
}

/// An exchange that has been shown optimistically and awaits its reply
#[derive(Debug, Clone)]
pub struct PendingExchange {
    tag: ExchangeTag,
    message: String,
    started: Instant,
}

impl PendingExchange {
    /// Durable session id at issue time; `None` starts a new chat
    pub fn session_id(&self) -> Option<&str> {
        self.tag.session_id.as_deref()
    }

    /// The user's text
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Raw reply of whichever endpoint served the exchange
#[derive(Debug, Clone)]
pub enum ExchangeReply {
    /// `POST /chat/new` answered
    Created(NewChatResponse),
    /// `POST /chat/continue/{id}` answered
    Continued(ContinueChatResponse),
}

/// What happened to a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The assistant reply was appended
    Succeeded,
    /// An error message was appended; `notice` is the transient detail
    Failed {
        /// Underlying failure, for a one-off notification
        notice: String,
    },
    /// The view changed while the request was in flight
    Discarded,
}

/// What happened to a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The last remaining session is never deleted
    Refused,
    /// Removed; `reselected` names the session that replaced it on screen
    Removed {
        /// New active session when the deleted one was active
        reselected: Option<String>,
    },
}

/// Send the exchange to the endpoint its tag calls for.
///
/// Whether a new chat is created depends only on the presence of a durable
/// session id in the tag.
pub async fn dispatch<A: ChatApi + ?Sized>(
    api: &A,
    pending: &PendingExchange,
) -> Result<ExchangeReply> {
    match pending.session_id() {
        Some(chat_id) => {
            tracing::debug!(chat_id = %chat_id, "Continuing chat");
            api.continue_chat(chat_id, &pending.message)
                .await
                .map(ExchangeReply::Continued)
        }
        None => {
            tracing::debug!("Starting new chat");
            api.new_chat(&pending.message)
                .await
                .map(ExchangeReply::Created)
        }
    }
}

/// Load the stored messages of a chat, fetching rows the listing left out.
///
/// Replies flagged `has_data` whose rows were neither inline nor embedded in
/// `content` are filled from `GET /chat/data/{id}`. A failed data fetch
/// leaves that message without rows; authentication failures propagate.
pub async fn fetch_messages<A: ChatApi + ?Sized>(
    api: &A,
    chat_id: &str,
) -> Result<Vec<Message>> {
    let stored = api.chat_messages(chat_id).await?;
    let mut messages = Vec::with_capacity(stored.len());

    for record in stored {
        let has_data = record.has_data;
        let mut message = history_message(record);
        if has_data && message.tabular_result.is_none() {
            match api.message_data(&message.id).await {
                Ok(payload) => apply_message_data(&mut message, payload),
                Err(e) if QuerychatError::is_authentication(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!(message_id = %message.id, "Failed to load result rows: {}", e);
                }
            }
        }
        messages.push(message);
    }
    Ok(messages)
}

/// Session registry plus the message pane it drives
pub struct ChatController<A> {
    api: Arc<A>,
    registry: SessionRegistry,
    messages: Vec<Message>,
    exchange: ExchangeState,
    epoch: u64,
    load_error: Option<String>,
}

impl<A: ChatApi> ChatController<A> {
    /// Controller in the "no current session" state with an empty registry
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            registry: SessionRegistry::new(),
            messages: Vec::new(),
            exchange: ExchangeState::Idle,
            epoch: 0,
            load_error: None,
        }
    }

    /// Shared handle to the service client
    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    /// Known sessions
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Messages on screen
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Durable id of the session on screen
    pub fn current_session_id(&self) -> Option<&str> {
        self.registry.active_id()
    }

    /// The session on screen
    pub fn current_session(&self) -> Option<&ChatSession> {
        self.registry.active()
    }

    /// State of the current view's exchange
    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange
    }

    /// Whether input is currently refused
    pub fn is_sending(&self) -> bool {
        self.exchange == ExchangeState::Sending
    }

    /// Why the current session's history is missing, if it failed to load
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    fn reset_view(&mut self) {
        self.messages.clear();
        self.exchange = ExchangeState::Idle;
        self.load_error = None;
        self.epoch += 1;
    }

    /// Replace the registry with the service's listing.
    ///
    /// If the active session is no longer listed the view falls back to the
    /// "no current session" state.
    pub async fn load_history(&mut self) -> Result<()> {
        let listing = self.api.list_chats().await?;
        let had_active = self.registry.active_id().is_some();
        self.registry
            .replace_all(listing.into_iter().map(session_from_summary).collect());
        if had_active && self.registry.active_id().is_none() {
            tracing::info!("Active chat no longer listed; starting a new one");
            self.reset_view();
        }
        tracing::debug!(sessions = self.registry.len(), "Loaded chat history");
        Ok(())
    }

    /// Start composing a new chat.
    ///
    /// Nothing is added to the registry until the first message is
    /// answered; the service assigns the id.
    pub fn create_session(&mut self) {
        self.registry.deactivate_all();
        self.reset_view();
        tracing::debug!("New chat started");
    }

    /// Put `id` on screen, replacing the displayed messages with its history.
    ///
    /// # Errors
    ///
    /// Returns [`QuerychatError::SessionNotFound`] for an unknown id, without
    /// changing anything. Returns [`QuerychatError::Fetch`] when the history
    /// cannot be loaded; the session is active nonetheless, the pane is empty
    /// and [`load_error`](Self::load_error) explains why.
    pub async fn select_session(&mut self, id: &str) -> Result<()> {
        if self.registry.active_id() == Some(id) {
            return Ok(());
        }
        if !self.registry.activate(id) {
            return Err(QuerychatError::SessionNotFound(id.to_string()).into());
        }
        self.reset_view();
        tracing::debug!(chat_id = %id, "Switching chat");

        match fetch_messages(self.api.as_ref(), id).await {
            Ok(messages) => {
                self.messages = messages;
                self.registry
                    .set_message_count(id, self.messages.len() as u64);
                Ok(())
            }
            Err(e) if QuerychatError::is_authentication(&e) => Err(e),
            Err(e) => {
                tracing::warn!(chat_id = %id, "Failed to load chat history: {}", e);
                self.load_error = Some(e.to_string());
                Err(QuerychatError::Fetch(format!("could not load chat {}: {}", id, e)).into())
            }
        }
    }

    /// Delete a session on the service and locally.
    ///
    /// The last remaining session is never deleted. Deleting the active
    /// session puts the first remaining one on screen.
    pub async fn delete_session(&mut self, id: &str) -> Result<DeleteOutcome> {
        if self.registry.len() == 1 {
            tracing::info!(chat_id = %id, "Refusing to delete the only chat");
            return Ok(DeleteOutcome::Refused);
        }
        if !self.registry.contains(id) {
            return Err(QuerychatError::SessionNotFound(id.to_string()).into());
        }

        self.api.delete_chat(id).await?;
        let was_active = self
            .registry
            .remove(id)
            .map(|s| s.is_active)
            .unwrap_or(false);
        tracing::info!(chat_id = %id, was_active, "Deleted chat");

        if !was_active {
            return Ok(DeleteOutcome::Removed { reselected: None });
        }

        match self.registry.first_id().map(str::to_string) {
            Some(next) => {
                if let Err(e) = self.select_session(&next).await {
                    if QuerychatError::is_authentication(&e) {
                        return Err(e);
                    }
                    tracing::warn!("Replacement chat failed to load: {}", e);
                }
                Ok(DeleteOutcome::Removed {
                    reselected: Some(next),
                })
            }
            None => {
                self.create_session();
                Ok(DeleteOutcome::Removed { reselected: None })
            }
        }
    }

    /// Show `text` immediately and mark the view as sending.
    ///
    /// # Errors
    ///
    /// [`QuerychatError::Busy`] while another exchange is in flight for this
    /// view; [`QuerychatError::InvalidInput`] for blank text.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingExchange> {
        if self.is_sending() {
            return Err(QuerychatError::Busy.into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(QuerychatError::InvalidInput("message is empty".to_string()).into());
        }

        self.messages.push(Message::user(text));
        self.exchange = ExchangeState::Sending;

        Ok(PendingExchange {
            tag: self.current_tag(),
            message: text.to_string(),
            started: Instant::now(),
        })
    }

    fn current_tag(&self) -> ExchangeTag {
        ExchangeTag {
            session_id: self.registry.active_id().map(str::to_string),
            epoch: self.epoch,
        }
    }

    /// Apply the result of an exchange started with [`begin_send`](Self::begin_send).
    ///
    /// # Errors
    ///
    /// Authentication failures are returned instead of being shown in the
    /// pane; the auth context has already been torn down by then.
    pub fn complete_send(
        &mut self,
        pending: PendingExchange,
        result: Result<ExchangeReply>,
    ) -> Result<ExchangeOutcome> {
        if pending.tag != self.current_tag() {
            tracing::debug!(
                issued_for = ?pending.tag.session_id,
                "Dropping reply for a chat that is no longer on screen"
            );
            return match result {
                Err(e) if QuerychatError::is_authentication(&e) => Err(e),
                _ => Ok(ExchangeOutcome::Discarded),
            };
        }

        self.exchange = ExchangeState::Idle;
        let latency = pending.started.elapsed();

        let reply = match result {
            Ok(reply) => reply,
            Err(e) if QuerychatError::is_authentication(&e) => return Err(e),
            Err(e) => {
                tracing::warn!("Message exchange failed: {}", e);
                self.messages.push(Message::error(SEND_FAILURE_NOTICE));
                return Ok(ExchangeOutcome::Failed {
                    notice: e.to_string(),
                });
            }
        };

        let summary = summarize(&pending.message);
        match reply {
            ExchangeReply::Created(created) => {
                let message =
                    assistant_message(&created.response, created.message_id.clone(), latency);
                let title = if created.title.trim().is_empty() {
                    summary.clone()
                } else {
                    created.title
                };
                tracing::info!(chat_id = %created.chat_id, "New chat created");
                self.registry.prepend_active(ChatSession {
                    id: created.chat_id,
                    title,
                    last_message_summary: summary,
                    updated_at: parse_timestamp(created.created_at.as_deref()),
                    is_active: true,
                    message_count: 2,
                });
                self.messages.push(message);
            }
            ExchangeReply::Continued(continued) => {
                let message = assistant_message(&continued.response, continued.message_id, latency);
                if let Some(id) = pending.tag.session_id.as_deref() {
                    self.registry.record_activity(id, &summary, 2);
                }
                self.messages.push(message);
            }
        }

        Ok(ExchangeOutcome::Succeeded)
    }

    /// Send `text` and wait for the reply in place.
    pub async fn send_message(&mut self, text: &str) -> Result<ExchangeOutcome> {
        let pending = self.begin_send(text)?;
        let result = dispatch(self.api.as_ref(), &pending).await;
        self.complete_send(pending, result)
    }
}
