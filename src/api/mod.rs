//! Remote chat service access
//!
//! [`ChatApi`] is the seam between chat state and the network: the
//! controller only talks to the trait, [`ApiClient`] implements it over
//! HTTP, and tests substitute an in-memory fake.

pub mod http;
pub mod types;

pub use http::{ApiClient, ExportFormat, Registration};
pub use types::{
    AuthResponse, ChatReply, ChatSummary, ColumnInfo, ContinueChatResponse, DatabaseInfo,
    DatabaseSchema, HistoryMessage, MessageData, NewChatResponse, Record, RegisterRequest, TableSchema,
    UserProfile,
};

use crate::error::Result;
use async_trait::async_trait;

/// Chat endpoints of the remote service
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Start a new chat with its first message (`POST /chat/new`)
    async fn new_chat(&self, message: &str) -> Result<NewChatResponse>;

    /// Add a message to an existing chat (`POST /chat/continue/{id}`)
    async fn continue_chat(&self, chat_id: &str, message: &str) -> Result<ContinueChatResponse>;

    /// List the user's chats (`GET /chat/history`)
    async fn list_chats(&self) -> Result<Vec<ChatSummary>>;

    /// Fetch the stored messages of one chat (`GET /chat/history/{id}`)
    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<HistoryMessage>>;

    /// Delete a chat (`DELETE /chat/history/{id}`)
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;

    /// Fetch the rows stored for one reply (`GET /chat/data/{message_id}`)
    async fn message_data(&self, message_id: &str) -> Result<MessageData>;
}
