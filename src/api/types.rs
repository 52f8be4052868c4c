//! Wire types for the remote chat service
//!
//! These structures mirror the JSON bodies exchanged with the service. They
//! are deliberately tolerant: ids may arrive as strings or numbers, optional
//! fields may be missing or `null`, and result payloads are kept as raw JSON
//! until the reconciler turns them into records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One result row, keyed by column name
pub type Record = serde_json::Map<String, Value>;

/// Accept an identifier encoded as either a JSON string or a number.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Body of `POST /chat/new` and `POST /chat/continue/{id}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageRequest {
    /// The user's natural-language question
    pub message: String,
    /// Database the question targets, e.g. `raw_database` or `agg_database`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
}

/// The assistant's answer, shared by both send endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    /// Declared kind: `text`, `table` or `chart`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Human-readable answer text
    #[serde(default)]
    pub content: String,
    /// SQL generated for the question
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Result rows; normally an array of objects
    #[serde(default)]
    pub data: Option<Value>,
    /// Server-side execution time in seconds
    #[serde(default)]
    pub execution_time: Option<f64>,
    /// Number of rows the query produced
    #[serde(default)]
    pub rows_count: Option<u64>,
}

/// Response of `POST /chat/new`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewChatResponse {
    /// Durable id assigned to the new chat
    #[serde(deserialize_with = "id_string")]
    pub chat_id: String,
    /// Server-generated chat title
    #[serde(default)]
    pub title: String,
    /// Id of the stored assistant message
    #[serde(default, deserialize_with = "opt_id_string")]
    pub message_id: Option<String>,
    /// Creation timestamp as sent by the server
    #[serde(default)]
    pub created_at: Option<String>,
    /// The assistant's answer
    pub response: ChatReply,
}

/// Response of `POST /chat/continue/{id}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ContinueChatResponse {
    /// Id of the stored assistant message
    #[serde(default, deserialize_with = "opt_id_string")]
    pub message_id: Option<String>,
    /// The assistant's answer
    pub response: ChatReply,
}

/// One entry of `GET /chat/history`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatSummary {
    /// Chat id
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Chat title
    #[serde(default)]
    pub title: String,
    /// Last activity timestamp as sent by the server
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Number of stored messages
    #[serde(default)]
    pub message_count: u64,
    /// Preview of the most recent message, when the server provides one
    #[serde(default, alias = "last_message_summary")]
    pub last_message: Option<String>,
}

/// `GET /chat/history` is served either as a bare array or wrapped
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChatListing {
    Bare(Vec<ChatSummary>),
    Wrapped { chats: Vec<ChatSummary> },
}

impl ChatListing {
    pub(crate) fn into_vec(self) -> Vec<ChatSummary> {
        match self {
            ChatListing::Bare(chats) | ChatListing::Wrapped { chats } => chats,
        }
    }
}

/// One stored message of `GET /chat/history/{id}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HistoryMessage {
    /// Message id
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// `user`, `assistant` or `error`
    #[serde(default)]
    pub role: String,
    /// Message text; older records embed the result payload here
    #[serde(default)]
    pub content: String,
    /// SQL generated for the question
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Declared kind of the stored reply
    #[serde(default)]
    pub response_type: Option<String>,
    /// Server-side execution time in seconds
    #[serde(default)]
    pub execution_time: Option<f64>,
    /// Number of rows the query produced
    #[serde(default)]
    pub rows_count: Option<u64>,
    /// Creation timestamp as sent by the server
    #[serde(default)]
    pub created_at: Option<String>,
    /// Whether the server holds result data for this message
    #[serde(default)]
    pub has_data: bool,
    /// Result rows, when the server inlines them
    #[serde(default)]
    pub data: Option<Value>,
}

/// Response of `GET /chat/history/{id}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatHistoryResponse {
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// Rows behind a stored reply (`GET /chat/data/{message_id}`)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MessageData {
    /// Message the rows belong to
    #[serde(default, deserialize_with = "opt_id_string")]
    pub message_id: Option<String>,
    /// Result rows
    #[serde(default)]
    pub data: Option<Value>,
    /// Column names in selection order
    #[serde(default)]
    pub columns: Vec<String>,
    /// `(rows, columns)` of the full result
    #[serde(default)]
    pub shape: Option<(u64, u64)>,
    /// SQL that produced the rows
    #[serde(default)]
    pub sql_query: Option<String>,
    /// Declared kind of the stored reply
    #[serde(default)]
    pub response_type: Option<String>,
}

/// `GET /db-info/databases`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DatabaseListResponse {
    #[serde(default)]
    pub status: Option<String>,
    /// Name to description, in the order the service lists them
    #[serde(default)]
    pub databases: serde_json::Map<String, Value>,
}

/// A database the service can query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// Identifier, also used as `database_type` when chatting
    pub name: String,
    /// Human-readable description
    pub description: String,
}

/// `GET /db-info/schema/{db}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SchemaResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub schema: RawSchema,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSchema {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub database_path: Option<String>,
    /// Table name to table description, in service order
    #[serde(default)]
    pub tables: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTable {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub sample_data: Vec<Record>,
}

/// One column of a table
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// SQL type as reported by the database
    #[serde(rename = "type", default)]
    pub data_type: String,
    /// Part of the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Declared `NOT NULL`
    #[serde(default)]
    pub not_null: bool,
}

/// One table of a database schema
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
    /// A few example rows, when the service provides them
    pub sample_data: Vec<Record>,
}

/// Schema of one database
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    /// Database identifier
    pub database: String,
    /// Location of the database on the service host
    pub database_path: Option<String>,
    /// Tables in the order the service lists them
    pub tables: Vec<TableSchema>,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Full name shown in the profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Body of `POST /auth/forgot-password`
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    /// Account email
    pub email: String,
}

/// Body of `POST /auth/reset-password`
#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    /// Token from the reset email
    pub token: String,
    /// Replacement password
    pub new_password: String,
}

/// Account details returned alongside a token
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Account id
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Account name
    #[serde(default)]
    pub username: Option<String>,
    /// Full name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Response of the login and register endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token, absent when registration requires confirmation
    #[serde(default, alias = "token")]
    pub access_token: Option<String>,
    /// Token scheme, `bearer` when omitted
    #[serde(default)]
    pub token_type: Option<String>,
    /// Signed-in account
    #[serde(default)]
    pub user: Option<UserProfile>,
    /// Informational message from the service
    #[serde(default)]
    pub message: Option<String>,
    /// Registration succeeded but the account must be confirmed first
    #[serde(default)]
    pub confirmation_required: bool,
}

/// Generic `{message}` acknowledgement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {
    /// Informational message from the service
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
}
