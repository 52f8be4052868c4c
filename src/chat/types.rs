//! Display model for chat sessions and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Record;

/// Who produced a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user
    User,
    /// Answer from the service
    Assistant,
    /// Local notice that an exchange failed
    Error,
}

impl Role {
    /// Map a stored role string; unknown roles are shown as assistant output
    pub fn from_wire(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "error" => Role::Error,
            _ => Role::Assistant,
        }
    }
}

/// How an assistant reply should be presented
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Prose only
    Text,
    /// Result rows as a table
    Table,
    /// Result rows meant for a chart
    Chart,
}

impl ResponseKind {
    /// Map the wire `type`/`response_type` field.
    ///
    /// Unknown kinds fall back to [`ResponseKind::Text`].
    pub fn from_wire(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "table" => ResponseKind::Table,
            "chart" => ResponseKind::Chart,
            "text" => ResponseKind::Text,
            other => {
                tracing::debug!(kind = %other, "Unknown response kind, showing as text");
                ResponseKind::Text
            }
        }
    }

    /// Whether replies of this kind carry result rows
    pub fn is_tabular(self) -> bool {
        matches!(self, ResponseKind::Table | ResponseKind::Chart)
    }
}

/// One message in the displayed sequence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Server id, or a client-generated UUID for local messages
    pub id: String,
    /// Author
    pub role: Role,
    /// Text shown to the user
    pub content: String,
    /// Generated SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    /// Result rows; never `Some` with an empty vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabular_result: Option<Vec<Record>>,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Client-measured round trip for this reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_latency_ms: Option<u64>,
    /// Presentation kind of an assistant reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_kind: Option<ResponseKind>,
    /// Number of rows the query produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Server-side execution time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl Message {
    /// A locally created user message with a fresh id
    pub fn user(content: impl Into<String>) -> Self {
        Self::local(Role::User, content)
    }

    /// A locally created error notice with a fresh id
    pub fn error(content: impl Into<String>) -> Self {
        Self::local(Role::Error, content)
    }

    fn local(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            sql_query: None,
            tabular_result: None,
            timestamp: Utc::now(),
            response_latency_ms: None,
            response_kind: None,
            row_count: None,
            execution_time: None,
        }
    }

    /// Whether this message should be drawn as a table
    pub fn has_rows(&self) -> bool {
        self.tabular_result.as_ref().is_some_and(|rows| !rows.is_empty())
    }
}

/// One chat thread known to the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    /// Durable id assigned by the service
    pub id: String,
    /// Title shown in session lists
    pub title: String,
    /// Short preview of the latest message
    pub last_message_summary: String,
    /// Last activity
    pub updated_at: DateTime<Utc>,
    /// Whether this is the session on screen
    pub is_active: bool,
    /// Number of stored messages
    pub message_count: u64,
}
