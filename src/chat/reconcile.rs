//! Conversion from wire shapes to the display model
//!
//! Replies from the send endpoints carry structured fields. Stored history
//! comes in two generations: current records carry the same structured
//! fields, older table/chart records serialized the whole result payload
//! into `content`. [`history_message`] tries the old shape first and falls
//! back to plain text; nothing in this module returns an error.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::time::Duration;

use crate::api::{ChatReply, ChatSummary, HistoryMessage, MessageData, Record};
use crate::chat::types::{ChatSession, Message, ResponseKind, Role};

/// Longest session preview kept in the registry
const SUMMARY_CHARS: usize = 60;

/// Result payload recovered from a legacy `content` field
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTable {
    /// Prose carried next to the rows, if any
    pub text: Option<String>,
    /// SQL carried next to the rows, if any
    pub sql_query: Option<String>,
    /// The rows; may be empty
    pub rows: Vec<Record>,
}

/// Turn a JSON result payload into records.
///
/// Accepts an array of objects, or `{columns: [..], rows: [[..]]}`. Anything
/// else yields no records.
pub fn records_from_value(value: &Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        Value::Object(obj) => {
            let columns = obj.get("columns").and_then(Value::as_array);
            let rows = obj.get("rows").and_then(Value::as_array);
            match (columns, rows) {
                (Some(columns), Some(rows)) => rows
                    .iter()
                    .filter_map(Value::as_array)
                    .map(|cells| {
                        columns
                            .iter()
                            .zip(cells.iter())
                            .map(|(col, cell)| (column_name(col), cell.clone()))
                            .collect()
                    })
                    .collect(),
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn column_name(col: &Value) -> String {
    match col {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    }
}

/// `None` for an empty result so it is shown as "no rows"
pub fn non_empty(rows: Vec<Record>) -> Option<Vec<Record>> {
    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}

/// Interpret `content` as a serialized result payload.
///
/// Returns `None` when `content` is not JSON or is JSON without rows.
pub fn parse_embedded_table(content: &str) -> Option<EmbeddedTable> {
    let value: Value = serde_json::from_str(content.trim()).ok()?;
    match &value {
        Value::Array(_) => Some(EmbeddedTable {
            text: None,
            sql_query: None,
            rows: records_from_value(&value),
        }),
        Value::Object(obj) => {
            let rows = obj
                .get("data")
                .or_else(|| obj.get("results"))
                .map(records_from_value)
                .unwrap_or_else(|| records_from_value(&value));
            let text = ["content", "message", "summary"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            let sql_query = obj
                .get("sql_query")
                .and_then(Value::as_str)
                .map(str::to_string);
            if rows.is_empty() && text.is_none() && sql_query.is_none() {
                return None;
            }
            Some(EmbeddedTable {
                text,
                sql_query,
                rows,
            })
        }
        _ => None,
    }
}

/// Parse a server timestamp; naive timestamps are taken as UTC.
///
/// Missing or unparseable values become "now".
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Utc::now();
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }
    tracing::debug!(timestamp = %raw, "Unparseable timestamp, using now");
    Utc::now()
}

/// Single-line preview of `text`
pub fn summarize(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SUMMARY_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SUMMARY_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

/// Build the assistant message for a fresh reply
pub fn assistant_message(
    reply: &ChatReply,
    message_id: Option<String>,
    latency: Duration,
) -> Message {
    let kind = reply
        .kind
        .as_deref()
        .map(ResponseKind::from_wire)
        .unwrap_or(ResponseKind::Text);
    let tabular_result = reply
        .data
        .as_ref()
        .map(records_from_value)
        .and_then(non_empty);

    Message {
        id: message_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        role: Role::Assistant,
        content: reply.content.clone(),
        sql_query: reply.sql_query.clone(),
        tabular_result,
        timestamp: Utc::now(),
        response_latency_ms: Some(latency.as_millis() as u64),
        response_kind: Some(kind),
        row_count: reply.rows_count,
        execution_time: reply.execution_time,
    }
}

/// Build the display message for a stored history record
pub fn history_message(stored: HistoryMessage) -> Message {
    let role = Role::from_wire(&stored.role);
    let kind = stored.response_type.as_deref().map(ResponseKind::from_wire);
    let mut content = stored.content;
    let mut sql_query = stored.sql_query;
    let mut tabular_result = None;

    if kind.is_some_and(ResponseKind::is_tabular) {
        match parse_embedded_table(&content) {
            Some(embedded) => {
                let row_total = embedded.rows.len();
                content = embedded
                    .text
                    .unwrap_or_else(|| format!("Query returned {} rows", row_total));
                sql_query = sql_query.or(embedded.sql_query);
                tabular_result = non_empty(embedded.rows);
            }
            None => {
                tracing::debug!(message_id = %stored.id, "No embedded result payload, showing content as text");
            }
        }
        if tabular_result.is_none() {
            tabular_result = stored
                .data
                .as_ref()
                .map(records_from_value)
                .and_then(non_empty);
        }
    }

    Message {
        id: stored.id,
        role,
        content,
        sql_query,
        tabular_result,
        timestamp: parse_timestamp(stored.created_at.as_deref()),
        response_latency_ms: None,
        response_kind: kind,
        row_count: stored.rows_count,
        execution_time: stored.execution_time,
    }
}

/// Fill a stored reply with rows fetched from `/chat/data/{id}`.
///
/// Rows follow the order of `columns` when the service sends it. Fields the
/// history record already carried are kept.
pub fn apply_message_data(message: &mut Message, payload: MessageData) {
    let rows = match payload.data {
        Some(Value::Array(items))
            if !payload.columns.is_empty() && items.iter().all(Value::is_array) =>
        {
            let mut table = serde_json::Map::new();
            table.insert("columns".to_string(), Value::from(payload.columns.clone()));
            table.insert("rows".to_string(), Value::Array(items));
            records_from_value(&Value::Object(table))
        }
        Some(data) => records_from_value(&data),
        None => Vec::new(),
    };
    let rows = if payload.columns.is_empty() {
        rows
    } else {
        rows.into_iter()
            .map(|row| order_columns(row, &payload.columns))
            .collect()
    };

    if message.response_kind.is_none() {
        message.response_kind = payload.response_type.as_deref().map(ResponseKind::from_wire);
    }
    message.sql_query = message.sql_query.take().or(payload.sql_query);
    message.row_count = message
        .row_count
        .or(payload.shape.map(|(rows, _)| rows))
        .or(Some(rows.len() as u64));
    message.tabular_result = non_empty(rows);
}

fn order_columns(mut row: Record, columns: &[String]) -> Record {
    let mut ordered = Record::new();
    for column in columns {
        if let Some(value) = row.remove(column) {
            ordered.insert(column.clone(), value);
        }
    }
    ordered.extend(row);
    ordered
}

/// Build a registry entry from a history listing entry
pub fn session_from_summary(summary: ChatSummary) -> ChatSession {
    ChatSession {
        updated_at: parse_timestamp(summary.updated_at.as_deref()),
        last_message_summary: summary
            .last_message
            .as_deref()
            .map(summarize)
            .unwrap_or_default(),
        id: summary.id,
        title: summary.title,
        is_active: false,
        message_count: summary.message_count,
    }
}
