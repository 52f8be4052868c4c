//! Terminal rendering of chat state
//!
//! Replies are printed as prose, then the generated SQL, then the result
//! rows as a table. Chart replies are drawn as tables too.

use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use serde_json::Value;

use crate::api::{DatabaseInfo, Record, TableSchema};
use crate::chat::{ChatSession, Message, ResponseKind, Role};
use crate::config::DisplayConfig;

/// Text for one table cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Column names in first-seen order across all rows
pub fn columns(rows: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// Build a table of at most `max_rows` rows.
///
/// Returns the table and the number of rows left out.
pub fn build_table(rows: &[Record], max_rows: usize) -> (Table, usize) {
    let names = columns(rows);
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        names.iter().map(|n| Cell::new(n).style_spec("b")).collect(),
    ));

    for row in rows.iter().take(max_rows) {
        table.add_row(Row::new(
            names
                .iter()
                .map(|name| Cell::new(&row.get(name).map(cell_text).unwrap_or_default()))
                .collect(),
        ));
    }

    (table, rows.len().saturating_sub(max_rows))
}

/// Print one message
pub fn print_message(message: &Message, display: &DisplayConfig) {
    match message.role {
        Role::User => {
            println!("{} {}", "You:".cyan().bold(), message.content);
        }
        Role::Error => {
            println!("{} {}", "Error:".red().bold(), message.content.red());
        }
        Role::Assistant => print_assistant(message, display),
    }
}

fn print_assistant(message: &Message, display: &DisplayConfig) {
    if !message.content.trim().is_empty() {
        println!("{} {}", "Assistant:".green().bold(), message.content);
    } else {
        println!("{}", "Assistant:".green().bold());
    }

    if display.show_sql {
        if let Some(sql) = message.sql_query.as_deref().filter(|s| !s.trim().is_empty()) {
            println!("{}", "SQL:".bold());
            for line in sql.lines() {
                println!("  {}", line.yellow());
            }
        }
    }

    let tabular = message.response_kind.is_some_and(ResponseKind::is_tabular);
    match &message.tabular_result {
        Some(rows) if !rows.is_empty() => {
            let (table, hidden) = build_table(rows, display.max_table_rows);
            table.printstd();
            if hidden > 0 {
                println!("{}", format!("... {} more rows not shown", hidden).dimmed());
            }
        }
        _ if tabular => println!("{}", "(no rows)".dimmed()),
        _ => {}
    }

    if display.show_timing {
        let mut parts = Vec::new();
        if let Some(rows) = message.row_count {
            parts.push(format!("{} rows", rows));
        }
        if let Some(secs) = message.execution_time {
            parts.push(format!("query {:.2}s", secs));
        }
        if let Some(ms) = message.response_latency_ms {
            parts.push(format!("round trip {} ms", ms));
        }
        if !parts.is_empty() {
            println!("{}", parts.join(" · ").dimmed());
        }
    }
}

/// Print a whole message sequence
pub fn print_messages(messages: &[Message], display: &DisplayConfig) {
    if messages.is_empty() {
        println!("{}", "No messages yet.".yellow());
        return;
    }
    for message in messages {
        print_message(message, display);
        println!();
    }
}

/// Print the session list with 1-based positions
pub fn print_sessions(sessions: &[ChatSession]) {
    if sessions.is_empty() {
        println!("{}", "No chat history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "#".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for (index, session) in sessions.iter().enumerate() {
        let marker = if session.is_active {
            format!("*{}", index + 1).green().to_string()
        } else {
            (index + 1).to_string()
        };
        let title = truncate(&session.title, 40);
        let updated = session.updated_at.format("%Y-%m-%d %H:%M").to_string();
        table.add_row(prettytable::row![
            marker,
            session.id.cyan(),
            title,
            session.message_count,
            updated
        ]);
    }

    table.printstd();
}

/// Print the databases the service exposes
pub fn print_databases(databases: &[DatabaseInfo]) {
    if databases.is_empty() {
        println!("{}", "No databases available.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Database".bold(), "Description".bold()]);
    for db in databases {
        table.add_row(prettytable::row![db.name.cyan(), truncate(&db.description, 70)]);
    }
    table.printstd();
}

/// Column listing of one table
pub fn column_table(schema: &TableSchema) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(Row::new(
        ["Column", "Type", "Key", "Nullable"]
            .iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));
    for column in &schema.columns {
        table.add_row(Row::new(vec![
            Cell::new(&column.name),
            Cell::new(&column.data_type),
            Cell::new(if column.primary_key { "PK" } else { "" }),
            Cell::new(if column.not_null { "NO" } else { "YES" }),
        ]));
    }
    table
}

/// Print a table's columns, and its sample rows when asked
pub fn print_table_schema(schema: &TableSchema, samples: bool, display: &DisplayConfig) {
    println!(
        "{} {}",
        schema.name.bold(),
        format!("({} columns)", schema.columns.len()).dimmed()
    );
    column_table(schema).printstd();

    if samples && !schema.sample_data.is_empty() {
        let (table, hidden) = build_table(&schema.sample_data, display.max_table_rows);
        println!("{}", "Sample rows:".dimmed());
        table.printstd();
        if hidden > 0 {
            println!("{}", format!("... {} more rows", hidden).dimmed());
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
