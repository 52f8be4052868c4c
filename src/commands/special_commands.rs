//! Special commands parser for interactive chat mode
//!
//! Special commands manage sessions instead of being sent to the service:
//! - Start a new chat
//! - List, switch, and delete chats
//! - Reprint the current chat
//! - Display help and exit
//!
//! Commands are prefixed with `/` and are case-insensitive.

use colored::Colorize;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Leave the current chat and compose a new one
    NewChat,

    /// Reload and print the chat list
    ListSessions,

    /// Put a chat on screen, by list position or id
    Switch(String),

    /// Delete a chat, by list position or id
    Delete(String),

    /// Print the current chat again
    ShowHistory,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as a question
    None,
}

/// Parse user input into a special command
///
/// # Errors
///
/// Returns [`CommandError`] for unknown `/commands` or missing arguments.
///
/// # Examples
///
/// ```
/// use querychat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewChat);
/// assert_eq!(
///     parse_special_command("/switch 2").unwrap(),
///     SpecialCommand::Switch("2".to_string())
/// );
/// assert_eq!(
///     parse_special_command("how many users signed up?").unwrap(),
///     SpecialCommand::None
/// );
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match command.as_str() {
        "/new" => Ok(SpecialCommand::NewChat),
        "/sessions" | "/chats" | "/list" => Ok(SpecialCommand::ListSessions),
        "/switch" | "/open" => arg
            .map(|a| SpecialCommand::Switch(a.to_string()))
            .ok_or_else(|| CommandError::MissingArgument {
                command: "/switch".to_string(),
                usage: "/switch <number|id>".to_string(),
            }),
        "/delete" | "/rm" => arg
            .map(|a| SpecialCommand::Delete(a.to_string()))
            .ok_or_else(|| CommandError::MissingArgument {
                command: "/delete".to_string(),
                usage: "/delete <number|id>".to_string(),
            }),
        "/history" | "/show" => Ok(SpecialCommand::ShowHistory),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(command)),
    }
}

/// Print the special command reference
pub fn print_help() {
    println!("\n{}", "Chat commands".bold());
    println!("  {:<22} Start a new chat", "/new".cyan());
    println!("  {:<22} List your chats", "/sessions".cyan());
    println!("  {:<22} Open a chat by number or id", "/switch <n|id>".cyan());
    println!("  {:<22} Delete a chat by number or id", "/delete <n|id>".cyan());
    println!("  {:<22} Print the current chat again", "/history".cyan());
    println!("  {:<22} Show this help", "/help".cyan());
    println!("  {:<22} Leave", "/exit".cyan());
    println!("\nAnything else is sent as a question.\n");
}
