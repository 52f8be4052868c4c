//! Command-line interface definition for Querychat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, browsing history, and account access.

use crate::api::ExportFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Querychat - ask your database questions in plain language
///
/// Talks to a remote SQL chat service: questions go up, generated SQL and
/// result tables come back.
#[derive(Parser, Debug, Clone)]
#[command(name = "querychat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the service base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Querychat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing chat by ID instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,

        /// Database to query (e.g. raw_database, agg_database)
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Ask a single question and print the reply
    Ask {
        /// The question to send
        question: String,

        /// Continue an existing chat instead of starting a new one
        #[arg(long)]
        chat: Option<String>,

        /// Database to query (e.g. raw_database, agg_database)
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Manage chat history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Browse the databases and tables the service can query
    Schema {
        /// Database to describe; lists databases when omitted
        database: Option<String>,

        /// Only describe this table
        #[arg(short, long)]
        table: Option<String>,

        /// Also print the sample rows the service returns
        #[arg(long)]
        samples: bool,
    },

    /// Sign in and store the session token
    Login {
        /// Account username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Create a new account
    Register {
        /// Account username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,

        /// Full name shown on the account
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Request a password reset email
    ForgotPassword {
        /// Account email
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password using a reset token
    ResetPassword {
        /// Token from the reset email
        #[arg(short, long)]
        token: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show the signed-in account
    Whoami,
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List chats stored by the service
    List,

    /// Print every message of a chat
    Show {
        /// Chat ID
        id: String,
    },

    /// Delete a chat
    Delete {
        /// Chat ID
        id: String,
    },

    /// Download the result rows of one reply as a file
    Export {
        /// Message ID of the assistant reply
        message_id: String,

        /// File format: json, csv, excel or pdf
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Output file (defaults to query_results_<ID>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Database chosen with `--database` on `chat` or `ask`
    pub fn database(&self) -> Option<&str> {
        match self {
            Commands::Chat { database, .. } | Commands::Ask { database, .. } => {
                database.as_deref()
            }
            _ => None,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            api_url: None,
            verbose: false,
            command: Commands::Whoami,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Whoami));
    }

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["querychat", "chat"]).unwrap();
        if let Commands::Chat { resume, database } = cli.command {
            assert_eq!(resume, None);
            assert_eq!(database, None);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_chat_with_resume() {
        let cli = Cli::try_parse_from(["querychat", "chat", "--resume", "42"]).unwrap();
        if let Commands::Chat { resume, .. } = cli.command {
            assert_eq!(resume, Some("42".to_string()));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::try_parse_from([
            "querychat",
            "ask",
            "How many orders shipped last week?",
            "--chat",
            "abc",
            "--database",
            "agg_database",
        ])
        .unwrap();
        assert_eq!(cli.command.database(), Some("agg_database"));
        if let Commands::Ask { question, chat, .. } = cli.command {
            assert_eq!(question, "How many orders shipped last week?");
            assert_eq!(chat, Some("abc".to_string()));
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_history_subcommands() {
        let cli = Cli::try_parse_from(["querychat", "history", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::List
            }
        ));

        let cli = Cli::try_parse_from(["querychat", "history", "delete", "7"]).unwrap();
        if let Commands::History {
            command: HistoryCommand::Delete { id },
        } = cli.command
        {
            assert_eq!(id, "7");
        } else {
            panic!("Expected History Delete command");
        }
    }

    #[test]
    fn test_cli_parse_history_export() {
        let cli = Cli::try_parse_from(["querychat", "history", "export", "m-9"]).unwrap();
        if let Commands::History {
            command:
                HistoryCommand::Export {
                    message_id,
                    format,
                    output,
                },
        } = cli.command
        {
            assert_eq!(message_id, "m-9");
            assert_eq!(format, ExportFormat::Csv);
            assert_eq!(output, None);
        } else {
            panic!("Expected History Export command");
        }

        let cli = Cli::try_parse_from([
            "querychat", "history", "export", "m-9", "--format", "excel", "-o", "out.xlsx",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::Export {
                    format: ExportFormat::Excel,
                    ..
                }
            }
        ));

        let cli = Cli::try_parse_from(["querychat", "history", "export", "m-9", "-f", "docx"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_schema() {
        let cli = Cli::try_parse_from(["querychat", "schema"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Schema { database: None, table: None, samples: false }
        ));

        let cli = Cli::try_parse_from([
            "querychat", "schema", "raw_database", "--table", "orders", "--samples",
        ])
        .unwrap();
        if let Commands::Schema {
            database,
            table,
            samples,
        } = cli.command
        {
            assert_eq!(database.as_deref(), Some("raw_database"));
            assert_eq!(table.as_deref(), Some("orders"));
            assert!(samples);
        } else {
            panic!("Expected Schema command");
        }
    }

    #[test]
    fn test_cli_parse_auth_commands() {
        let cli = Cli::try_parse_from(["querychat", "login", "--username", "ana"]).unwrap();
        if let Commands::Login { username } = cli.command {
            assert_eq!(username, Some("ana".to_string()));
        } else {
            panic!("Expected Login command");
        }

        let cli = Cli::try_parse_from([
            "querychat",
            "register",
            "-u",
            "ana",
            "--full-name",
            "Ana Lima",
        ])
        .unwrap();
        if let Commands::Register {
            username,
            email,
            full_name,
        } = cli.command
        {
            assert_eq!(username.as_deref(), Some("ana"));
            assert_eq!(email, None);
            assert_eq!(full_name.as_deref(), Some("Ana Lima"));
        } else {
            panic!("Expected Register command");
        }

        let cli = Cli::try_parse_from(["querychat", "forgot-password", "--email", "a@b.io"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["querychat", "reset-password"]);
        assert!(cli.is_err(), "token is required");
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "querychat",
            "-v",
            "--api-url",
            "https://sql.example.com/api",
            "logout",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.api_url.as_deref(), Some("https://sql.example.com/api"));
        assert!(matches!(cli.command, Commands::Logout));
    }
}
