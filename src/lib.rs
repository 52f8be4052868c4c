//! Querychat - client library for an AI-assisted SQL chat service
//!
//! Users ask questions in plain language; the service answers with prose,
//! the SQL it generated, and the resulting rows. This crate keeps the
//! client side of that conversation consistent: which chats exist, which
//! one is on screen, and which reply belongs where.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: HTTP client and wire types for the chat service
//! - `auth`: signed-in state and credential persistence
//! - `chat`: session registry, message reconciliation, and the controller
//! - `commands`: CLI command handlers and terminal rendering
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use querychat::{ChatController, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = querychat::commands::build_client(&config)?;
//!     let mut controller = ChatController::new(Arc::new(client));
//!     controller.load_history().await?;
//!     controller.send_message("How many orders shipped last week?").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use api::{ApiClient, ChatApi};
pub use auth::AuthContext;
pub use chat::{ChatController, ChatSession, Message, SessionRegistry};
pub use config::Config;
pub use error::{QuerychatError, Result};

#[cfg(test)]
pub mod test_utils;
