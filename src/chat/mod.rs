//! Chat sessions and the message pane
//!
//! - `types`: display model ([`ChatSession`], [`Message`])
//! - `registry`: ordered session list with a single active entry
//! - `reconcile`: wire-to-display conversion, including legacy history
//! - `controller`: the lifecycle that ties them to the remote service

pub mod controller;
pub mod reconcile;
pub mod registry;
pub mod types;

pub use controller::{
    dispatch, fetch_messages, ChatController, DeleteOutcome, ExchangeOutcome, ExchangeReply,
    ExchangeState, PendingExchange, SEND_FAILURE_NOTICE,
};
pub use registry::SessionRegistry;
pub use types::{ChatSession, Message, ResponseKind, Role};
