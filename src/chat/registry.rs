//! Ordered list of known chat sessions
//!
//! The registry only tracks membership, order, and which session is active.
//! It never talks to the network; [`ChatController`](super::ChatController)
//! drives it and keeps the displayed messages in step.
//!
//! At most one session is active at any time. No session is active while
//! the user is composing a brand-new chat that has not been sent yet.

use chrono::Utc;

use crate::chat::types::ChatSession;

/// Known chat sessions, most recent first
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Vec<ChatSession>,
}

impl SessionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions in display order
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are known
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Whether `id` is known
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.is_active)
    }

    /// Id of the active session, if any
    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|s| s.id.as_str())
    }

    /// Id of the first session in display order
    pub fn first_id(&self) -> Option<&str> {
        self.sessions.first().map(|s| s.id.as_str())
    }

    /// Resolve a 1-based list position or a literal id
    pub fn resolve(&self, reference: &str) -> Option<&ChatSession> {
        if let Some(session) = self.get(reference) {
            return Some(session);
        }
        reference
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| self.sessions.get(index))
    }

    /// Clear every active flag
    pub fn deactivate_all(&mut self) {
        for session in &mut self.sessions {
            session.is_active = false;
        }
    }

    /// Make `id` the only active session.
    ///
    /// Returns `false` and changes nothing when `id` is unknown.
    pub fn activate(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        for session in &mut self.sessions {
            session.is_active = session.id == id;
        }
        true
    }

    /// Insert at the front and make it the only active session
    pub fn prepend_active(&mut self, mut session: ChatSession) {
        self.sessions.retain(|s| s.id != session.id);
        self.deactivate_all();
        session.is_active = true;
        self.sessions.insert(0, session);
    }

    /// Remove `id`, returning the removed session
    pub fn remove(&mut self, id: &str) -> Option<ChatSession> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    /// Replace the contents with a fresh listing, keeping the order given.
    ///
    /// The active flag survives when the active id is still listed.
    pub fn replace_all(&mut self, sessions: Vec<ChatSession>) {
        let active = self.active_id().map(str::to_string);
        self.sessions = sessions;
        self.deactivate_all();
        if let Some(id) = active {
            self.activate(&id);
        }
    }

    /// Record new activity on `id`
    pub fn record_activity(&mut self, id: &str, summary: &str, added_messages: u64) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.last_message_summary = summary.to_string();
            session.updated_at = Utc::now();
            session.message_count += added_messages;
        }
    }

    /// Overwrite the stored message count of `id`
    pub fn set_message_count(&mut self, id: &str, count: u64) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.message_count = count;
        }
    }
}

#[cfg(test)]
pub(crate) fn session(id: &str) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        title: format!("Chat {}", id),
        last_message_summary: String::new(),
        updated_at: Utc::now(),
        is_active: false,
        message_count: 0,
    }
}
