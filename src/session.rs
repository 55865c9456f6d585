//! Per-session conversation memory.
//!
//! A process-wide table from session id to a bounded, ordered history of
//! query/answer exchanges. Sessions live for the process lifetime; nothing
//! is persisted.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One completed query/answer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub user_query: String,
    pub assistant_answer: String,
}

/// Process-wide session table with bounded per-session history.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, VecDeque<Exchange>>>,
    max_history: usize,
}

impl SessionManager {
    /// Create a manager retaining at most `max_history` exchanges per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Generate a fresh opaque session identifier.
    pub fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap()
            .insert(session_id.clone(), VecDeque::new());
        debug!(%session_id, "created session");
        session_id
    }

    /// Render a session's history as alternating "User:"/"Assistant:" lines,
    /// oldest first.
    ///
    /// Returns `None` when the session has no exchanges yet, so callers can
    /// distinguish "no history" from an empty string.
    pub fn get_conversation_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap();
        let exchanges = sessions.get(session_id)?;
        if exchanges.is_empty() {
            return None;
        }

        let rendered = exchanges
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user_query, e.assistant_answer))
            .collect::<Vec<_>>()
            .join("\n");
        Some(rendered)
    }

    /// Append one exchange, creating the session if needed and evicting the
    /// oldest exchanges beyond the retention cap.
    pub fn add_exchange(&self, session_id: &str, user_query: &str, assistant_answer: &str) {
        let mut sessions = self.sessions.write().unwrap();
        let exchanges = sessions.entry(session_id.to_string()).or_default();

        exchanges.push_back(Exchange {
            user_query: user_query.to_string(),
            assistant_answer: assistant_answer.to_string(),
        });
        while exchanges.len() > self.max_history {
            exchanges.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_round_trip() {
        let manager = SessionManager::new(2);
        let sid = manager.create_session();

        manager.add_exchange(&sid, "What is Python?", "Python is a programming language.");

        let history = manager.get_conversation_history(&sid).unwrap();
        assert!(history.contains("User: What is Python?"));
        assert!(history.contains("Assistant: Python is a programming language."));
    }

    #[test]
    fn test_empty_session_has_no_history_sentinel() {
        let manager = SessionManager::new(2);
        let sid = manager.create_session();

        // None, not an empty string.
        assert_eq!(manager.get_conversation_history(&sid), None);
        assert_eq!(manager.get_conversation_history("unknown-session"), None);
    }

    #[test]
    fn test_implicit_session_creation_on_add() {
        let manager = SessionManager::new(2);
        manager.add_exchange("adhoc", "q", "a");
        assert!(manager.get_conversation_history("adhoc").is_some());
    }

    #[test]
    fn test_retention_cap_evicts_oldest_first() {
        let manager = SessionManager::new(2);
        let sid = manager.create_session();

        manager.add_exchange(&sid, "q1", "a1");
        manager.add_exchange(&sid, "q2", "a2");
        manager.add_exchange(&sid, "q3", "a3");

        let history = manager.get_conversation_history(&sid).unwrap();
        assert!(!history.contains("q1"));
        assert!(history.contains("q2"));
        assert!(history.contains("q3"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let manager = SessionManager::new(2);
        assert_ne!(manager.create_session(), manager.create_session());
    }

    #[test]
    fn test_history_is_ordered_oldest_first() {
        let manager = SessionManager::new(5);
        let sid = manager.create_session();
        manager.add_exchange(&sid, "first", "1");
        manager.add_exchange(&sid, "second", "2");

        let history = manager.get_conversation_history(&sid).unwrap();
        let first_pos = history.find("first").unwrap();
        let second_pos = history.find("second").unwrap();
        assert!(first_pos < second_pos);
    }
}
