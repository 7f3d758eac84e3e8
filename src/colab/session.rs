use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Presence status of a collaborator within a document view
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Idle,
    Disconnected,
}

/// Key of a session: one per (user, document) pairing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub document: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            document: document.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationSession {
    pub id: String,
    pub user_id: String,
    pub document: String,
    pub status: SessionStatus,
    pub current_section_id: Option<String>,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl CollaborationSession {
    /// Create an active session for the user in the document
    pub fn active(
        user_id: &str,
        document: &str,
        current_section_id: Option<String>,
        heartbeat_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: session_id(user_id, document),
            user_id: user_id.to_string(),
            document: document.to_string(),
            status: SessionStatus::Active,
            current_section_id,
            last_heartbeat_at: heartbeat_at,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.user_id.clone(), self.document.clone())
    }
}

/// Session ids are stable for a (user, document) pairing. The document is
/// length-prefixed so separators inside either part cannot collide.
pub fn session_id(user_id: &str, document: &str) -> String {
    format!("{}:{}:{}", document.len(), document, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_stable_and_distinct() {
        assert_eq!(session_id("u1", "doc-1"), "5:doc-1:u1");
        assert_eq!(session_id("u1", "doc-1"), session_id("u1", "doc-1"));
        assert_ne!(session_id("c", "a:b"), session_id("b:c", "a"));
    }
}
