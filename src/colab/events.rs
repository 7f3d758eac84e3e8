use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::activity::{Activity, ActivityFeedItem};
use super::session::{CollaborationSession, SessionStatus};

/// Presence signal as delivered by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceUpdate {
    pub user_id: String,
    pub document: String,
    pub status: SessionStatus,
    pub current_section_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PresenceUpdate {
    pub fn to_session(&self) -> CollaborationSession {
        let mut session = CollaborationSession::active(
            &self.user_id,
            &self.document,
            self.current_section_id.clone(),
            self.timestamp,
        );
        session.status = self.status;
        session
    }
}

/// Activity event as delivered by the transport; `id` is assigned per document
/// in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub id: u64,
    pub user_id: String,
    pub document: String,
    pub activity_type: String,
    pub activity_data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn to_feed_item(&self) -> ActivityFeedItem {
        ActivityFeedItem {
            id: self.id,
            user_id: self.user_id.clone(),
            document: self.document.clone(),
            activity: Activity::from_wire(&self.activity_type, &self.activity_data),
            created_at: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    Presence(PresenceUpdate),
    Activity(ActivityEvent),
}

impl TransportMessage {
    pub fn document(&self) -> &str {
        match self {
            TransportMessage::Presence(update) => &update.document,
            TransportMessage::Activity(event) => &event.document,
        }
    }
}
