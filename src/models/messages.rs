use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::colab::{ActivityFeedItemView, CollaborationSession, NotificationEvent, SessionStatus};

fn default_status() -> SessionStatus {
    SessionStatus::Active
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    #[serde(default = "default_status")]
    pub status: SessionStatus,
    #[serde(default)]
    pub current_section_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMessage {
    pub activity_type: String,
    #[serde(default)]
    pub activity_data: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PingMessage {}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "presence")]
    Presence(PresenceMessage),
    #[serde(rename = "activity")]
    Activity(ActivityMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    pub document: String,
    pub sessions: Vec<CollaborationSession>,
    pub feed: Vec<ActivityFeedItemView>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionsMessage {
    pub sessions: Vec<CollaborationSession>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemMessage {
    pub item: ActivityFeedItemView,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "snapshot")]
    Snapshot(SnapshotMessage),
    #[serde(rename = "sessions")]
    Sessions(SessionsMessage),
    #[serde(rename = "activity")]
    Activity(FeedItemMessage),
    #[serde(rename = "notification")]
    Notification(NotificationEvent),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_messages() {
        let msg: ReceivedMessage = serde_json::from_str(
            r#"{"type":"presence","status":"idle","currentSectionId":"s1"}"#,
        )
        .unwrap();
        match msg {
            ReceivedMessage::Presence(p) => {
                assert_eq!(p.status, SessionStatus::Idle);
                assert_eq!(p.current_section_id.as_deref(), Some("s1"));
            }
            other => panic!("unexpected message {:?}", other),
        }

        let msg: ReceivedMessage = serde_json::from_str(r#"{"type":"presence"}"#).unwrap();
        assert!(matches!(msg, ReceivedMessage::Presence(PresenceMessage { status: SessionStatus::Active, .. })));

        let msg: ReceivedMessage = serde_json::from_str(
            r#"{"type":"activity","activityType":"section_started","activityData":{"section_title":"Goals"}}"#,
        )
        .unwrap();
        match msg {
            ReceivedMessage::Activity(a) => {
                assert_eq!(a.activity_type, "section_started");
                assert_eq!(a.activity_data.get("section_title"), Some(&json!("Goals")));
            }
            other => panic!("unexpected message {:?}", other),
        }

        assert!(matches!(
            serde_json::from_str::<ReceivedMessage>(r#"{"type":"ping"}"#).unwrap(),
            ReceivedMessage::Ping(_)
        ));
        assert!(serde_json::from_str::<ReceivedMessage>(r#"{"type":"shout"}"#).is_err());
    }

    #[test]
    fn notifications_are_tagged() {
        let msg = SendMessage::Pong(PongMessage { date: "2026-01-01T00:00:00Z".to_string() });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "pong", "date": "2026-01-01T00:00:00Z"})
        );
    }
}
