use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// A collaboration event, typed by its `activity_type`.
///
/// Unrecognised types are kept as `Unknown` so newer clients can talk to
/// older views; they are stored but never notified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Joined,
    Left,
    EvaluationSubmitted,
    CommentAdded {
        section_id: Option<String>,
    },
    SectionStarted {
        section_id: Option<String>,
        section_title: Option<String>,
    },
    SectionCompleted {
        section_id: Option<String>,
        section_title: Option<String>,
    },
    Unknown(String),
}

impl Activity {
    /// Build from the loosely typed wire pair
    pub fn from_wire(activity_type: &str, data: &Map<String, Value>) -> Self {
        let field = |name: &str| data.get(name).and_then(Value::as_str).map(str::to_string);
        match activity_type {
            "joined" => Activity::Joined,
            "left" => Activity::Left,
            "evaluation_submitted" => Activity::EvaluationSubmitted,
            "comment_added" => Activity::CommentAdded {
                section_id: field("section_id"),
            },
            "section_started" => Activity::SectionStarted {
                section_id: field("section_id"),
                section_title: field("section_title"),
            },
            "section_completed" => Activity::SectionCompleted {
                section_id: field("section_id"),
                section_title: field("section_title"),
            },
            other => Activity::Unknown(other.to_string()),
        }
    }

    pub fn activity_type(&self) -> &str {
        match self {
            Activity::Joined => "joined",
            Activity::Left => "left",
            Activity::EvaluationSubmitted => "evaluation_submitted",
            Activity::CommentAdded { .. } => "comment_added",
            Activity::SectionStarted { .. } => "section_started",
            Activity::SectionCompleted { .. } => "section_completed",
            Activity::Unknown(other) => other,
        }
    }

    /// Wire payload for this activity
    pub fn to_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        let mut put = |name: &str, value: &Option<String>| {
            if let Some(v) = value {
                data.insert(name.to_string(), Value::String(v.clone()));
            }
        };
        match self {
            Activity::CommentAdded { section_id } => put("section_id", section_id),
            Activity::SectionStarted { section_id, section_title }
            | Activity::SectionCompleted { section_id, section_title } => {
                put("section_id", section_id);
                put("section_title", section_title);
            }
            _ => {}
        }
        data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFeedItem {
    pub id: u64,
    pub user_id: String,
    pub document: String,
    pub activity: Activity,
    pub created_at: DateTime<Utc>,
}

/// Feed item as exposed to clients and the REST API
#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeedItemView {
    pub id: u64,
    pub user_id: String,
    pub document: String,
    pub activity_type: String,
    #[schema(value_type = Object)]
    pub activity_data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl From<&ActivityFeedItem> for ActivityFeedItemView {
    fn from(item: &ActivityFeedItem) -> Self {
        Self {
            id: item.id,
            user_id: item.user_id.clone(),
            document: item.document.clone(),
            activity_type: item.activity.activity_type().to_string(),
            activity_data: item.activity.to_data(),
            created_at: item.created_at,
        }
    }
}

/// Bounded, most-recent-first log of collaboration events
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    items: VecDeque<ActivityFeedItem>,
    capacity: usize,
    // Highest id ever appended, evicted or not
    newest_id: Option<u64>,
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl ActivityFeed {
    /// A zero capacity is raised to one so the newest item is always visible.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            newest_id: None,
        }
    }

    /// Push at the head and evict from the tail beyond capacity.
    ///
    /// Ids are assigned in creation order, so an id at or below the newest one
    /// seen is a repeat (possibly of an item already evicted) and is rejected.
    pub fn append(&mut self, item: ActivityFeedItem) -> bool {
        if self.newest_id.is_some_and(|newest| item.id <= newest) {
            return false;
        }
        self.newest_id = Some(item.id);
        self.items.push_front(item);
        self.items.truncate(self.capacity);
        true
    }

    pub fn recent(&self, n: usize) -> Vec<ActivityFeedItem> {
        self.items.iter().take(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<&ActivityFeedItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: u64, user: &str, activity: Activity) -> ActivityFeedItem {
        ActivityFeedItem {
            id,
            user_id: user.to_string(),
            document: "doc-1".to_string(),
            activity,
            created_at: Utc::now(),
        }
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn parses_known_activity_types() {
        let started = Activity::from_wire(
            "section_started",
            &data(json!({"section_id": "s1", "section_title": "Leadership"})),
        );
        assert_eq!(
            started,
            Activity::SectionStarted {
                section_id: Some("s1".to_string()),
                section_title: Some("Leadership".to_string()),
            }
        );
        assert_eq!(Activity::from_wire("joined", &Map::new()), Activity::Joined);
        assert_eq!(
            Activity::from_wire("comment_added", &data(json!({"section_id": 7}))),
            Activity::CommentAdded { section_id: None }
        );
    }

    #[test]
    fn unknown_types_are_preserved() {
        let activity = Activity::from_wire("reaction_added", &data(json!({"emoji": "+1"})));
        assert_eq!(activity, Activity::Unknown("reaction_added".to_string()));
        assert_eq!(activity.activity_type(), "reaction_added");
    }

    #[test]
    fn wire_payload_carries_section_fields() {
        let activity = Activity::SectionCompleted {
            section_id: Some("s2".to_string()),
            section_title: None,
        };
        assert_eq!(Value::Object(activity.to_data()), json!({"section_id": "s2"}));
    }

    #[test]
    fn recent_is_most_recent_first() {
        let mut feed = ActivityFeed::with_capacity(10);
        feed.append(item(1, "u1", Activity::Joined));
        feed.append(item(2, "u2", Activity::Joined));
        feed.append(item(3, "u1", Activity::EvaluationSubmitted));

        let ids: Vec<u64> = feed.recent(2).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(feed.latest().map(|i| i.id), Some(3));
    }

    #[test]
    fn recent_clamps_out_of_range() {
        let mut feed = ActivityFeed::default();
        assert!(feed.recent(5).is_empty());
        feed.append(item(1, "u1", Activity::Joined));
        assert_eq!(feed.recent(usize::MAX).len(), 1);
        assert!(feed.recent(0).is_empty());
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut feed = ActivityFeed::with_capacity(50);
        for id in 1..=51 {
            feed.append(item(id, "u2", Activity::Joined));
        }
        let recent = feed.recent(50);
        assert_eq!(recent.len(), 50);
        assert!(recent.iter().all(|i| i.id != 1));
        let ids: Vec<u64> = recent.iter().map(|i| i.id).collect();
        let expected: Vec<u64> = (2..=51).rev().collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut feed = ActivityFeed::with_capacity(5);
        assert!(feed.append(item(1, "u1", Activity::Joined)));
        assert!(!feed.append(item(1, "u1", Activity::Joined)));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let at = Utc::now();
        let mut feed = ActivityFeed::with_capacity(5);
        for id in [4, 7, 10] {
            let mut it = item(id, "u1", Activity::Joined);
            it.created_at = at;
            feed.append(it);
        }
        let ids: Vec<u64> = feed.recent(3).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![10, 7, 4]);
    }

    #[test]
    fn repeat_of_an_evicted_item_is_rejected() {
        let mut feed = ActivityFeed::with_capacity(2);
        for id in 1..=3 {
            assert!(feed.append(item(id, "u2", Activity::Joined)));
        }
        assert!(!feed.append(item(1, "u2", Activity::Joined)));
        assert!(!feed.append(item(2, "u2", Activity::Joined)));

        let ids: Vec<u64> = feed.recent(5).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
