use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::activity::{Activity, ActivityFeed, ActivityFeedItem};

pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5000;

const UNTITLED_SECTION: &str = "a section";

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Default,
    Destructive,
}

/// User-facing notification derived from one feed item
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub activity_id: u64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub enum SinkError {
    Closed,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Closed => write!(f, "Notification sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Receiver of notifications, provided by whatever displays them
pub trait NotificationSink: Send {
    fn notify(&self, event: NotificationEvent) -> Result<(), SinkError>;
}

impl<F> NotificationSink for F
where
    F: Fn(NotificationEvent) -> Result<(), SinkError> + Send,
{
    fn notify(&self, event: NotificationEvent) -> Result<(), SinkError> {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Emitting,
}

/// Map a feed item to its notification, if the activity is one we announce.
pub fn notification_for(item: &ActivityFeedItem, duration_ms: u64) -> Option<NotificationEvent> {
    let user = &item.user_id;
    let (title, description) = match &item.activity {
        Activity::Joined => ("👋 New Collaborator", format!("{} joined the session", user)),
        Activity::Left => ("👋 Collaborator Left", format!("{} left the session", user)),
        Activity::EvaluationSubmitted => (
            "✅ Evaluation Submitted",
            format!("{} submitted an evaluation", user),
        ),
        Activity::CommentAdded { .. } => ("💬 New Comment", format!("{} added a comment", user)),
        Activity::SectionStarted { section_title, .. } => (
            "📝 Section Started",
            format!(
                "{} started working on {}",
                user,
                section_title.as_deref().unwrap_or(UNTITLED_SECTION)
            ),
        ),
        Activity::SectionCompleted { section_title, .. } => (
            "🎉 Section Completed",
            format!(
                "{} completed {}",
                user,
                section_title.as_deref().unwrap_or(UNTITLED_SECTION)
            ),
        ),
        Activity::Unknown(_) => return None,
    };

    let severity = match item.activity {
        Activity::Left => Severity::Destructive,
        _ => Severity::Default,
    };

    Some(NotificationEvent {
        activity_id: item.id,
        user_id: user.clone(),
        title: title.to_string(),
        description,
        severity,
        duration_ms,
    })
}

/// Turns the newest feed item into at most one notification.
///
/// Only the head of the feed is looked at; items that arrived in between two
/// observations are not replayed. Ids grow in creation order, so a head at or
/// below the last id observed is an echo and is dropped.
#[derive(Debug)]
pub struct NotificationDispatcher {
    current_user_id: String,
    duration_ms: u64,
    connected: bool,
    state: DispatchState,
    last_seen_id: Option<u64>,
}

impl NotificationDispatcher {
    pub fn new(current_user_id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            current_user_id: current_user_id.into(),
            duration_ms,
            connected: true,
            state: DispatchState::Idle,
            last_seen_id: None,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Treat the current head of the feed as already handled.
    pub fn acknowledge(&mut self, feed: &ActivityFeed) {
        if let Some(item) = feed.latest() {
            self.last_seen_id = Some(item.id);
        }
    }

    /// React to a feed update. Returns true when the sink was called.
    pub fn observe(&mut self, feed: &ActivityFeed, sink: &dyn NotificationSink) -> bool {
        let Some(item) = feed.latest() else {
            return false;
        };
        if self.last_seen_id.is_some_and(|seen| item.id <= seen) {
            return false;
        }
        self.last_seen_id = Some(item.id);

        if !self.connected {
            debug!("Transport disconnected, not notifying activity {}", item.id);
            return false;
        }
        if item.user_id == self.current_user_id {
            return false;
        }
        let Some(event) = notification_for(item, self.duration_ms) else {
            debug!("No notification for activity type '{}'", item.activity.activity_type());
            return false;
        };

        self.state = DispatchState::Emitting;
        if let Err(e) = sink.notify(event) {
            warn!("Failed to deliver notification for activity {}: {}", item.id, e);
        }
        self.state = DispatchState::Idle;
        true
    }
}
