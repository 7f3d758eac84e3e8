use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::activity::{Activity, ActivityFeed, ActivityFeedItem, DEFAULT_FEED_CAPACITY};
use super::events::{ActivityEvent, PresenceUpdate, TransportMessage};
use super::notification::{NotificationDispatcher, NotificationSink, DEFAULT_NOTIFICATION_DURATION_MS};
use super::registry::{SessionRegistry, Upsert};
use super::session::{CollaborationSession, SessionStatus};

/// Tunables of a document view
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub feed_capacity: usize,
    pub heartbeat_timeout: Duration,
    pub session_ttl: Duration,
    pub notification_duration_ms: u64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
            heartbeat_timeout: Duration::seconds(30),
            session_ttl: Duration::minutes(5),
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub demoted: usize,
    pub expired: usize,
}

/// Presence, activity feed and notifications of one user looking at one document.
///
/// A view is owned by a single task; nothing in here is shared.
pub struct DocumentView {
    document: String,
    current_user_id: String,
    options: ViewOptions,
    registry: SessionRegistry,
    feed: ActivityFeed,
    dispatcher: NotificationDispatcher,
    sink: Box<dyn NotificationSink>,
}

impl DocumentView {
    pub fn new(
        document: impl Into<String>,
        current_user_id: impl Into<String>,
        options: ViewOptions,
        sink: Box<dyn NotificationSink>,
    ) -> Self {
        let current_user_id = current_user_id.into();
        Self {
            document: document.into(),
            dispatcher: NotificationDispatcher::new(
                current_user_id.clone(),
                options.notification_duration_ms,
            ),
            current_user_id,
            registry: SessionRegistry::new(),
            feed: ActivityFeed::with_capacity(options.feed_capacity),
            options,
            sink,
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn current_user_id(&self) -> &str {
        &self.current_user_id
    }

    /// Seed the view with state re-delivered by the transport on (re)connect.
    ///
    /// The session list is replaced wholesale; feed items newer than the feed
    /// head are appended. Nothing restored here is notified.
    pub fn restore(&mut self, sessions: Vec<CollaborationSession>, items: Vec<ActivityFeedItem>) {
        self.registry = SessionRegistry::new();
        for session in sessions.into_iter().filter(|s| s.document == self.document) {
            self.registry.upsert_presence(session);
        }
        // Items arrive most-recent-first
        for item in items.into_iter().rev().filter(|i| i.document == self.document) {
            self.feed.append(item);
        }
        self.dispatcher.acknowledge(&self.feed);
        debug!(
            "Restored view of {} for {}: {} sessions, {} feed items",
            self.document,
            self.current_user_id,
            self.registry.len(),
            self.feed.len()
        );
    }

    /// Apply a transport message. Returns true when the view changed.
    pub fn handle(&mut self, message: TransportMessage) -> bool {
        if message.document() != self.document {
            debug!("Ignoring message for document {} in view of {}", message.document(), self.document);
            return false;
        }
        match message {
            TransportMessage::Presence(update) => self.handle_presence(update),
            TransportMessage::Activity(event) => self.handle_activity(event),
        }
    }

    pub fn handle_presence(&mut self, update: PresenceUpdate) -> bool {
        if update.user_id.is_empty() {
            debug!("Dropping presence update without user in {}", self.document);
            return false;
        }
        if update.status == SessionStatus::Disconnected {
            let left = self.registry.mark_left(&update.user_id, &update.document).is_some();
            if left {
                info!("{} left {}", update.user_id, update.document);
            }
            return left;
        }
        match self.registry.upsert_presence(update.to_session()) {
            Upsert::Stale => false,
            Upsert::Inserted => {
                info!("{} is now present in {}", update.user_id, update.document);
                true
            }
            Upsert::Refreshed | Upsert::Reactivated => true,
        }
    }

    /// Append the activity and notify about it. Returns false for duplicates
    /// and events without a user.
    pub fn handle_activity(&mut self, event: ActivityEvent) -> bool {
        if event.user_id.is_empty() {
            debug!("Dropping activity {} without user in {}", event.id, self.document);
            return false;
        }
        let item = event.to_feed_item();
        if item.activity == Activity::Left {
            self.registry.mark_left(&item.user_id, &item.document);
        }
        if !self.feed.append(item) {
            debug!("Activity {} already in the feed of {}", event.id, self.document);
            return false;
        }
        self.dispatcher.observe(&self.feed, self.sink.as_ref());
        true
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.dispatcher.set_connected(connected);
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher.is_connected()
    }

    /// Demote silent sessions to idle, then drop the ones past their TTL.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let demoted = self.registry.sweep_stale(now, self.options.heartbeat_timeout);
        let expired = self.registry.expire(now, self.options.session_ttl).len();
        SweepReport { demoted, expired }
    }

    pub fn list_active_in_section(&self, section_id: &str) -> Vec<CollaborationSession> {
        self.registry.list_active_in_section(&self.document, section_id)
    }

    pub fn sessions(&self) -> Vec<CollaborationSession> {
        self.registry.sessions_in(&self.document)
    }

    pub fn recent(&self, n: usize) -> Vec<ActivityFeedItem> {
        self.feed.recent(n)
    }
}
