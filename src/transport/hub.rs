use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::colab::activity::{Activity, ActivityFeed, ActivityFeedItem};
use crate::colab::events::{ActivityEvent, PresenceUpdate, TransportMessage};
use crate::colab::registry::SessionRegistry;
use crate::colab::session::{CollaborationSession, SessionStatus};
use crate::colab::view::ViewOptions;

/// State re-delivered to views that (re)connect to a document
struct ReplayState {
    registry: SessionRegistry,
    feed: ActivityFeed,
    next_activity_id: u64,
    // Open connections per user
    users: HashMap<String, usize>,
}

/// Broadcast channel and replay state of one document
pub struct DocumentChannel {
    document: String,
    sender: broadcast::Sender<TransportMessage>,
    connections: AtomicUsize,
    state: Mutex<ReplayState>,
}

impl DocumentChannel {
    fn new(document: &str, capacity: usize, feed_capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self {
            document: document.to_string(),
            sender,
            connections: AtomicUsize::new(0),
            state: Mutex::new(ReplayState {
                registry: SessionRegistry::new(),
                feed: ActivityFeed::with_capacity(feed_capacity),
                next_activity_id: 1,
                users: HashMap::new(),
            }),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportMessage> {
        self.sender.subscribe()
    }

    /// Current sessions and feed (most-recent-first).
    ///
    /// Subscribe before taking the snapshot: whatever is published in between
    /// shows up twice, and views absorb duplicates.
    pub fn snapshot(&self) -> (Vec<CollaborationSession>, Vec<ActivityFeedItem>) {
        let state = self.lock_state();
        (
            state.registry.sessions_in(&self.document),
            state.feed.recent(state.feed.len()),
        )
    }

    pub fn publish_presence(
        &self,
        user_id: &str,
        status: SessionStatus,
        current_section_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> PresenceUpdate {
        let mut state = self.lock_state();
        self.presence_locked(&mut state, user_id, status, current_section_id, timestamp)
    }

    /// Assign the next activity id of the document and broadcast the event.
    pub fn publish_activity(
        &self,
        user_id: &str,
        activity_type: &str,
        activity_data: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> ActivityEvent {
        let mut state = self.lock_state();
        self.activity_locked(&mut state, user_id, activity_type, activity_data, timestamp)
    }

    /// Count a connection of `user_id` and announce it: an active presence on
    /// every connection, a `joined` activity on the user's first one.
    /// Returns true for the first connection.
    pub fn attach(&self, user_id: &str, timestamp: DateTime<Utc>) -> bool {
        let mut state = self.lock_state();
        let connections = state.users.entry(user_id.to_string()).or_insert(0);
        *connections += 1;
        let first = *connections == 1;

        self.presence_locked(&mut state, user_id, SessionStatus::Active, None, timestamp);
        if first {
            self.activity_locked(&mut state, user_id, "joined", Map::new(), timestamp);
        }
        first
    }

    /// Release a connection of `user_id`. The user's last connection publishes
    /// a disconnected presence and a `left` activity. Returns true for the last.
    pub fn detach(&self, user_id: &str, timestamp: DateTime<Utc>) -> bool {
        let mut state = self.lock_state();
        let remaining = match state.users.get_mut(user_id) {
            Some(connections) => {
                *connections = connections.saturating_sub(1);
                *connections
            }
            None => return false,
        };
        if remaining > 0 {
            debug!("{} still has {} connection(s) on {}", user_id, remaining, self.document);
            return false;
        }
        state.users.remove(user_id);

        self.presence_locked(&mut state, user_id, SessionStatus::Disconnected, None, timestamp);
        self.activity_locked(&mut state, user_id, "left", Map::new(), timestamp);
        true
    }

    fn presence_locked(
        &self,
        state: &mut ReplayState,
        user_id: &str,
        status: SessionStatus,
        current_section_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> PresenceUpdate {
        let update = PresenceUpdate {
            user_id: user_id.to_string(),
            document: self.document.clone(),
            status,
            current_section_id,
            timestamp,
        };
        if status == SessionStatus::Disconnected {
            state.registry.mark_left(user_id, &self.document);
        } else {
            state.registry.upsert_presence(update.to_session());
        }
        self.broadcast(TransportMessage::Presence(update.clone()));
        update
    }

    fn activity_locked(
        &self,
        state: &mut ReplayState,
        user_id: &str,
        activity_type: &str,
        activity_data: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> ActivityEvent {
        let event = ActivityEvent {
            id: state.next_activity_id,
            user_id: user_id.to_string(),
            document: self.document.clone(),
            activity_type: activity_type.to_string(),
            activity_data,
            timestamp,
        };
        state.next_activity_id += 1;

        let item = event.to_feed_item();
        if item.activity == Activity::Left {
            state.registry.mark_left(user_id, &self.document);
        }
        state.feed.append(item);
        self.broadcast(TransportMessage::Activity(event.clone()));
        event
    }

    // Callers hold the state lock so broadcast order matches id order
    fn broadcast(&self, message: TransportMessage) {
        if self.sender.send(message).is_err() {
            debug!("No subscribers on {}", self.document);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HubStats {
    pub documents: usize,
    pub connections: usize,
    pub sessions: usize,
    pub feed_items: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HubSweep {
    pub demoted: usize,
    pub expired: usize,
}

/// Per-document realtime channels of this process
pub struct TransportHub {
    documents: RwLock<HashMap<String, Arc<DocumentChannel>>>,
    options: ViewOptions,
    channel_capacity: usize,
}

impl TransportHub {
    pub fn new(options: ViewOptions, channel_capacity: usize) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            options,
            channel_capacity,
        }
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Get or create the channel of a document and count a connection on it.
    /// Every `join` must be paired with a `leave`.
    pub fn join(&self, document: &str) -> Arc<DocumentChannel> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let channel = documents
            .entry(document.to_string())
            .or_insert_with(|| {
                info!("Opening channel for document {}", document);
                Arc::new(DocumentChannel::new(
                    document,
                    self.channel_capacity,
                    self.options.feed_capacity,
                ))
            })
            .clone();
        channel.connections.fetch_add(1, Ordering::SeqCst);
        channel
    }

    /// Release a connection; the channel is dropped with its last connection.
    pub fn leave(&self, document: &str) {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let Some(channel) = documents.get(document) else {
            return;
        };
        let remaining = channel
            .connections
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        if remaining == 0 {
            documents.remove(document);
            info!("Closed channel for document {}", document);
        }
    }

    pub fn channel(&self, document: &str) -> Option<Arc<DocumentChannel>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document)
            .cloned()
    }

    pub fn list_active_in_section(&self, document: &str, section_id: &str) -> Option<Vec<CollaborationSession>> {
        let channel = self.channel(document)?;
        let state = channel.lock_state();
        Some(state.registry.list_active_in_section(document, section_id))
    }

    pub fn recent(&self, document: &str, n: usize) -> Option<Vec<ActivityFeedItem>> {
        let channel = self.channel(document)?;
        let state = channel.lock_state();
        Some(state.feed.recent(n))
    }

    /// Demote and expire silent sessions of every open document.
    pub fn sweep(&self, now: DateTime<Utc>) -> HubSweep {
        let channels: Vec<Arc<DocumentChannel>> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut report = HubSweep::default();
        for channel in channels {
            let mut state = channel.lock_state();
            report.demoted += state.registry.sweep_stale(now, self.options.heartbeat_timeout);
            report.expired += state.registry.expire(now, self.options.session_ttl).len();
        }
        report
    }

    pub fn stats(&self) -> HubStats {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats = HubStats {
            documents: documents.len(),
            ..HubStats::default()
        };
        for channel in documents.values() {
            stats.connections += channel.connection_count();
            let state = channel.lock_state();
            stats.sessions += state.registry.len();
            stats.feed_items += state.feed.len();
        }
        stats
    }
}
