use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::session::{CollaborationSession, SessionKey, SessionStatus};

/// Result of an upsert, mostly useful for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Refreshed,
    Reactivated,
    /// The heartbeat was older than the one already held
    Stale,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    session: CollaborationSession,
}

/// Authoritative presence set of the documents a view knows about.
///
/// Sessions are keyed by (user, document); listing order is the order in
/// which a key was first seen and is kept when a session is overwritten.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    entries: HashMap<SessionKey, Entry>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the session for its (user, document) pair.
    pub fn upsert_presence(&mut self, session: CollaborationSession) -> Upsert {
        let key = session.key();
        match self.entries.get_mut(&key) {
            Some(entry) => {
                if session.last_heartbeat_at < entry.session.last_heartbeat_at {
                    debug!("Ignoring out-of-date heartbeat for session {}", session.id);
                    return Upsert::Stale;
                }
                let was_idle = entry.session.status == SessionStatus::Idle;
                let reactivated = was_idle && session.status == SessionStatus::Active;
                entry.session = session;
                if reactivated {
                    Upsert::Reactivated
                } else {
                    Upsert::Refreshed
                }
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.entries.insert(key, Entry { seq, session });
                Upsert::Inserted
            }
        }
    }

    /// Remove the session. Unknown sessions are ignored.
    pub fn mark_left(&mut self, user_id: &str, document: &str) -> Option<CollaborationSession> {
        self.entries
            .remove(&SessionKey::new(user_id, document))
            .map(|entry| entry.session)
    }

    pub fn get(&self, user_id: &str, document: &str) -> Option<&CollaborationSession> {
        self.entries
            .get(&SessionKey::new(user_id, document))
            .map(|entry| &entry.session)
    }

    /// Active sessions focused on `section_id`, first-seen first.
    pub fn list_active_in_section(&self, document: &str, section_id: &str) -> Vec<CollaborationSession> {
        self.ordered()
            .into_iter()
            .filter(|s| {
                s.document == document
                    && s.status == SessionStatus::Active
                    && s.current_section_id.as_deref() == Some(section_id)
            })
            .cloned()
            .collect()
    }

    /// All sessions of a document, first-seen first.
    pub fn sessions_in(&self, document: &str) -> Vec<CollaborationSession> {
        self.ordered()
            .into_iter()
            .filter(|s| s.document == document)
            .cloned()
            .collect()
    }

    /// Demote active sessions whose last heartbeat is more than `timeout` before `now`.
    /// Returns how many sessions changed.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let mut demoted = 0;
        for entry in self.entries.values_mut() {
            let session = &mut entry.session;
            if session.status == SessionStatus::Active && now - session.last_heartbeat_at > timeout {
                session.status = SessionStatus::Idle;
                demoted += 1;
            }
        }
        if demoted > 0 {
            debug!("Demoted {} stale sessions to idle", demoted);
        }
        demoted
    }

    /// Drop sessions silent for longer than `ttl`.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<CollaborationSession> {
        let expired: Vec<SessionKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| now - entry.session.last_heartbeat_at > ttl)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed: Vec<Entry> = expired
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect();
        removed.sort_by_key(|entry| entry.seq);
        removed.into_iter().map(|entry| entry.session).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ordered(&self) -> Vec<&CollaborationSession> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| &entry.session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session(user: &str, section: Option<&str>, secs: i64) -> CollaborationSession {
        CollaborationSession::active(user, "doc-1", section.map(str::to_string), at(secs))
    }

    #[test]
    fn repeated_upserts_keep_one_session_with_latest_heartbeat() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.upsert_presence(session("u1", Some("s1"), 0)), Upsert::Inserted);
        assert_eq!(registry.upsert_presence(session("u1", Some("s2"), 5)), Upsert::Refreshed);
        assert_eq!(registry.upsert_presence(session("u1", Some("s2"), 9)), Upsert::Refreshed);

        assert_eq!(registry.len(), 1);
        let held = registry.get("u1", "doc-1").unwrap();
        assert_eq!(held.last_heartbeat_at, at(9));
        assert_eq!(held.current_section_id.as_deref(), Some("s2"));
    }

    #[test]
    fn older_heartbeat_does_not_overwrite() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", Some("s1"), 10));
        assert_eq!(registry.upsert_presence(session("u1", Some("s9"), 3)), Upsert::Stale);
        assert_eq!(registry.get("u1", "doc-1").unwrap().current_section_id.as_deref(), Some("s1"));
    }

    #[test]
    fn same_user_in_two_documents_is_two_sessions() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        registry.upsert_presence(CollaborationSession::active("u1", "doc-2", None, at(0)));
        assert_eq!(registry.len(), 2);
        assert_ne!(
            registry.get("u1", "doc-1").unwrap().id,
            registry.get("u1", "doc-2").unwrap().id
        );
    }

    #[test]
    fn mark_left_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        assert!(registry.mark_left("u1", "doc-1").is_some());
        assert!(registry.mark_left("u1", "doc-1").is_none());
        assert!(registry.mark_left("nobody", "doc-1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn lists_active_sessions_in_first_seen_order() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u2", Some("s1"), 0));
        registry.upsert_presence(session("u1", Some("s1"), 1));
        registry.upsert_presence(session("u3", Some("s2"), 2));
        // Overwriting keeps u2 in first position
        registry.upsert_presence(session("u2", Some("s1"), 3));

        let users: Vec<String> = registry
            .list_active_in_section("doc-1", "s1")
            .into_iter()
            .map(|s| s.user_id)
            .collect();
        assert_eq!(users, vec!["u2", "u1"]);
        assert!(registry.list_active_in_section("doc-2", "s1").is_empty());
    }

    #[test]
    fn idle_sessions_are_not_listed() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", Some("s1"), 0));
        registry.upsert_presence(session("u2", Some("s1"), 50));
        registry.sweep_stale(at(61), Duration::seconds(30));

        let active = registry.list_active_in_section("doc-1", "s1");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, "u2");
    }

    #[test]
    fn heartbeats_within_timeout_then_sweep_goes_idle() {
        let timeout = Duration::seconds(30);
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u3", Some("s1"), 0));
        registry.upsert_presence(session("u3", Some("s1"), 20));

        let last = registry.get("u3", "doc-1").unwrap().last_heartbeat_at;
        let demoted = registry.sweep_stale(last + timeout + Duration::seconds(1), timeout);

        assert_eq!(demoted, 1);
        assert_eq!(registry.get("u3", "doc-1").unwrap().status, SessionStatus::Idle);
    }

    #[test]
    fn sweep_exactly_at_timeout_keeps_session_active() {
        let timeout = Duration::seconds(30);
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        assert_eq!(registry.sweep_stale(at(30), timeout), 0);
        assert_eq!(registry.get("u1", "doc-1").unwrap().status, SessionStatus::Active);
    }

    #[test]
    fn sweep_is_idempotent_for_same_now() {
        let timeout = Duration::seconds(30);
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        registry.upsert_presence(session("u2", None, 10));

        assert_eq!(registry.sweep_stale(at(45), timeout), 2);
        let snapshot = registry.sessions_in("doc-1");
        assert_eq!(registry.sweep_stale(at(45), timeout), 0);
        assert_eq!(registry.sessions_in("doc-1"), snapshot);
    }

    #[test]
    fn fresh_heartbeat_reactivates_idle_session() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        registry.sweep_stale(at(100), Duration::seconds(30));
        assert_eq!(registry.upsert_presence(session("u1", None, 101)), Upsert::Reactivated);
        assert_eq!(registry.get("u1", "doc-1").unwrap().status, SessionStatus::Active);
    }

    #[test]
    fn expire_removes_only_silent_sessions() {
        let mut registry = SessionRegistry::new();
        registry.upsert_presence(session("u1", None, 0));
        registry.upsert_presence(session("u2", None, 200));

        let removed = registry.expire(at(301), Duration::seconds(300));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].user_id, "u1");
        assert!(registry.get("u2", "doc-1").is_some());
    }
}
