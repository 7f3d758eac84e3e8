use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::hub::{DocumentChannel, TransportHub};

/// One connection of a user to a document.
///
/// Joining counts the connection on the document channel and announces the
/// user. Dropping it, whichever way the connection ends, announces the
/// departure once the user's last connection is gone and releases the channel.
pub struct Membership {
    hub: Arc<TransportHub>,
    channel: Arc<DocumentChannel>,
    user_id: String,
    first: bool,
}

impl Membership {
    pub fn join(hub: Arc<TransportHub>, document: &str, user_id: &str) -> Self {
        let channel = hub.join(document);
        let first = channel.attach(user_id, Utc::now());
        Self {
            hub,
            channel,
            user_id: user_id.to_string(),
            first,
        }
    }

    pub fn channel(&self) -> &Arc<DocumentChannel> {
        &self.channel
    }

    pub fn is_first(&self) -> bool {
        self.first
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if self.channel.detach(&self.user_id, Utc::now()) {
            debug!("Last connection of {} to {} closed", self.user_id, self.channel.document());
        }
        self.hub.leave(self.channel.document());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colab::activity::Activity;
    use crate::colab::events::TransportMessage;
    use crate::colab::view::ViewOptions;
    use crate::colab::SessionStatus;

    fn hub() -> Arc<TransportHub> {
        Arc::new(TransportHub::new(ViewOptions::default(), 16))
    }

    #[test]
    fn dropping_the_last_membership_announces_departure_and_closes_channel() {
        let hub = hub();
        let membership = Membership::join(hub.clone(), "doc-1", "u1");
        assert!(membership.is_first());
        let channel = membership.channel().clone();
        let mut rx = channel.subscribe();

        drop(membership);

        match rx.try_recv() {
            Ok(TransportMessage::Presence(update)) => {
                assert_eq!(update.user_id, "u1");
                assert_eq!(update.status, SessionStatus::Disconnected);
            }
            other => panic!("expected disconnected presence, got {:?}", other),
        }
        match rx.try_recv() {
            Ok(TransportMessage::Activity(event)) => assert_eq!(event.activity_type, "left"),
            other => panic!("expected left activity, got {:?}", other),
        }
        assert!(hub.channel("doc-1").is_none());
        assert!(channel.snapshot().0.is_empty());
    }

    #[test]
    fn second_tab_keeps_the_user_present() {
        let hub = hub();
        let first = Membership::join(hub.clone(), "doc-1", "u1");
        let second = Membership::join(hub.clone(), "doc-1", "u1");
        assert!(!second.is_first());
        let mut rx = first.channel().subscribe();

        drop(first);
        assert!(rx.try_recv().is_err());
        assert!(hub.channel("doc-1").is_some());
        let (sessions, items) = second.channel().snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Active);
        assert!(items.iter().all(|i| i.activity != Activity::Left));
        assert_eq!(items.iter().filter(|i| i.activity == Activity::Joined).count(), 1);

        drop(second);
        assert!(hub.channel("doc-1").is_none());
    }

    #[test]
    fn teardown_runs_on_early_return() {
        let hub = hub();
        let connect = |hub: Arc<TransportHub>| -> Result<u32, String> {
            let _membership = Membership::join(hub, "doc-1", "u1");
            let limit: u32 = "not a number".parse().map_err(|_| "bad limit".to_string())?;
            Ok(limit)
        };
        assert!(connect(hub.clone()).is_err());
        assert!(hub.channel("doc-1").is_none());
        assert_eq!(hub.stats().connections, 0);
    }
}
