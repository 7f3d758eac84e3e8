use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc::UnboundedSender};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::colab::{ActivityFeedItemView, DocumentView, TransportMessage};
use crate::models::{FeedItemMessage, SendMessage, SessionsMessage, SnapshotMessage};
use crate::transport::DocumentChannel;

/// Drive one document view: apply transport messages as they arrive and sweep
/// stale sessions on a fixed cadence. Runs until the transport closes.
///
/// A view that falls behind the broadcast channel goes offline, is rebuilt
/// from the channel's snapshot and comes back online; whatever it skipped is
/// listed but never notified.
pub async fn run_view(
    mut view: DocumentView,
    channel: Arc<DocumentChannel>,
    mut transport: broadcast::Receiver<TransportMessage>,
    outbound: UnboundedSender<SendMessage>,
    sweep_interval: Duration,
) {
    send_snapshot(&view, &outbound);

    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            received = transport.recv() => match received {
                Ok(message) => apply(&mut view, message, &outbound),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("View of {} for {} skipped {} messages, resyncing", view.document(), view.current_user_id(), skipped);
                    view.set_connected(false);
                    let (sessions, items) = channel.snapshot();
                    view.restore(sessions, items);
                    view.set_connected(true);
                    send_snapshot(&view, &outbound);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    view.set_connected(false);
                    info!("Transport of {} closed", view.document());
                    break;
                }
            },
            _ = ticker.tick() => {
                let report = view.sweep(Utc::now());
                if report.demoted > 0 || report.expired > 0 {
                    debug!("Sweep of {}: {:?}", view.document(), report);
                    send_sessions(&view, &outbound);
                }
            }
        }
    }
}

fn apply(view: &mut DocumentView, message: TransportMessage, outbound: &UnboundedSender<SendMessage>) {
    let is_activity = matches!(message, TransportMessage::Activity(_));
    if !view.handle(message) {
        return;
    }
    if is_activity {
        if let Some(item) = view.recent(1).first() {
            let _ = outbound.send(SendMessage::Activity(FeedItemMessage {
                item: ActivityFeedItemView::from(item),
            }));
        }
    }
    // A left activity also changes presence
    send_sessions(view, outbound);
}

fn send_snapshot(view: &DocumentView, outbound: &UnboundedSender<SendMessage>) {
    let feed = view.recent(usize::MAX);
    let _ = outbound.send(SendMessage::Snapshot(SnapshotMessage {
        document: view.document().to_string(),
        sessions: view.sessions(),
        feed: feed.iter().map(ActivityFeedItemView::from).collect(),
    }));
}

fn send_sessions(view: &DocumentView, outbound: &UnboundedSender<SendMessage>) {
    let _ = outbound.send(SendMessage::Sessions(SessionsMessage {
        sessions: view.sessions(),
    }));
}
