use chrono::Utc;
use tracing::debug;

use crate::models::PresenceMessage;
use crate::transport::DocumentChannel;

/// Handle PresenceMessage - publish the heartbeat of the connected user
pub fn handle_presence_message(presence_msg: PresenceMessage, user_id: &str, channel: &DocumentChannel) {
    debug!(
        "Presence from {} in {}: {:?} at {:?}",
        user_id,
        channel.document(),
        presence_msg.status,
        presence_msg.current_section_id
    );
    channel.publish_presence(
        user_id,
        presence_msg.status,
        presence_msg.current_section_id,
        Utc::now(),
    );
}
