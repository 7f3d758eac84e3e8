use chrono::Utc;
use tracing::info;

use crate::models::ActivityMessage;
use crate::transport::DocumentChannel;

/// Handle ActivityMessage - the activity is attributed to the connected user
pub fn handle_activity_message(activity_msg: ActivityMessage, user_id: &str, channel: &DocumentChannel) {
    let event = channel.publish_activity(
        user_id,
        &activity_msg.activity_type,
        activity_msg.activity_data,
        Utc::now(),
    );
    info!(
        "Activity {} '{}' from {} in {}",
        event.id,
        event.activity_type,
        user_id,
        channel.document()
    );
}
