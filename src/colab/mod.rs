//! Presence, activity feed and notification engine of a collaborative document.

pub mod activity;
pub mod events;
pub mod notification;
pub mod registry;
pub mod session;
pub mod view;

pub use activity::ActivityFeedItemView;
pub use events::TransportMessage;
pub use notification::{NotificationEvent, Severity, SinkError};
pub use session::{CollaborationSession, SessionStatus};
pub use view::{DocumentView, ViewOptions};
