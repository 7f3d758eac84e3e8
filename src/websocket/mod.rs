pub mod handler;
pub mod msg_activity_handler;
pub mod msg_ping_handler;
pub mod msg_presence_handler;
pub mod view_task;
