pub mod hub;
pub mod membership;

pub use hub::{DocumentChannel, TransportHub};
pub use membership::Membership;
