pub mod health;
pub mod presence;
pub mod activity;
pub mod diagnostics;

pub use health::*;
pub use presence::*;
pub use activity::*;
pub use diagnostics::*;
