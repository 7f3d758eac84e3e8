pub mod auth;
pub mod userctx;

pub use auth::AuthUser;
pub use userctx::UserCtxCache;
