use moka::sync::Cache;
use std::time::Duration;
use tracing::info;

use super::auth::AuthUser;

/// Identities of recently validated tokens
#[derive(Clone)]
pub struct UserCtxCache {
    cache: Cache<String, AuthUser>,
}

impl UserCtxCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(Duration::from_secs(5 * 60))
            .build();
        info!("User cache initialized");
        Self { cache }
    }

    pub fn get(&self, token: &str) -> Option<AuthUser> {
        self.cache.get(token)
    }

    pub fn insert(&self, token: &str, user: AuthUser) {
        self.cache.insert(token.to_string(), user);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for UserCtxCache {
    fn default() -> Self {
        Self::new()
    }
}
