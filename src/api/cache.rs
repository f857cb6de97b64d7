use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::SessionPool;

pub type SharedPool = Arc<tokio::sync::Mutex<SessionPool>>;

/// Session pools kept for the life of the process, keyed by the hash of
/// the instance configuration that created them. Entries never expire.
#[derive(Default)]
pub struct SessionCache {
    pools: Mutex<HashMap<u64, SharedPool>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool for `key`, building it with `build` on first use
    pub fn get_or_insert_with(&self, key: u64, build: impl FnOnce() -> SessionPool) -> SharedPool {
        let mut pools = self.pools.lock().unwrap_or_else(|e| e.into_inner());
        pools
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(key, "Cached new session pool");
                Arc::new(tokio::sync::Mutex::new(build()))
            })
            .clone()
    }

    pub fn get(&self, key: u64) -> Option<SharedPool> {
        self.pools.lock().unwrap_or_else(|e| e.into_inner()).get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.pools.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Credentials, ReqwestFactory};

    fn pool() -> SessionPool {
        let credentials = Credentials { username: "admin".into(), password: "secret".into() };
        SessionPool::new(Vec::new(), credentials, Arc::new(ReqwestFactory))
    }

    #[test]
    fn builds_once_per_key() {
        let cache = SessionCache::new();
        let first = cache.get_or_insert_with(7, pool);
        let again = cache.get_or_insert_with(7, || unreachable!("pool is cached"));
        cache.get_or_insert_with(8, pool);

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(9).is_none());
    }
}
