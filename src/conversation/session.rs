//! Per-user wizard sessions

use super::step::{Payload, Step};
use crate::config::SESSION_MAX_CAPACITY;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Where a user is inside a wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Step waiting for input
    pub step: Step,
    /// Data collected so far
    pub payload: Payload,
}

/// Storage for wizard sessions, one per user; the last write wins
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session of `user_id`
    async fn get(&self, user_id: i64) -> Option<Session>;
    /// Replace the session of `user_id`
    async fn set(&self, user_id: i64, session: Session);
    /// Drop the session of `user_id`
    async fn clear(&self, user_id: i64);
}

/// In-process session store; sessions expire after a period of inactivity
pub struct InMemorySessionStore {
    cache: Cache<i64, Session>,
}

impl InMemorySessionStore {
    /// Create a store that forgets sessions idle for longer than `idle`
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(SESSION_MAX_CAPACITY)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: i64) -> Option<Session> {
        self.cache.get(&user_id).await
    }

    async fn set(&self, user_id: i64, session: Session) {
        self.cache.insert(user_id, session).await;
    }

    async fn clear(&self, user_id: i64) {
        self.cache.invalidate(&user_id).await;
    }
}
