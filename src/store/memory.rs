//! In-memory store for handler tests.

use super::{AccountStore, StoreError, Strategy, Username};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    strategy: Strategy,
    // local: lowercased bare username, email: the address as given
    accounts: HashMap<String, String>,
    unreachable: bool,
    broken_query: bool,
    stall: Option<Duration>,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Keys accounts by exact e-mail address, like [`super::EmailStore`].
    pub(crate) fn email() -> Self {
        Self {
            strategy: Strategy::Email,
            ..Self::default()
        }
    }

    pub(crate) fn with_account(mut self, username: &str, hash: &str) -> Self {
        let key = match self.strategy {
            Strategy::Local => username.to_lowercase(),
            Strategy::Email => username.to_string(),
        };
        self.accounts.insert(key, hash.to_string());
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub(crate) fn broken_query(mut self) -> Self {
        self.broken_query = true;
        self
    }

    pub(crate) fn stalled(mut self, delay: Duration) -> Self {
        self.stall = Some(delay);
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.unreachable {
            return Err(StoreError::Unreachable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn password_hash(&self, username: Username<'_>) -> Result<Option<String>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        if self.broken_query {
            return Err(StoreError::Query(sqlx::Error::RowNotFound));
        }
        let key = match self.strategy {
            Strategy::Local => username.local.to_lowercase(),
            Strategy::Email => username.full.to_string(),
        };
        Ok(self.accounts.get(&key).cloned())
    }

    fn strategy(&self) -> Strategy {
        self.strategy
    }
}
