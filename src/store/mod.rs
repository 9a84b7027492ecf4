//! Account lookup gateway.
//!
//! Resolves a username to the bcrypt hash stored by Mastodon. Every query is
//! read-only and parameterized; the username never becomes part of the SQL text.

use async_trait::async_trait;
use sqlx::{Connection, PgPool};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;
use tracing::{info_span, Instrument};

mod email;
mod local;
#[cfg(test)]
pub(crate) mod memory;

pub use email::EmailStore;
pub use local::LocalAccountStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("error connecting to database: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("querying db: {0}")]
    Query(#[source] sqlx::Error),
}

/// A username that already passed request validation.
///
/// `local` is the part before `@domain` when a domain policy matched,
/// otherwise it equals `full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Username<'a> {
    pub full: &'a str,
    pub local: &'a str,
}

impl<'a> Username<'a> {
    #[must_use]
    pub fn new(full: &'a str) -> Self {
        Self { full, local: full }
    }

    #[must_use]
    pub fn with_local(full: &'a str, local: &'a str) -> Self {
        Self { full, local }
    }
}

impl fmt::Display for Username<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full)
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync + fmt::Debug {
    /// Check that the database answers at all.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Look up the stored password hash, `Ok(None)` when no eligible account matches.
    async fn password_hash(&self, username: Username<'_>) -> Result<Option<String>, StoreError>;

    fn strategy(&self) -> Strategy;
}

/// How usernames map to rows in the account store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// `accounts` joined to `users`, local (`domain IS NULL`), approved and enabled.
    #[default]
    Local,
    /// Flat `users.email` match.
    Email,
}

impl Strategy {
    pub const VARIANTS: [&'static str; 2] = ["local", "email"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Email => "email",
        }
    }

    /// Build the store for this strategy on top of `pool`.
    #[must_use]
    pub fn store(self, pool: PgPool) -> Arc<dyn AccountStore> {
        match self {
            Self::Local => Arc::new(LocalAccountStore::new(pool)),
            Self::Email => Arc::new(EmailStore::new(pool)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "email" => Ok(Self::Email),
            other => Err(format!("unknown lookup strategy: {other}")),
        }
    }
}

/// Acquire a pooled connection and ping it.
pub(crate) async fn ping_pool(pool: &PgPool) -> Result<(), StoreError> {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let mut conn = pool
        .acquire()
        .instrument(acquire_span)
        .await
        .map_err(StoreError::Unreachable)?;

    let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
    conn.ping()
        .instrument(ping_span)
        .await
        .map_err(StoreError::Unreachable)
}

/// Run a single-column hash query with `value` bound as `$1`.
pub(crate) async fn fetch_hash(
    pool: &PgPool,
    query: &'static str,
    value: &str,
) -> Result<Option<String>, StoreError> {
    let query_span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    sqlx::query_scalar::<_, String>(query)
        .bind(value)
        .fetch_optional(pool)
        .instrument(query_span)
        .await
        .map_err(StoreError::Query)
}
