use super::{fetch_hash, ping_pool, AccountStore, StoreError, Strategy, Username};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

// Remote (federated) accounts carry a domain, local ones don't.
const PASSWORD_HASH_QUERY: &str = r"
    SELECT u.encrypted_password
    FROM users u
    JOIN accounts a ON a.id = u.account_id
    WHERE a.username = lower($1)
      AND a.domain IS NULL
      AND u.approved = true
      AND u.disabled = false
";

/// Resolves local Mastodon accounts by their `@username`.
#[derive(Debug, Clone)]
pub struct LocalAccountStore {
    pool: PgPool,
}

impl LocalAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for LocalAccountStore {
    async fn ping(&self) -> Result<(), StoreError> {
        ping_pool(&self.pool).await
    }

    #[instrument(skip(self), fields(strategy = "local"))]
    async fn password_hash(&self, username: Username<'_>) -> Result<Option<String>, StoreError> {
        debug!("looking up local account {:?}", username.local);
        fetch_hash(&self.pool, PASSWORD_HASH_QUERY, username.local).await
    }

    fn strategy(&self) -> Strategy {
        Strategy::Local
    }
}
