use super::{fetch_hash, ping_pool, AccountStore, StoreError, Strategy, Username};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

// No approved/disabled gate here: deployments using e-mail logins keep a flat users table.
const PASSWORD_HASH_QUERY: &str = "SELECT encrypted_password FROM users WHERE email = $1";

/// Resolves users by their exact (case-sensitive) e-mail address.
#[derive(Debug, Clone)]
pub struct EmailStore {
    pool: PgPool,
}

impl EmailStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for EmailStore {
    async fn ping(&self) -> Result<(), StoreError> {
        ping_pool(&self.pool).await
    }

    #[instrument(skip(self), fields(strategy = "email"))]
    async fn password_hash(&self, username: Username<'_>) -> Result<Option<String>, StoreError> {
        debug!("looking up user by email {:?}", username.full);
        fetch_hash(&self.pool, PASSWORD_HASH_QUERY, username.full).await
    }

    fn strategy(&self) -> Strategy {
        Strategy::Email
    }
}
