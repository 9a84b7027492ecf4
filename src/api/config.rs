//! Immutable startup configuration shared by every request.

use crate::store::AccountStore;
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};

pub const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    domain: Option<DomainPolicy>,
    require_json: bool,
    db_timeout: Duration,
    selftest: Option<SelfTest>,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            domain: None,
            require_json: false,
            db_timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECONDS),
            selftest: None,
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(DomainPolicy::new(domain));
        self
    }

    #[must_use]
    pub fn with_require_json(mut self, require_json: bool) -> Self {
        self.require_json = require_json;
        self
    }

    #[must_use]
    pub fn with_db_timeout(mut self, timeout: Duration) -> Self {
        self.db_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_selftest(mut self, selftest: SelfTest) -> Self {
        self.selftest = Some(selftest);
        self
    }

    #[must_use]
    pub fn domain(&self) -> Option<&DomainPolicy> {
        self.domain.as_ref()
    }

    #[must_use]
    pub fn require_json(&self) -> bool {
        self.require_json
    }

    #[must_use]
    pub fn db_timeout(&self) -> Duration {
        self.db_timeout
    }

    #[must_use]
    pub fn selftest(&self) -> Option<&SelfTest> {
        self.selftest.as_ref()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Expected domain after the last `@` of every username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainPolicy(String);

impl DomainPolicy {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self(domain.trim().trim_start_matches('@').to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local part of `username` if it is `local@<this domain>`.
    ///
    /// Domains compare ASCII case-insensitively; the local part must not be empty.
    #[must_use]
    pub fn local_part<'a>(&self, username: &'a str) -> Option<&'a str> {
        let (local, domain) = username.rsplit_once('@')?;
        if local.is_empty() || !domain.eq_ignore_ascii_case(&self.0) {
            return None;
        }
        Some(local)
    }
}

/// Credentials `/health` pushes through the full authentication path.
#[derive(Clone, Debug)]
pub struct SelfTest {
    username: String,
    password: SecretString,
}

impl SelfTest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Everything a handler needs: the account store and the startup config.
#[derive(Clone, Debug)]
pub struct AppState {
    store: Arc<dyn AccountStore>,
    config: Arc<AuthConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, config: AuthConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
