use crate::{
    api::{self, AuthConfig, SelfTest},
    short_commit,
    store::Strategy,
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub strategy: Strategy,
    pub domain: Option<String>,
    pub require_json: bool,
    pub db_timeout: u64,
    pub selftest_username: Option<String>,
    pub selftest_password: Option<SecretString>,
}

impl Args {
    /// Immutable per-request configuration derived from the command line.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig::new()
            .with_require_json(self.require_json)
            .with_db_timeout(Duration::from_secs(self.db_timeout));

        if let Some(domain) = &self.domain {
            config = config.with_domain(domain.clone());
        }

        // An empty self-test username means the self-test is off.
        if let Some(username) = self.selftest_username.as_deref().filter(|u| !u.is_empty()) {
            let password = self
                .selftest_password
                .clone()
                .unwrap_or_else(|| SecretString::from(String::new()));
            config = config.with_selftest(SelfTest::new(username, password));
        }

        config
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable at startup or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = args.auth_config();

    api::new(args.port, &args.dsn, args.strategy, config).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("strategy", args.strategy.to_string()),
        (
            "domain",
            args.domain.clone().unwrap_or_else(|| "any".to_string()),
        ),
        ("require_json", args.require_json.to_string()),
        ("db_timeout", format!("{}s", args.db_timeout)),
        (
            "selftest_username",
            args.selftest_username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "n/a".to_string()),
        ),
        (
            "selftest_password_set",
            args.selftest_password.is_some().to_string(),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "authbridge {} ({})\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}
