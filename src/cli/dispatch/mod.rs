use crate::{
    cli::actions::{server::Args, Action},
    store::Strategy,
};
use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use secrecy::SecretString;
use std::env;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let dsn = matches
        .get_one::<String>("dsn")
        .context("missing required argument: --dsn")?;
    let dsn = expand_env(dsn)?;
    if dsn.trim().is_empty() {
        return Err(anyhow!("empty --dsn after environment expansion"));
    }

    let strategy = matches
        .get_one::<String>("strategy")
        .map_or(Ok(Strategy::default()), |s| s.parse::<Strategy>())
        .map_err(|e| anyhow!(e))?;

    Ok(Action::Server(Args {
        port,
        dsn: SecretString::from(dsn),
        strategy,
        domain: matches.get_one::<String>("domain").cloned(),
        require_json: matches.get_flag("require-json"),
        db_timeout: matches
            .get_one::<u64>("db-timeout")
            .copied()
            .unwrap_or(crate::api::DEFAULT_DB_TIMEOUT_SECONDS),
        selftest_username: matches.get_one::<String>("selftest-username").cloned(),
        selftest_password: matches
            .get_one::<String>("selftest-password")
            .cloned()
            .map(SecretString::from),
    }))
}

/// Replace `$VAR` and `${VAR}` with values from the environment, unset variables become empty.
///
/// Lets the database password live in its own variable, e.g.
/// `postgres://mastodon:${DB_PASS}@db/mastodon_production`.
///
/// # Errors
/// Returns an error if the expansion pattern fails to compile.
pub fn expand_env(value: &str) -> Result<String> {
    let re = Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")?;

    Ok(re
        .replace_all(value, |caps: &Captures| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|name| env::var(name.as_str()).ok())
                .unwrap_or_default()
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn expand_env_replaces_both_forms() -> Result<()> {
        temp_env::with_vars(
            [
                ("AUTHBRIDGE_TEST_USER", Some("mastodon")),
                ("AUTHBRIDGE_TEST_PASS", Some("s3cr3t")),
            ],
            || -> Result<()> {
                let expanded =
                    expand_env("postgres://$AUTHBRIDGE_TEST_USER:${AUTHBRIDGE_TEST_PASS}@db/m")?;
                assert_eq!(expanded, "postgres://mastodon:s3cr3t@db/m");
                Ok(())
            },
        )
    }

    #[test]
    fn expand_env_unset_becomes_empty() -> Result<()> {
        temp_env::with_vars_unset(["AUTHBRIDGE_TEST_MISSING"], || -> Result<()> {
            assert_eq!(expand_env("a${AUTHBRIDGE_TEST_MISSING}b")?, "ab");
            assert_eq!(expand_env("a$AUTHBRIDGE_TEST_MISSING")?, "a");
            Ok(())
        })
    }

    #[test]
    fn expand_env_keeps_plain_dollars() -> Result<()> {
        assert_eq!(expand_env("pa$$word$")?, "pa$$word$");
        assert_eq!(expand_env("cost $5")?, "cost $5");
        Ok(())
    }

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        temp_env::with_vars(
            [
                ("AUTHBRIDGE_TEST_PASS", Some("s3cr3t")),
                ("AUTHBRIDGE_SELFTEST_USERNAME", None),
                ("AUTHBRIDGE_SELFTEST_PASSWORD", None),
                ("AUTHBRIDGE_DOMAIN", None),
                ("AUTHBRIDGE_STRATEGY", None),
                ("AUTHBRIDGE_REQUIRE_JSON", None),
                ("AUTHBRIDGE_DB_TIMEOUT", None),
            ],
            || -> Result<()> {
                let matches = commands::new().get_matches_from(vec![
                    "authbridge",
                    "--port",
                    "9000",
                    "--dsn",
                    "postgres://mastodon:${AUTHBRIDGE_TEST_PASS}@db/mastodon",
                    "--strategy",
                    "email",
                    "--domain",
                    "owo.cafe",
                    "--require-json",
                ]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 9000);
                assert_eq!(
                    args.dsn.expose_secret(),
                    "postgres://mastodon:s3cr3t@db/mastodon"
                );
                assert_eq!(args.strategy, Strategy::Email);
                assert_eq!(args.domain.as_deref(), Some("owo.cafe"));
                assert!(args.require_json);
                assert_eq!(args.db_timeout, 5);
                assert!(args.selftest_username.is_none());
                assert!(args.selftest_password.is_none());
                Ok(())
            },
        )
    }

    #[test]
    fn handler_rejects_dsn_that_expands_to_nothing() {
        temp_env::with_vars_unset(["AUTHBRIDGE_TEST_DSN"], || {
            let matches =
                commands::new().get_matches_from(vec!["authbridge", "--dsn", "${AUTHBRIDGE_TEST_DSN}"]);
            assert!(handler(&matches).is_err());
        });
    }
}
