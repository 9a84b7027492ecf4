use crate::store::Strategy;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser, ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use regex::Regex;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_domain() -> ValueParser {
    ValueParser::from(move |domain: &str| -> std::result::Result<String, String> {
        let domain = domain.trim().trim_start_matches('@');
        let valid = Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$")
            .is_ok_and(|re| re.is_match(domain));
        if valid {
            Ok(domain.to_string())
        } else {
            Err(format!("invalid domain: {domain:?}"))
        }
    })
}

pub fn validator_db_timeout() -> ValueParser {
    ValueParser::from(move |seconds: &str| -> std::result::Result<u64, String> {
        match seconds.parse::<u64>() {
            Ok(parsed) if (1..=60).contains(&parsed) => Ok(parsed),
            _ => Err("timeout must be between 1 and 60 seconds".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("authbridge")
        .about("HTTP credential verification for Prosody against a Mastodon database")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("AUTHBRIDGE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string, $VAR and ${VAR} are expanded from the environment")
                .env("AUTHBRIDGE_DSN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .help("How usernames are resolved: local accounts or user e-mail")
                .default_value(Strategy::default().as_str())
                .env("AUTHBRIDGE_STRATEGY")
                .value_parser(PossibleValuesParser::new(Strategy::VARIANTS)),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .help("Only accept usernames of the form user@<domain>")
                .env("AUTHBRIDGE_DOMAIN")
                .value_parser(validator_domain()),
        )
        .arg(
            Arg::new("require-json")
                .long("require-json")
                .help("Reject /auth requests without a JSON content type")
                .env("AUTHBRIDGE_REQUIRE_JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("db-timeout")
                .long("db-timeout")
                .help("Per-request database timeout in seconds")
                .default_value("5")
                .env("AUTHBRIDGE_DB_TIMEOUT")
                .value_parser(validator_db_timeout()),
        )
        .arg(
            Arg::new("selftest-username")
                .long("selftest-username")
                .help("Username /health authenticates with as an end-to-end check")
                .env("AUTHBRIDGE_SELFTEST_USERNAME"),
        )
        .arg(
            Arg::new("selftest-password")
                .long("selftest-password")
                .help("Password for the /health self-test")
                .env("AUTHBRIDGE_SELFTEST_PASSWORD")
                .hide_env_values(true)
                .requires("selftest-username"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("AUTHBRIDGE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
