//! # Authbridge (Prosody ⇄ Mastodon credential bridge)
//!
//! `authbridge` answers a single question over HTTP: is this username/password pair a
//! valid login for an account in the Mastodon database? Prosody asks it through
//! `mod_auth_custom_http`, so the chat server never needs database access of its own.
//!
//! ## Endpoints
//!
//! - `POST /auth` takes `{"username": "...", "password": "..."}` and answers `200` with
//!   the literal body `true` when the password matches the stored bcrypt hash. Failures
//!   map to `400` (bad input), `403` (domain mismatch or wrong password), `404` (no
//!   eligible account) and `500` (database trouble).
//! - `GET /health` pings the database. When self-test credentials are configured it then
//!   runs them through the same decision path as `/auth` and reports that status, which
//!   catches schema or hash-format drift and not only connectivity.
//!
//! ## Account lookup strategies
//!
//! The lookup strategy is fixed at startup:
//!
//! - **local**: `accounts.username` (case-insensitive, `domain IS NULL`) joined to an
//!   approved, enabled row in `users`.
//! - **email**: exact match on `users.email`, without eligibility filters.
//!
//! The service is read-only and stateless: no writes, no sessions, no caching.

pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// First seven characters of the commit hash, empty when unknown.
#[must_use]
pub fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    if trimmed.len() > 7 && trimmed.is_char_boundary(7) {
        &trimmed[..7]
    } else if trimmed == "unknown" {
        ""
    } else {
        trimmed
    }
}
