//! `POST /auth`, the endpoint `mod_auth_custom_http` talks to.
//!
//! A request walks through content-type and body validation, the optional
//! domain policy, a database reachability probe, the hash lookup and finally
//! bcrypt verification. The first failing step decides the status code.
//!
//! Prosody only accepts the literal body `true` as a successful login
//! (<https://modules.prosody.im/mod_auth_custom_http.html>).

use crate::{
    api::config::AppState,
    store::{StoreError, Username},
};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// Largest `/auth` body accepted; Prosody sends a few hundred bytes at most.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Body Prosody sends; anything beyond these two fields is rejected.
#[derive(ToSchema, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

impl AuthRequest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Every way an authentication attempt can fail.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("{0}")]
    ClientInput(String),

    #[error("username {username:?} does not belong to domain {domain:?}")]
    PolicyViolation { username: String, domain: String },

    #[error("No record found for user {0:?}")]
    UnknownAccount(String),

    #[error("authentication failed for {username:?}: {reason}")]
    WrongPassword { username: String, reason: String },

    #[error("{0}")]
    BackendUnavailable(String),
}

impl Rejection {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ClientInput(_) => StatusCode::BAD_REQUEST,
            Self::PolicyViolation { .. } | Self::WrongPassword { .. } => StatusCode::FORBIDDEN,
            Self::UnknownAccount(_) => StatusCode::NOT_FOUND,
            Self::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for Rejection {
    fn from(err: StoreError) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("{message}");
        } else {
            warn!("{message}");
        }

        (status, message).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/auth",
    request_body(content = AuthRequest, content_type = "application/json"),
    responses (
        (status = 200, description = "Credentials are valid, body is exactly `true`", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed or oversized body, unknown fields, wrong content type or empty username/password", body = String),
        (status = 403, description = "Domain mismatch or wrong password", body = String),
        (status = 404, description = "No eligible account for this username", body = String),
        (status = 500, description = "Database unreachable or query failed", body = String),
    ),
    tag = "auth"
)]
// axum handler for auth
pub async fn auth(
    headers: HeaderMap,
    state: Extension<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // oversized or unreadable bodies are bad input like any other
    let body = match body {
        Ok(body) => body,
        Err(err) => {
            return Rejection::ClientInput(format!(
                "could not read request body: {}",
                err.body_text()
            ))
            .into_response();
        }
    };

    let request = match parse_request(&headers, &body, state.config().require_json()) {
        Ok(request) => request,
        Err(rejection) => return rejection.into_response(),
    };

    match authenticate(&state, &request).await {
        Ok(()) => {
            info!("authentication succeeded for {:?}", request.username);
            (StatusCode::OK, "true").into_response()
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Decode the wire payload, enforcing the JSON content type when configured.
pub(crate) fn parse_request(
    headers: &HeaderMap,
    body: &[u8],
    require_json: bool,
) -> Result<AuthRequest, Rejection> {
    if require_json && !is_json(headers) {
        return Err(Rejection::ClientInput(
            "content-type must be application/json".to_string(),
        ));
    }

    let parse_error =
        |err: serde_json::Error| Rejection::ClientInput(format!("could not parse request body: {err}"));

    // Structs also deserialize from JSON arrays; only objects are valid here.
    let value: serde_json::Value = serde_json::from_slice(body).map_err(parse_error)?;
    if !value.is_object() {
        return Err(Rejection::ClientInput(
            "could not parse request body: expected a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(parse_error)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// The authentication decision itself, shared by `/auth` and the `/health` self-test.
///
/// # Errors
/// Returns the [`Rejection`] of the first step that fails.
pub(crate) async fn authenticate(state: &AppState, request: &AuthRequest) -> Result<(), Rejection> {
    if request.is_empty() {
        return Err(Rejection::ClientInput(
            "empty username or password".to_string(),
        ));
    }

    let username = match state.config().domain() {
        Some(policy) => {
            let local = policy.local_part(&request.username).ok_or_else(|| {
                Rejection::PolicyViolation {
                    username: request.username.clone(),
                    domain: policy.as_str().to_string(),
                }
            })?;
            Username::with_local(&request.username, local)
        }
        None => Username::new(&request.username),
    };

    // One deadline for the probe and the lookup.
    let deadline = state.config().db_timeout();
    let hash = timeout(deadline, resolve_hash(state, username))
        .await
        .map_err(|_| {
            Rejection::BackendUnavailable(format!(
                "database did not answer within {}s",
                deadline.as_secs_f32()
            ))
        })??
        .ok_or_else(|| Rejection::UnknownAccount(request.username.clone()))?;

    verify_password(&request.username, request.password.clone(), hash).await
}

async fn resolve_hash(
    state: &AppState,
    username: Username<'_>,
) -> Result<Option<String>, StoreError> {
    let store = state.store();
    store.ping().await?;
    debug!(strategy = %store.strategy(), "resolving password hash for {username}");
    store.password_hash(username).await
}

// bcrypt is deliberately slow, keep it off the async workers.
async fn verify_password(username: &str, password: String, hash: String) -> Result<(), Rejection> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| {
            Rejection::BackendUnavailable(format!("password verification task failed: {err}"))
        })?;

    match verified {
        Ok(true) => Ok(()),
        Ok(false) => Err(Rejection::WrongPassword {
            username: username.to_string(),
            reason: "password mismatch".to_string(),
        }),
        Err(err) => Err(Rejection::WrongPassword {
            username: username.to_string(),
            reason: err.to_string(),
        }),
    }
}
