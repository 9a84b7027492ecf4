use super::auth::{authenticate, AuthRequest, Rejection};
use crate::{api::config::AppState, short_commit, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database is reachable and the self-test (if configured) passed", body = Health),
        (status = 400, description = "Self-test credentials are empty", body = String),
        (status = 403, description = "Self-test credentials were rejected", body = String),
        (status = 404, description = "Self-test account does not exist", body = String),
        (status = 500, description = "Database is unreachable", body = String)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, state: Extension<AppState>) -> Response {
    let headers = app_headers();

    let deadline = state.config().db_timeout();
    let probe = match timeout(deadline, state.store().ping()).await {
        Ok(result) => result.map_err(Rejection::from),
        Err(_) => Err(Rejection::BackendUnavailable(format!(
            "database did not answer within {}s",
            deadline.as_secs_f32()
        ))),
    };

    if let Err(rejection) = probe {
        debug!("Database connection is unhealthy");
        return (headers, rejection).into_response();
    }

    debug!("Database connection is healthy");

    // Run the same decision /auth would make for the self-test credentials.
    if let Some(selftest) = state.config().selftest() {
        let request = AuthRequest::new(selftest.username(), selftest.password());
        if let Err(rejection) = authenticate(&state, &request).await {
            debug!("Self-test failed");
            return (headers, rejection).into_response();
        }
        debug!("Self-test passed for {:?}", selftest.username());
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "ok".to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    (StatusCode::OK, headers, body).into_response()
}

fn app_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    match format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(GIT_COMMIT_HASH)
    )
    .parse::<HeaderValue>()
    {
        Ok(value) => {
            headers.insert("X-App", value);
        }
        Err(err) => error!("Failed to parse X-App header: {}", err),
    }

    headers
}
