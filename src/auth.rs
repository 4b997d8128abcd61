use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::AppState;

/// Authenticated caller identity, available to handlers via request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

#[derive(Serialize)]
struct AuthError {
    success: bool,
    error: String,
}

/// Resolves the session cookie to a username before the request reaches a
/// protected handler. Anything without a live session gets a 401.
pub async fn session_middleware<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, &state.cookie_name));

    match token.and_then(|t| state.sessions.resolve(&t)) {
        Some(username) => {
            tracing::debug!(user = %username, "Authenticated request");
            req.extensions_mut().insert(CurrentUser { username });
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(AuthError {
                success: false,
                error: "Not logged in".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Pull one cookie's value out of a `Cookie:` header.
pub(crate) fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
