use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use super::state::AppState;

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer realm=\"tickerwire admin\"")],
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Guards admin routes when an admin token is configured
///
/// With no token configured the admin routes are open.
pub async fn require_admin_token(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Response> {
    let Some(ref expected) = state.admin_token else {
        return Ok(next.run(request).await);
    };

    let rejection = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        None => Some("Missing Authorization header"),
        Some(auth_header) => match extract_bearer(auth_header) {
            Some(token) if token == expected.as_ref() => None,
            Some(_) => Some("Invalid admin token"),
            None => Some("Invalid Authorization header format"),
        },
    };

    match rejection {
        None => Ok(next.run(request).await),
        Some(message) => {
            warn!(path = %request.uri().path(), reason = message, "rejected admin request");
            Err(unauthorized(message))
        }
    }
}
