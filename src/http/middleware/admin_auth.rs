use crate::domain::payment::err;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

pub async fn require_admin_password(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || provided != expected {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(err("UNAUTHORIZED", "admin password required")),
        )
            .into_response();
    }

    next.run(request).await
}
