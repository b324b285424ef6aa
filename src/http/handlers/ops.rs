use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let storage_ok = state.ledger.ping().await.is_ok();
    let idempotency_ok = state.idempotency.ping().await.is_ok();

    let ok = storage_ok && idempotency_ok;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ok,
            "storage": { "backend": state.ledger.backend(), "ok": storage_ok },
            "idempotency": { "backend": state.idempotency.backend(), "ok": idempotency_ok },
            "gateway": state.checkout_service.gateway.name(),
        })),
    )
        .into_response()
}

pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"message": "pong"}))).into_response()
}

pub async fn uptime(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "started_at": state.started_wall_clock,
        })),
    )
        .into_response()
}
