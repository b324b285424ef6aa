use crate::domain::payment::err;
use crate::service::webhook_service::SIGNATURE_HEADER;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

/// Takes the body as raw bytes: the HMAC covers exactly what the gateway sent.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    match state.webhook_service.handle(signature, &body).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(rejection) => {
            let message = if rejection.status().is_server_error() {
                "webhook could not be processed".to_string()
            } else {
                rejection.to_string()
            };
            (rejection.status(), Json(err(rejection.code(), &message))).into_response()
        }
    }
}

pub async fn webhook_liveness() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "endpoint": "razorpay webhook",
            "accepts": "POST"
        })),
    )
        .into_response()
}
