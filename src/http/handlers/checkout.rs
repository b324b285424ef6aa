use crate::domain::checkout::{CreateOrderRequest, VerifyPaymentRequest};
use crate::domain::payment::rejected_body;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    match state.checkout_service.create_order(req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    match state.checkout_service.verify_payment(req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}
