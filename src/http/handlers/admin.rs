use crate::domain::catalog::Product;
use crate::domain::order::{OrderStatus, TrackingInfo, TransitionError};
use crate::domain::payment::{bad_request, err, internal, rejected_body, OrderPaymentStatus, PaymentLogStatus};
use crate::repo::OrderMutation;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

const DEFAULT_LIST_LIMIT: i64 = 50;

fn not_found(code: &str, message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(err(code, message))).into_response()
}

fn server_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "admin request failed");
    let (status, body) = internal(e);
    (status, Json(body)).into_response()
}

fn mutation_response(result: anyhow::Result<OrderMutation>) -> Response {
    match result {
        Ok(OrderMutation::Applied(order)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "order": order })),
        )
            .into_response(),
        Ok(OrderMutation::Rejected(e @ TransitionError::Illegal { .. })) => (
            StatusCode::CONFLICT,
            Json(err("ILLEGAL_TRANSITION", &e.to_string())),
        )
            .into_response(),
        Ok(OrderMutation::Rejected(e @ TransitionError::TrackingBeforeShipping)) => {
            let (status, body) = bad_request("TRACKING_NOT_ALLOWED", &e.to_string());
            (status, Json(body)).into_response()
        }
        Ok(OrderMutation::NotFound) => not_found("ORDER_NOT_FOUND", "order not found"),
        Err(e) => server_error(e),
    }
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mut product) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    if product.id.trim().is_empty() {
        product.id = uuid::Uuid::new_v4().to_string();
    }
    if product.title.trim().is_empty() || product.price <= 0.0 {
        let (status, body) = bad_request("INVALID_PRODUCT", "title and a positive price are required");
        return (status, Json(body)).into_response();
    }
    match state.catalog.upsert_product(&product).await {
        Ok(()) => {
            tracing::info!(product_id = %product.id, "product created");
            (StatusCode::CREATED, Json(product)).into_response()
        }
        Err(e) => server_error(e),
    }
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Product>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mut product) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    match state.catalog.get_product(&id).await {
        Ok(Some(existing)) => product.created_at = existing.created_at,
        Ok(None) => return not_found("PRODUCT_NOT_FOUND", "product not found"),
        Err(e) => return server_error(e),
    }
    product.id = id;
    match state.catalog.upsert_product(&product).await {
        Ok(()) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => server_error(e),
    }
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.catalog.delete_product(&id).await {
        Ok(true) => {
            tracing::info!(product_id = %id, "product deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found("PRODUCT_NOT_FOUND", "product not found"),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub customer: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_orders(State(state): State<AppState>, Query(q): Query<OrderListQuery>) -> impl IntoResponse {
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let result = match (q.customer.as_deref(), q.status.as_deref()) {
        (Some(email), _) => state.orders.list_orders_by_customer(email, limit).await,
        (None, Some(raw)) => match OrderStatus::parse(raw) {
            Some(status) => state.orders.list_orders_by_status(status, limit).await,
            None => {
                let (status, body) = bad_request("INVALID_STATUS", "unknown order status");
                return (status, Json(body)).into_response();
            }
        },
        (None, None) => state.orders.list_recent_orders(limit).await,
    };
    match result {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => server_error(e),
    }
}

pub async fn get_order(State(state): State<AppState>, Path(order_id): Path<String>) -> impl IntoResponse {
    let order = match state.orders.get_order(&order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => return not_found("ORDER_NOT_FOUND", "order not found"),
        Err(e) => return server_error(e),
    };
    match state.payment_logs.list_logs_by_order(&order_id).await {
        Ok(payments) => (
            StatusCode::OK,
            Json(serde_json::json!({ "order": order, "payments": payments })),
        )
            .into_response(),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: String,
    #[serde(default)]
    pub tracking_info: Option<TrackingInfo>,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    let Some(status) = OrderStatus::parse(&req.status) else {
        let (code, body) = bad_request("INVALID_STATUS", "unknown order status");
        return (code, Json(body)).into_response();
    };
    let result = state
        .orders
        .update_order_status(&order_id, status, req.tracking_info)
        .await;
    if let Ok(OrderMutation::Applied(order)) = &result {
        tracing::info!(order_id = %order.order_id, status = status.as_str(), "order status updated");
    }
    mutation_response(result)
}

pub async fn set_tracking(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<TrackingInfo>, JsonRejection>,
) -> impl IntoResponse {
    let Json(tracking) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    mutation_response(state.orders.set_tracking(&order_id, tracking).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusOverride {
    pub payment_status: OrderPaymentStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

/// Manual reconciliation of the order's payment fields, e.g. after a dashboard capture.
/// Touches only the order document; the payment log keeps its own history.
pub async fn override_payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<PaymentStatusOverride>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    let gateway_order_id = match state.orders.get_order(&order_id).await {
        Ok(Some(order)) => order.payment_details.razorpay_order_id,
        Ok(None) => return not_found("ORDER_NOT_FOUND", "order not found"),
        Err(e) => return server_error(e),
    };
    let result = state
        .orders
        .update_payment_status(
            &gateway_order_id,
            req.payment_status,
            req.payment_id.as_deref(),
            req.method.as_deref(),
        )
        .await;
    match result {
        Ok(Some(order)) => {
            tracing::info!(
                order_id = %order.order_id,
                payment_status = req.payment_status.as_str(),
                "order payment status overridden"
            );
            (StatusCode::OK, Json(serde_json::json!({ "success": true, "order": order }))).into_response()
        }
        Ok(None) => not_found("ORDER_NOT_FOUND", "order not found"),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_payments(State(state): State<AppState>, Query(q): Query<PaymentListQuery>) -> impl IntoResponse {
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let result = match (q.order.as_deref(), q.status.as_deref()) {
        (Some(order_id), _) => state.payment_logs.list_logs_by_order(order_id).await,
        (None, Some(raw)) => match PaymentLogStatus::parse(raw) {
            Some(status) => state.payment_logs.list_logs_by_status(status, limit).await,
            None => {
                let (status, body) = bad_request("INVALID_STATUS", "unknown payment status");
                return (status, Json(body)).into_response();
            }
        },
        (None, None) => state.payment_logs.list_recent_logs(limit).await,
    };
    match result {
        Ok(logs) => (StatusCode::OK, Json(logs)).into_response(),
        Err(e) => server_error(e),
    }
}

pub async fn get_payment(State(state): State<AppState>, Path(transaction_id): Path<String>) -> impl IntoResponse {
    match state.payment_logs.get_log(&transaction_id).await {
        Ok(Some(log)) => (StatusCode::OK, Json(log)).into_response(),
        Ok(None) => not_found("PAYMENT_NOT_FOUND", "payment log not found"),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LogStatusUpdate {
    pub status: PaymentLogStatus,
}

pub async fn update_payment_log_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    payload: Result<Json<LogStatusUpdate>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    match state.payment_logs.update_log_status(&transaction_id, req.status).await {
        Ok(Some(log)) => {
            tracing::info!(transaction_id = %transaction_id, status = req.status.as_str(), "payment log status updated");
            (StatusCode::OK, Json(log)).into_response()
        }
        Ok(None) => not_found("PAYMENT_NOT_FOUND", "payment log not found"),
        Err(e) => server_error(e),
    }
}

pub async fn track_retry(State(state): State<AppState>, Path(transaction_id): Path<String>) -> impl IntoResponse {
    match state.payment_logs.track_retry(&transaction_id).await {
        Ok(Some(log)) => {
            let attempt = log.error_details.as_ref().map(|d| d.retry_attempt).unwrap_or(0);
            tracing::info!(transaction_id = %transaction_id, attempt, "payment retry recorded");
            (StatusCode::OK, Json(log)).into_response()
        }
        Ok(None) => not_found("PAYMENT_NOT_FOUND", "payment log not found"),
        Err(e) => server_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    pub failure_reason: String,
}

pub async fn record_failure(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    payload: Result<Json<FailureReport>, JsonRejection>,
) -> impl IntoResponse {
    let Json(report) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    let result = state
        .payment_logs
        .record_failure(
            &transaction_id,
            report.error_code,
            report.error_description,
            &report.failure_reason,
        )
        .await;
    match result {
        Ok(Some(log)) => (StatusCode::OK, Json(log)).into_response(),
        Ok(None) => not_found("PAYMENT_NOT_FOUND", "payment log not found"),
        Err(e) => server_error(e),
    }
}
