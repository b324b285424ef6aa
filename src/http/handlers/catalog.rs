use crate::domain::cart::{Cart, CartError};
use crate::domain::catalog::ProductFilter;
use crate::domain::payment::{bad_request, err, internal, rejected_body};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> impl IntoResponse {
    match state.catalog.list_products(&filter).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => {
            let (status, body) = internal(e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.catalog.get_product(&id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(err("PRODUCT_NOT_FOUND", "product not found")),
        )
            .into_response(),
        Err(e) => {
            let (status, body) = internal(e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn list_banners(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_banners().await {
        Ok(banners) => (StatusCode::OK, Json(banners)).into_response(),
        Err(e) => {
            let (status, body) = internal(e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn list_collections(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_collections().await {
        Ok(collections) => (StatusCode::OK, Json(collections)).into_response(),
        Err(e) => {
            let (status, body) = internal(e);
            (status, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub product_id: String,
    #[serde(default)]
    pub size: String,
    pub quantity: u32,
    #[serde(default)]
    pub custom_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<QuoteLine>,
}

/// Prices a cart against the current catalog with the same rules the client cart applies.
pub async fn quote_cart(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            let (status, body) = rejected_body(&rejection);
            return (status, Json(body)).into_response();
        }
    };
    let mut cart = Cart::default();
    for line in req.items {
        let product = match state.catalog.get_product(&line.product_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                let mut body = err("PRODUCT_NOT_FOUND", "product not found");
                body.details = Some(serde_json::json!({ "productId": line.product_id }));
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            Err(e) => {
                let (status, body) = internal(e);
                return (status, Json(body)).into_response();
            }
        };
        if let Err(e) = cart.add(product, &line.size, line.quantity, line.custom_name.as_deref()) {
            let code = match e {
                CartError::SizeNotSelected => "SIZE_REQUIRED",
                CartError::CustomNameRequired(_) => "CUSTOM_NAME_REQUIRED",
                CartError::ZeroQuantity | CartError::QuantityTooLarge => "INVALID_QUANTITY",
                CartError::LineNotFound => "LINE_NOT_FOUND",
            };
            let (status, body) = bad_request(code, &e.to_string());
            return (status, Json(body)).into_response();
        }
    }

    let totals = cart.totals(&state.checkout_service.shipping);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "itemCount": cart.item_count(),
            "totals": totals,
            "cartItems": cart.checkout_items(),
        })),
    )
        .into_response()
}
