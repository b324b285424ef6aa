use crate::http::handlers::{admin, catalog, checkout, ops, webhooks};
use crate::http::middleware::admin_auth::require_admin_password;
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/:id",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/orders/:order_id", get(admin::get_order))
        .route("/orders/:order_id/status", patch(admin::update_order_status))
        .route("/orders/:order_id/tracking", put(admin::set_tracking))
        .route("/orders/:order_id/payment", patch(admin::override_payment_status))
        .route("/payments", get(admin::list_payments))
        .route("/payments/:transaction_id", get(admin::get_payment))
        .route("/payments/:transaction_id/status", patch(admin::update_payment_log_status))
        .route("/payments/:transaction_id/retry", post(admin::track_retry))
        .route("/payments/:transaction_id/failure", post(admin::record_failure))
        .layer(from_fn_with_state(
            state.admin_password.clone(),
            require_admin_password,
        ));

    Router::new()
        .route("/api/payment/create-order", post(checkout::create_order))
        .route("/api/payment/verify", post(checkout::verify_payment))
        .route(
            "/api/webhooks/razorpay",
            post(webhooks::razorpay_webhook).get(webhooks::webhook_liveness),
        )
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/:id", get(catalog::get_product))
        .route("/api/banners", get(catalog::list_banners))
        .route("/api/collections", get(catalog::list_collections))
        .route("/api/cart/quote", post(catalog::quote_cart))
        .route("/api/health", get(ops::health))
        .route("/api/ping", get(ops::ping))
        .route("/api/uptime", get(ops::uptime))
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
