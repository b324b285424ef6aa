use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_payments::config::AppConfig;
use storefront_payments::domain::order::Order;
use storefront_payments::domain::payment_log::PaymentLog;
use storefront_payments::domain::webhook_event::{PaymentUpdate, UpdateResult};
use storefront_payments::gateways::mock::MockGateway;
use storefront_payments::gateways::signature;
use storefront_payments::repo::memory::MemoryStore;
use storefront_payments::repo::{Ledger, OrderStore, PaymentLogStore};
use storefront_payments::{AppState, Backends};
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test";
const KEY_SECRET: &str = "key_secret_test";

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
}

fn harness_with(webhook_secret: Option<&str>, behavior: &str) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::new(KEY_SECRET, behavior));
    let cfg = AppConfig {
        razorpay_webhook_secret: webhook_secret.map(str::to_string),
        ..AppConfig::default()
    };
    let state = AppState::new(&cfg, Backends::memory(store.clone(), gateway.clone()));
    Harness {
        app: storefront_payments::http::routes::router(state),
        store,
        gateway,
    }
}

fn harness() -> Harness {
    harness_with(Some(WEBHOOK_SECRET), "")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn webhook(body: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut req = Request::post("/api/webhooks/razorpay").header("content-type", "application/json");
    if let Some(sig) = signature {
        req = req.header("x-razorpay-signature", sig);
    }
    req.body(Body::from(body.to_vec())).unwrap()
}

fn checkout_body(amount: f64) -> Value {
    json!({
        "amount": amount,
        "customerDetails": {
            "name": "Meera Iyer",
            "email": "meera@example.in",
            "phone": "9876543210",
            "address": "4 Lake View Road, Chennai",
            "pincode": "600001"
        },
        "cartItems": [
            {"productId": "harness-red", "title": "Red Harness", "price": 500.0, "quantity": 2, "size": "M"}
        ]
    })
}

fn event(name: &str, created_at: i64, payment_id: &str, gateway_order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": name,
        "created_at": created_at,
        "payload": {"payment": {"entity": {
            "id": payment_id,
            "order_id": gateway_order_id,
            "amount": 100000,
            "currency": "INR",
            "method": "upi",
            "error_code": if name == "payment.failed" { json!("BAD_REQUEST_ERROR") } else { Value::Null },
            "error_description": if name == "payment.failed" { json!("Payment declined") } else { Value::Null }
        }}}
    }))
    .unwrap()
}

async fn place_order(h: &Harness) -> (String, String) {
    let (status, body) = send(&h.app, post_json("/api/payment/create-order", &checkout_body(1000.0))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["orderId"].as_str().unwrap().to_string(),
        body["order"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn checkout_then_captured_webhook_marks_order_paid_once() {
    let h = harness();

    let (status, body) = send(&h.app, post_json("/api/payment/create-order", &checkout_body(1000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["amount"], 100000);
    assert_eq!(body["order"]["currency"], "INR");
    assert!(body["order"]["receipt"].as_str().unwrap().starts_with("order_"));
    let order_id = body["orderId"].as_str().unwrap().to_string();
    let gateway_order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("ORD_"));

    let created = h.gateway.created_orders();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].amount, 100000);

    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.order_status.as_str(), "placed");
    assert_eq!(order.payment_details.payment_status.as_str(), "pending");
    assert_eq!(order.order_summary.total, 1000.0);
    let log = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log.payment_status.as_str(), "initiated");
    assert_eq!(log.order_reference.order_id, order_id);

    let body = event("payment.captured", 1_700_000_500, "pay_abc", &gateway_order_id);
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, ack) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK, "{ack}");
    assert_eq!(ack["status"], "processed");
    assert_eq!(ack["event"], "payment.captured");
    assert_eq!(ack["update_result"]["order_matched"], true);

    let paid = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(paid.payment_details.payment_status.as_str(), "paid");
    assert_eq!(paid.payment_details.razorpay_payment_id.as_deref(), Some("pay_abc"));
    assert_eq!(paid.payment_details.payment_method.as_deref(), Some("upi"));
    let paid_at = paid.timestamps.paid_at;
    assert!(paid_at.is_some());
    let log = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log.payment_status.as_str(), "success");

    let (status, replay) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["status"], "already_processed");
    let after = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(after, paid);
}

#[tokio::test]
async fn tampered_body_is_rejected_without_mutation() {
    let h = harness();
    let (order_id, gateway_order_id) = place_order(&h).await;

    let body = event("payment.captured", 1_700_000_600, "pay_t", &gateway_order_id);
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let mut tampered = body.clone();
    let last = tampered.len() - 2;
    tampered[last] ^= 0x01;

    let (status, resp) = send(&h.app, webhook(&tampered, Some(&sig))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["code"], "INVALID_SIGNATURE");

    let (status, _) = send(&h.app, webhook(&body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = send(&h.app, webhook(&body, Some(&sig.to_uppercase()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["code"], "INVALID_SIGNATURE");

    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "pending");
}

#[tokio::test]
async fn missing_webhook_secret_is_a_server_error() {
    let h = harness_with(None, "");
    let body = event("payment.captured", 1_700_000_700, "pay_x", "order_x");
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, _) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unhandled_event_is_acknowledged() {
    let h = harness();
    let body = serde_json::to_vec(&json!({
        "event": "refund.processed",
        "created_at": 1_700_000_800,
        "payload": {"refund": {"entity": {"id": "rfnd_1"}}}
    }))
    .unwrap();
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, ack) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "unhandled");
    assert_eq!(ack["event"], "refund.processed");
}

#[tokio::test]
async fn last_processed_payment_event_wins() {
    let h = harness();
    let (order_id, gateway_order_id) = place_order(&h).await;

    for (name, created_at) in [("payment.captured", 1_700_001_000), ("payment.failed", 1_700_001_001)] {
        let body = event(name, created_at, "pay_flip", &gateway_order_id);
        let sig = signature::sign(WEBHOOK_SECRET, &body);
        let (status, _) = send(&h.app, webhook(&body, Some(&sig))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "failed");
    assert!(order.timestamps.paid_at.is_some());

    let log = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log.payment_status.as_str(), "failed");
    let details = log.error_details.unwrap();
    assert_eq!(details.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    assert_eq!(details.failure_reason.as_deref(), Some("webhook_notification"));
}

fn order_paid_event(created_at: i64, gateway_order_id: &str, payment_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": "order.paid",
        "created_at": created_at,
        "payload": {
            "order": {"entity": {"id": gateway_order_id, "amount_paid": 100000, "status": "paid"}},
            "payment": {"entity": {"id": payment_id, "order_id": gateway_order_id, "method": "card"}}
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn order_paid_marks_order_paid_and_leaves_payment_log() {
    let h = harness();
    let (order_id, gateway_order_id) = place_order(&h).await;
    let log_before = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();

    let body = order_paid_event(1_700_003_000, &gateway_order_id, "pay_op");
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, ack) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK, "{ack}");
    assert_eq!(ack["status"], "processed");
    assert_eq!(ack["update_result"]["order_matched"], true);
    assert_eq!(ack["update_result"]["payment_log_updated"], false);

    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "paid");
    assert_eq!(order.payment_details.razorpay_payment_id.as_deref(), Some("pay_op"));
    assert_eq!(order.payment_details.payment_method.as_deref(), Some("card"));
    let paid_at = order.timestamps.paid_at;
    assert!(paid_at.is_some());

    let log_after = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log_after, log_before);

    // A second delivery with a new timestamp is a distinct event but must not move paidAt.
    let again = order_paid_event(1_700_003_060, &gateway_order_id, "pay_op2");
    let sig = signature::sign(WEBHOOK_SECRET, &again);
    let (status, ack) = send(&h.app, webhook(&again, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "processed");
    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.timestamps.paid_at, paid_at);
}

#[tokio::test]
async fn authorized_payment_stays_pending_and_records_method() {
    let h = harness();
    let (order_id, gateway_order_id) = place_order(&h).await;
    let log_before = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();

    let body = event("payment.authorized", 1_700_004_000, "pay_auth", &gateway_order_id);
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, ack) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK, "{ack}");
    assert_eq!(ack["update_result"]["order_matched"], true);
    assert_eq!(ack["update_result"]["payment_log_updated"], false);

    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "pending");
    assert_eq!(order.payment_details.payment_method.as_deref(), Some("upi"));
    assert!(order.timestamps.paid_at.is_none());

    let log_after = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log_after, log_before);
    assert_eq!(log_after.payment_status.as_str(), "initiated");

    let captured = event("payment.captured", 1_700_004_030, "pay_auth", &gateway_order_id);
    let sig = signature::sign(WEBHOOK_SECRET, &captured);
    let (status, _) = send(&h.app, webhook(&captured, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK);
    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "paid");
    let log = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log.payment_status.as_str(), "success");
}

#[tokio::test]
async fn webhook_for_unknown_order_is_recorded_but_unmatched() {
    let h = harness();
    let body = event("payment.captured", 1_700_002_000, "pay_orphan", "order_nobody");
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    let (status, ack) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["update_result"]["order_matched"], false);

    let (_, replay) = send(&h.app, webhook(&body, Some(&sig))).await;
    assert_eq!(replay["status"], "already_processed");
}

#[tokio::test]
async fn create_order_rejects_incomplete_requests() {
    let h = harness();

    let (status, _) = send(&h.app, post_json("/api/payment/create-order", &json!({"amount": 500}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_phone = checkout_body(1000.0);
    bad_phone["customerDetails"]["phone"] = json!("12345");
    let (status, body) = send(&h.app, post_json("/api/payment/create-order", &bad_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "phone");

    let (status, _) = send(&h.app, post_json("/api/payment/create-order", &checkout_body(0.0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(h.gateway.created_orders().is_empty());
    assert!(h.store.list_recent_orders(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn gateway_failure_writes_nothing() {
    let h = harness_with(Some(WEBHOOK_SECRET), "ALWAYS_FAILURE");
    let (status, body) = send(&h.app, post_json("/api/payment/create-order", &checkout_body(1000.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(h.store.list_recent_orders(10).await.unwrap().is_empty());
    assert!(h.store.list_recent_logs(10).await.unwrap().is_empty());
}

struct FailingLedger;

#[async_trait::async_trait]
impl Ledger for FailingLedger {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn record_checkout(&self, _order: &Order, _log: &PaymentLog) -> anyhow::Result<()> {
        anyhow::bail!("connection reset")
    }

    async fn apply_payment_update(&self, _update: &PaymentUpdate) -> anyhow::Result<UpdateResult> {
        anyhow::bail!("connection reset")
    }

    async fn ping(&self) -> anyhow::Result<()> {
        anyhow::bail!("connection reset")
    }
}

#[tokio::test]
async fn persistence_failure_still_returns_the_gateway_order() {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MockGateway::new(KEY_SECRET, ""));
    let mut backends = Backends::memory(store.clone(), gateway.clone());
    backends.ledger = Arc::new(FailingLedger);
    let cfg = AppConfig {
        razorpay_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        ..AppConfig::default()
    };
    let app = storefront_payments::http::routes::router(AppState::new(&cfg, backends));

    let (status, body) = send(&app, post_json("/api/payment/create-order", &checkout_body(1000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(gateway.created_orders().len(), 1);
    assert!(store.list_recent_orders(10).await.unwrap().is_empty());

    // Processing errors release the claim and surface as 500 so the gateway retries.
    let event_body = event("payment.captured", 1_700_003_000, "pay_r", "order_r");
    let sig = signature::sign(WEBHOOK_SECRET, &event_body);
    let (status, _) = send(&app, webhook(&event_body, Some(&sig))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, health) = send(&app, Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["storage"]["ok"], false);
}

#[tokio::test]
async fn verify_checks_signature_and_never_marks_paid() {
    let h = harness();
    let (order_id, gateway_order_id) = place_order(&h).await;

    let good = signature::sign(KEY_SECRET, format!("{gateway_order_id}|pay_v").as_bytes());
    let req = json!({
        "razorpay_payment_id": "pay_v",
        "razorpay_order_id": gateway_order_id,
        "razorpay_signature": good,
        "orderId": order_id
    });
    let (status, body) = send(&h.app, post_json("/api/payment/verify", &req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["paymentId"], "pay_v");

    let log = h.store.get_log_by_gateway_id(&gateway_order_id).await.unwrap().unwrap();
    assert_eq!(log.razorpay_payment_id.as_deref(), Some("pay_v"));
    assert_eq!(log.razorpay_signature.as_deref(), Some(good.as_str()));
    let order = h.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_details.payment_status.as_str(), "pending");

    let mut forged = req.clone();
    forged["razorpay_signature"] = json!("deadbeef");
    let (status, body) = send(&h.app, post_json("/api/payment/verify", &forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    let (status, _) = send(
        &h.app,
        post_json("/api/payment/verify", &json!({"razorpay_payment_id": "pay_v"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ops_endpoints_respond() {
    let h = harness();
    let (status, body) = send(&h.app, Request::get("/api/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");

    let (status, body) = send(&h.app, Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"]["backend"], "memory");
    assert_eq!(body["gateway"], "mock");

    let (status, body) = send(&h.app, Request::get("/api/uptime").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["uptime_secs"].is_u64());

    let (status, _) = send(
        &h.app,
        Request::get("/api/webhooks/razorpay").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
