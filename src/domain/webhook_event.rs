use crate::domain::order::Order;
use crate::domain::payment::{OrderPaymentStatus, PaymentLogStatus};
use crate::domain::payment_log::PaymentLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FAILURE_REASON_WEBHOOK: &str = "webhook_notification";

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    created_at: i64,
    #[serde(default)]
    payload: RawPayload,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    payment: Option<Wrapped<RawPayment>>,
    order: Option<Wrapped<RawOrder>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    id: Option<String>,
    order_id: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: Option<String>,
    #[serde(default)]
    amount_paid: Option<i64>,
}

/// A payment entity that names both itself and the gateway order it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotice {
    pub payment_id: String,
    pub gateway_order_id: String,
    pub amount_minor: Option<i64>,
    pub method: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    PaymentCaptured(PaymentNotice),
    PaymentFailed(PaymentNotice),
    PaymentAuthorized(PaymentNotice),
    OrderPaid {
        gateway_order_id: String,
        amount_paid_minor: Option<i64>,
        payment: Option<PaymentNotice>,
    },
    Unhandled {
        event: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    pub event_name: String,
    pub created_at: i64,
    /// Payment id when the payload carries one, else the order id.
    pub entity_id: Option<String>,
    pub event: GatewayEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("webhook body is not a valid event: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{event} payload is missing {field}")]
    MissingField { event: String, field: &'static str },
}

impl WebhookEnvelope {
    pub fn parse(body: &[u8]) -> Result<Self, EventParseError> {
        let raw: RawEvent = serde_json::from_slice(body)?;
        let payment_id = raw
            .payload
            .payment
            .as_ref()
            .and_then(|p| p.entity.id.clone());
        let order_id = raw.payload.order.as_ref().and_then(|o| o.entity.id.clone());
        let entity_id = payment_id.or(order_id);

        let missing = |field: &'static str| EventParseError::MissingField {
            event: raw.event.clone(),
            field,
        };

        let event = match raw.event.as_str() {
            "payment.captured" | "payment.failed" | "payment.authorized" => {
                let entity = raw
                    .payload
                    .payment
                    .as_ref()
                    .map(|p| &p.entity)
                    .ok_or_else(|| missing("payload.payment"))?;
                let notice = payment_notice(entity).map_err(missing)?;
                match raw.event.as_str() {
                    "payment.captured" => GatewayEvent::PaymentCaptured(notice),
                    "payment.failed" => GatewayEvent::PaymentFailed(notice),
                    _ => GatewayEvent::PaymentAuthorized(notice),
                }
            }
            "order.paid" => {
                let order = raw
                    .payload
                    .order
                    .as_ref()
                    .map(|o| &o.entity)
                    .ok_or_else(|| missing("payload.order"))?;
                let gateway_order_id = order
                    .id
                    .clone()
                    .ok_or_else(|| missing("payload.order.entity.id"))?;
                let payment = raw
                    .payload
                    .payment
                    .as_ref()
                    .and_then(|p| payment_notice(&p.entity).ok());
                GatewayEvent::OrderPaid {
                    gateway_order_id,
                    amount_paid_minor: order.amount_paid,
                    payment,
                }
            }
            other => GatewayEvent::Unhandled {
                event: other.to_string(),
            },
        };

        Ok(Self {
            event_name: raw.event,
            created_at: raw.created_at,
            entity_id,
            event,
        })
    }

    /// `<event>_<created_at>_<payment id | order id>`
    pub fn idempotency_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.event_name,
            self.created_at,
            self.entity_id.as_deref().unwrap_or("unknown")
        )
    }

    pub fn payment_update(&self) -> Option<PaymentUpdate> {
        match &self.event {
            GatewayEvent::PaymentCaptured(p) => Some(PaymentUpdate {
                gateway_order_id: p.gateway_order_id.clone(),
                order_status: OrderPaymentStatus::Paid,
                payment_id: Some(p.payment_id.clone()),
                method: p.method.clone(),
                log: Some(LogPatch::Success),
            }),
            GatewayEvent::PaymentFailed(p) => Some(PaymentUpdate {
                gateway_order_id: p.gateway_order_id.clone(),
                order_status: OrderPaymentStatus::Failed,
                payment_id: Some(p.payment_id.clone()),
                method: p.method.clone(),
                log: Some(LogPatch::Failed {
                    error_code: p.error_code.clone(),
                    error_description: p.error_description.clone(),
                }),
            }),
            GatewayEvent::PaymentAuthorized(p) => Some(PaymentUpdate {
                gateway_order_id: p.gateway_order_id.clone(),
                order_status: OrderPaymentStatus::Pending,
                payment_id: None,
                method: p.method.clone(),
                log: None,
            }),
            GatewayEvent::OrderPaid {
                gateway_order_id,
                payment,
                ..
            } => Some(PaymentUpdate {
                gateway_order_id: gateway_order_id.clone(),
                order_status: OrderPaymentStatus::Paid,
                payment_id: payment.as_ref().map(|p| p.payment_id.clone()),
                method: payment.as_ref().and_then(|p| p.method.clone()),
                log: None,
            }),
            GatewayEvent::Unhandled { .. } => None,
        }
    }
}

fn payment_notice(entity: &RawPayment) -> Result<PaymentNotice, &'static str> {
    Ok(PaymentNotice {
        payment_id: entity.id.clone().ok_or("payload.payment.entity.id")?,
        gateway_order_id: entity
            .order_id
            .clone()
            .ok_or("payload.payment.entity.order_id")?,
        amount_minor: entity.amount,
        method: entity.method.clone(),
        error_code: entity.error_code.clone(),
        error_description: entity.error_description.clone(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogPatch {
    Success,
    Failed {
        error_code: Option<String>,
        error_description: Option<String>,
    },
}

/// The state change one gateway event asks for, keyed by gateway order id.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub gateway_order_id: String,
    pub order_status: OrderPaymentStatus,
    pub payment_id: Option<String>,
    pub method: Option<String>,
    pub log: Option<LogPatch>,
}

impl PaymentUpdate {
    pub fn apply_to_order(&self, order: &mut Order, now: DateTime<Utc>) {
        order.apply_payment(
            self.order_status,
            self.payment_id.as_deref(),
            self.method.as_deref(),
            now,
        );
    }

    /// Returns false when this update leaves the payment log alone.
    pub fn apply_to_log(&self, log: &mut PaymentLog, now: DateTime<Utc>) -> bool {
        match &self.log {
            None => false,
            Some(LogPatch::Success) => {
                log.record_gateway_payment(self.payment_id.as_deref(), self.method.as_deref(), now);
                log.set_status(PaymentLogStatus::Success, now);
                true
            }
            Some(LogPatch::Failed {
                error_code,
                error_description,
            }) => {
                log.record_gateway_payment(self.payment_id.as_deref(), self.method.as_deref(), now);
                log.record_failure(
                    error_code.clone(),
                    error_description.clone(),
                    FAILURE_REASON_WEBHOOK,
                    now,
                );
                true
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateResult {
    pub order_matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<OrderPaymentStatus>,
    pub payment_log_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(event: &str, payment: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "entity": "event",
            "event": event,
            "created_at": 1_700_000_000,
            "payload": { "payment": { "entity": payment } }
        }))
        .unwrap()
    }

    #[test]
    fn captured_becomes_paid_plus_log_success() {
        let env = WebhookEnvelope::parse(&body(
            "payment.captured",
            json!({"id": "pay_1", "order_id": "order_1", "method": "card", "amount": 100000}),
        ))
        .unwrap();
        assert_eq!(env.idempotency_key(), "payment.captured_1700000000_pay_1");
        let update = env.payment_update().unwrap();
        assert_eq!(update.gateway_order_id, "order_1");
        assert_eq!(update.order_status, OrderPaymentStatus::Paid);
        assert_eq!(update.log, Some(LogPatch::Success));
    }

    #[test]
    fn failed_carries_error_details() {
        let env = WebhookEnvelope::parse(&body(
            "payment.failed",
            json!({
                "id": "pay_2",
                "order_id": "order_1",
                "error_code": "BAD_REQUEST_ERROR",
                "error_description": "card declined"
            }),
        ))
        .unwrap();
        let update = env.payment_update().unwrap();
        assert_eq!(update.order_status, OrderPaymentStatus::Failed);
        assert_eq!(
            update.log,
            Some(LogPatch::Failed {
                error_code: Some("BAD_REQUEST_ERROR".to_string()),
                error_description: Some("card declined".to_string()),
            })
        );
    }

    #[test]
    fn authorized_stays_pending_and_skips_log() {
        let env = WebhookEnvelope::parse(&body(
            "payment.authorized",
            json!({"id": "pay_3", "order_id": "order_1", "method": "upi"}),
        ))
        .unwrap();
        let update = env.payment_update().unwrap();
        assert_eq!(update.order_status, OrderPaymentStatus::Pending);
        assert_eq!(update.method.as_deref(), Some("upi"));
        assert!(update.log.is_none());
    }

    #[test]
    fn order_paid_keys_on_order_entity() {
        let raw = serde_json::to_vec(&json!({
            "event": "order.paid",
            "created_at": 1_700_000_100,
            "payload": {
                "order": { "entity": { "id": "order_9", "amount_paid": 50000 } },
                "payment": { "entity": { "id": "pay_9", "order_id": "order_9", "method": "netbanking" } }
            }
        }))
        .unwrap();
        let env = WebhookEnvelope::parse(&raw).unwrap();
        let update = env.payment_update().unwrap();
        assert_eq!(update.gateway_order_id, "order_9");
        assert_eq!(update.payment_id.as_deref(), Some("pay_9"));
        assert_eq!(env.entity_id.as_deref(), Some("pay_9"));
    }

    #[test]
    fn unknown_events_are_unhandled() {
        let raw = br#"{"event":"refund.created","created_at":5,"payload":{}}"#;
        let env = WebhookEnvelope::parse(raw).unwrap();
        assert_eq!(
            env.event,
            GatewayEvent::Unhandled {
                event: "refund.created".to_string()
            }
        );
        assert!(env.payment_update().is_none());
        assert_eq!(env.idempotency_key(), "refund.created_5_unknown");
    }

    #[test]
    fn captured_without_order_id_is_rejected() {
        let err = WebhookEnvelope::parse(&body("payment.captured", json!({"id": "pay_1"}))).unwrap_err();
        assert!(matches!(
            err,
            EventParseError::MissingField {
                field: "payload.payment.entity.order_id",
                ..
            }
        ));
    }
}
