use crate::domain::webhook_event::{UpdateResult, WebhookEnvelope};
use crate::gateways::signature;
use crate::idempotency::{Claim, IdempotencyStore};
use crate::repo::Ledger;
use axum::http::StatusCode;
use serde::Serialize;
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("missing x-razorpay-signature header")]
    MissingSignature,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("{0}")]
    InvalidPayload(String),
    #[error("event {0} is already being processed")]
    InFlight(String),
    #[error("webhook processing failed: {0}")]
    Processing(anyhow::Error),
}

impl WebhookRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSecret | Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingSignature | Self::InvalidSignature | Self::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InFlight(_) => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSecret => "WEBHOOK_SECRET_MISSING",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::InFlight(_) => "EVENT_IN_FLIGHT",
            Self::Processing(_) => "WEBHOOK_PROCESSING_FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Processed,
    AlreadyProcessed,
    Unhandled,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: WebhookStatus,
    pub event: String,
    pub processed_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_result: Option<UpdateResult>,
}

/// Authenticates, de-duplicates and applies gateway webhook events.
#[derive(Clone)]
pub struct WebhookService {
    pub secret: Option<String>,
    pub ledger: Arc<dyn Ledger>,
    pub idempotency: Arc<dyn IdempotencyStore>,
}

impl WebhookService {
    pub async fn handle(&self, signature_hex: Option<&str>, body: &[u8]) -> Result<WebhookAck, WebhookRejection> {
        let secret = match self.secret.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => {
                tracing::error!("RAZORPAY_WEBHOOK_SECRET is not set; refusing webhook");
                return Err(WebhookRejection::MissingSecret);
            }
        };
        let signature_hex = signature_hex
            .filter(|s| !s.is_empty())
            .ok_or(WebhookRejection::MissingSignature)?;

        // Must run over the exact bytes received, before any parsing.
        if !signature::verify(secret, body, signature_hex) {
            tracing::warn!(body_len = body.len(), "webhook signature mismatch");
            return Err(WebhookRejection::InvalidSignature);
        }

        let envelope = WebhookEnvelope::parse(body).map_err(|e| {
            tracing::warn!(error = %e, "signed webhook body could not be parsed");
            WebhookRejection::InvalidPayload(e.to_string())
        })?;
        let key = envelope.idempotency_key();

        match self.idempotency.claim(&key).await {
            Ok(Claim::Acquired) => {}
            Ok(Claim::AlreadyProcessed) => {
                tracing::info!(event = %envelope.event_name, key = %key, "duplicate webhook ignored");
                return Ok(WebhookAck {
                    status: WebhookStatus::AlreadyProcessed,
                    event: envelope.event_name,
                    processed_at: chrono::Utc::now(),
                    update_result: None,
                });
            }
            Ok(Claim::InFlight) => {
                tracing::warn!(event = %envelope.event_name, key = %key, "webhook already in flight");
                return Err(WebhookRejection::InFlight(key));
            }
            Err(e) => {
                tracing::error!(target: "error_tracking", key = %key, error = %e, "idempotency store unavailable");
                return Err(WebhookRejection::Processing(e));
            }
        }

        match self.dispatch(&envelope).await {
            Ok(ack) => {
                if let Err(e) = self.idempotency.complete(&key).await {
                    // The update is committed; a redelivery will re-apply it idempotently.
                    tracing::error!(key = %key, error = %e, "failed to mark webhook processed");
                }
                Ok(ack)
            }
            Err(e) => {
                if let Err(release_err) = self.idempotency.release(&key).await {
                    tracing::error!(key = %key, error = %release_err, "failed to release webhook claim");
                }
                tracing::error!(
                    target: "error_tracking",
                    event = %envelope.event_name,
                    key = %key,
                    error = %e,
                    "webhook processing failed"
                );
                Err(WebhookRejection::Processing(e))
            }
        }
    }

    async fn dispatch(&self, envelope: &WebhookEnvelope) -> anyhow::Result<WebhookAck> {
        let Some(update) = envelope.payment_update() else {
            tracing::info!(event = %envelope.event_name, "unhandled webhook event acknowledged");
            return Ok(WebhookAck {
                status: WebhookStatus::Unhandled,
                event: envelope.event_name.clone(),
                processed_at: chrono::Utc::now(),
                update_result: None,
            });
        };

        let result = self.ledger.apply_payment_update(&update).await?;
        if result.order_matched {
            tracing::info!(
                event = %envelope.event_name,
                gateway_order_id = %update.gateway_order_id,
                order_id = result.order_id.as_deref().unwrap_or("-"),
                payment_status = update.order_status.as_str(),
                "payment update applied"
            );
        } else {
            tracing::warn!(
                event = %envelope.event_name,
                gateway_order_id = %update.gateway_order_id,
                "webhook references an unknown order"
            );
        }

        Ok(WebhookAck {
            status: WebhookStatus::Processed,
            event: envelope.event_name.clone(),
            processed_at: chrono::Utc::now(),
            update_result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Order;
    use crate::domain::payment_log::PaymentLog;
    use crate::domain::webhook_event::PaymentUpdate;
    use crate::idempotency::memory::MemoryIdempotencyStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLedger {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Ledger for CountingLedger {
        fn backend(&self) -> &'static str {
            "counting"
        }

        async fn record_checkout(&self, _order: &Order, _log: &PaymentLog) -> anyhow::Result<()> {
            Ok(())
        }

        async fn apply_payment_update(&self, _update: &PaymentUpdate) -> anyhow::Result<UpdateResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("database unavailable");
            }
            Ok(UpdateResult {
                order_matched: true,
                ..Default::default()
            })
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn service(fail: bool) -> (WebhookService, Arc<CountingLedger>) {
        let ledger = Arc::new(CountingLedger {
            calls: AtomicUsize::new(0),
            fail,
        });
        let svc = WebhookService {
            secret: Some("whsec".to_string()),
            ledger: ledger.clone(),
            idempotency: Arc::new(MemoryIdempotencyStore::default()),
        };
        (svc, ledger)
    }

    fn captured() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "event": "payment.captured",
            "created_at": 1_700_000_100,
            "payload": {"payment": {"entity": {
                "id": "pay_1", "order_id": "order_1", "amount": 100000, "method": "upi"
            }}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_delivery_is_applied_once() {
        let (svc, ledger) = service(false);
        let body = captured();
        let sig = signature::sign("whsec", &body);

        let first = svc.handle(Some(&sig), &body).await.unwrap();
        let second = svc.handle(Some(&sig), &body).await.unwrap();

        assert_eq!(first.status, WebhookStatus::Processed);
        assert_eq!(second.status, WebhookStatus::AlreadyProcessed);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_dispatch_releases_the_claim() {
        let (svc, ledger) = service(true);
        let body = captured();
        let sig = signature::sign("whsec", &body);

        let err = svc.handle(Some(&sig), &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Redelivery is attempted again rather than reported as a duplicate.
        let err = svc.handle(Some(&sig), &body).await.unwrap_err();
        assert!(matches!(err, WebhookRejection::Processing(_)));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejects_before_touching_storage() {
        let (svc, ledger) = service(false);
        let body = captured();

        let err = svc.handle(None, &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = svc.handle(Some("00ff"), &body).await.unwrap_err();
        assert!(matches!(err, WebhookRejection::InvalidSignature));

        let unsigned = WebhookService {
            secret: None,
            ..svc.clone()
        };
        let sig = signature::sign("whsec", &body);
        let err = unsigned.handle(Some(&sig), &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signed_garbage_is_a_bad_request() {
        let (svc, _) = service(false);
        let body = b"{not json".to_vec();
        let sig = signature::sign("whsec", &body);
        let err = svc.handle(Some(&sig), &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let (svc, ledger) = service(false);
        let body = serde_json::to_vec(&json!({
            "event": "refund.created",
            "created_at": 1_700_000_200,
            "payload": {}
        }))
        .unwrap();
        let sig = signature::sign("whsec", &body);
        let ack = svc.handle(Some(&sig), &body).await.unwrap();
        assert_eq!(ack.status, WebhookStatus::Unhandled);
        assert_eq!(ack.event, "refund.created");
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }
}
