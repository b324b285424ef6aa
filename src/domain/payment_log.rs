use crate::domain::ids;
use crate::domain::payment::PaymentLogStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderReference {
    pub order_id: String,
    pub order_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub retry_attempt: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLogTimestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub initiated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLog {
    pub id: Uuid,
    pub transaction_id: String,
    pub order_reference: OrderReference,
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub customer_email: String,
    pub customer_phone: String,
    pub payment_status: PaymentLogStatus,
    #[serde(default)]
    pub error_details: Option<ErrorDetails>,
    pub timestamps: PaymentLogTimestamps,
}

pub struct NewPaymentLog {
    pub order_reference: OrderReference,
    pub razorpay_order_id: String,
    pub amount: f64,
    pub currency: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl PaymentLog {
    pub fn initiated(input: NewPaymentLog, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: ids::transaction_id(now),
            order_reference: input.order_reference,
            razorpay_order_id: input.razorpay_order_id,
            razorpay_payment_id: None,
            razorpay_signature: None,
            amount: input.amount,
            currency: input.currency,
            payment_method: None,
            customer_email: input.customer_email,
            customer_phone: input.customer_phone,
            payment_status: PaymentLogStatus::Initiated,
            error_details: None,
            timestamps: PaymentLogTimestamps {
                created_at: now,
                updated_at: now,
                initiated_at: Some(now),
                completed_at: None,
                failed_at: None,
            },
        }
    }

    pub fn set_status(&mut self, status: PaymentLogStatus, now: DateTime<Utc>) {
        self.payment_status = status;
        let milestone = match status {
            PaymentLogStatus::Initiated => Some(&mut self.timestamps.initiated_at),
            PaymentLogStatus::Success => Some(&mut self.timestamps.completed_at),
            PaymentLogStatus::Failed => Some(&mut self.timestamps.failed_at),
            _ => None,
        };
        if let Some(slot) = milestone {
            slot.get_or_insert(now);
        }
        self.timestamps.updated_at = now;
    }

    /// Overwrites the failure description but keeps the running retry count.
    pub fn record_failure(
        &mut self,
        error_code: Option<String>,
        error_description: Option<String>,
        failure_reason: &str,
        now: DateTime<Utc>,
    ) {
        let retry_attempt = self.error_details.as_ref().map(|e| e.retry_attempt).unwrap_or(0);
        self.error_details = Some(ErrorDetails {
            error_code,
            error_description,
            failure_reason: Some(failure_reason.to_string()),
            retry_attempt,
        });
        self.set_status(PaymentLogStatus::Failed, now);
    }

    pub fn track_retry(&mut self, now: DateTime<Utc>) -> u32 {
        let details = self.error_details.get_or_insert_with(|| ErrorDetails {
            error_code: None,
            error_description: None,
            failure_reason: None,
            retry_attempt: 0,
        });
        details.retry_attempt += 1;
        let attempt = details.retry_attempt;
        self.timestamps.updated_at = now;
        attempt
    }

    pub fn record_gateway_payment(&mut self, payment_id: Option<&str>, method: Option<&str>, now: DateTime<Utc>) {
        if let Some(id) = payment_id {
            self.razorpay_payment_id = Some(id.to_string());
        }
        if let Some(m) = method {
            self.payment_method = Some(m.to_string());
        }
        self.timestamps.updated_at = now;
    }

    pub fn record_client_confirmation(&mut self, payment_id: &str, signature: &str, now: DateTime<Utc>) {
        self.razorpay_payment_id = Some(payment_id.to_string());
        self.razorpay_signature = Some(signature.to_string());
        self.timestamps.updated_at = now;
    }
}
