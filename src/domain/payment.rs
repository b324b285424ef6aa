use serde::{Deserialize, Serialize};

/// Payment state as tracked on the order document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Finer-grained payment attempt state kept on the payment log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentLogStatus {
    NotInitiated,
    Initiated,
    Pending,
    Success,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitiated => "not_initiated",
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_initiated" => Some(Self::NotInitiated),
            "initiated" => Some(Self::Initiated),
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub fn err(code: &str, message: &str) -> ErrorEnvelope {
    ErrorEnvelope {
        success: false,
        error: message.to_string(),
        code: code.to_string(),
        details: None,
    }
}

pub fn internal(e: anyhow::Error) -> (axum::http::StatusCode, ErrorEnvelope) {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        err("INTERNAL_ERROR", &e.to_string()),
    )
}

pub fn bad_request(code: &str, message: &str) -> (axum::http::StatusCode, ErrorEnvelope) {
    (axum::http::StatusCode::BAD_REQUEST, err(code, message))
}

/// Malformed or incomplete JSON bodies answer with the same envelope as validation failures.
pub fn rejected_body(rejection: &axum::extract::rejection::JsonRejection) -> (axum::http::StatusCode, ErrorEnvelope) {
    bad_request("INVALID_REQUEST", &rejection.body_text())
}
