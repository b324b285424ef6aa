use crate::domain::cart::ShippingPolicy;
use crate::domain::checkout::{
    validate_customer, CheckoutError, CheckoutItem, CreateOrderRequest, CreateOrderResponse,
    GatewayOrderView, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::domain::ids;
use crate::domain::order::{Order, OrderSummary};
use crate::domain::payment::{bad_request, err, internal, ErrorEnvelope};
use crate::domain::payment_log::{NewPaymentLog, OrderReference, PaymentLog};
use crate::gateways::{to_minor_units, GatewayOrderRequest, PaymentGateway, CURRENCY_INR};
use crate::repo::{Ledger, PaymentLogStore};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

type Rejection = (StatusCode, ErrorEnvelope);

#[derive(Clone)]
pub struct CheckoutService {
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn Ledger>,
    pub payment_logs: Arc<dyn PaymentLogStore>,
    pub shipping: ShippingPolicy,
}

impl CheckoutService {
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<CreateOrderResponse, Rejection> {
        let (amount, customer, items) = match (req.amount, req.customer_details, req.cart_items) {
            (Some(a), Some(c), Some(i)) => (a, c, i),
            _ => {
                return Err(bad_request(
                    "MISSING_FIELDS",
                    "amount, customerDetails and cartItems are required",
                ))
            }
        };
        if !amount.is_finite() || amount <= 0.0 {
            return Err(bad_request("INVALID_AMOUNT", "amount must be greater than 0"));
        }
        if items.is_empty() {
            return Err(bad_request("EMPTY_CART", "cartItems must not be empty"));
        }
        if let Err(CheckoutError(fields)) = validate_customer(&customer) {
            let mut body = err("INVALID_CUSTOMER_DETAILS", "customer details are incomplete");
            body.details = Some(json!(fields));
            return Err((StatusCode::BAD_REQUEST, body));
        }

        let summary = self.summarize(&items);
        if (summary.total - amount).abs() > 0.005 {
            tracing::warn!(
                client_amount = amount,
                derived_total = summary.total,
                "checkout amount differs from cart total"
            );
        }

        let now = chrono::Utc::now();
        let receipt = ids::receipt(now);
        let gateway_order = self
            .gateway
            .create_order(GatewayOrderRequest {
                amount_minor: to_minor_units(amount),
                currency: CURRENCY_INR.to_string(),
                receipt: receipt.clone(),
                notes: json!({
                    "customer_name": customer.name,
                    "customer_email": customer.email,
                }),
            })
            .await
            .map_err(|e| {
                tracing::error!(gateway = self.gateway.name(), error = %e, "gateway order creation failed");
                internal(e.context("failed to create payment order"))
            })?;

        let order = Order::place(
            customer.clone(),
            items.clone(),
            summary,
            gateway_order.id.clone(),
            amount,
            now,
        );
        let log = PaymentLog::initiated(
            NewPaymentLog {
                order_reference: OrderReference {
                    order_id: order.order_id.clone(),
                    order_number: gateway_order.receipt.clone(),
                },
                razorpay_order_id: gateway_order.id.clone(),
                amount,
                currency: gateway_order.currency.clone(),
                customer_email: customer.email.clone(),
                customer_phone: customer.phone.clone(),
            },
            now,
        );

        // The gateway order already exists; losing local bookkeeping must not block payment.
        match self.ledger.record_checkout(&order, &log).await {
            Ok(()) => tracing::info!(
                order_id = %order.order_id,
                transaction_id = %log.transaction_id,
                gateway_order_id = %gateway_order.id,
                "checkout recorded"
            ),
            Err(e) => tracing::error!(
                order_id = %order.order_id,
                gateway_order_id = %gateway_order.id,
                error = %e,
                "failed to persist order and payment log; continuing with gateway order"
            ),
        }

        Ok(CreateOrderResponse {
            success: true,
            order: GatewayOrderView {
                id: gateway_order.id,
                amount: gateway_order.amount,
                currency: gateway_order.currency,
                receipt: gateway_order.receipt,
            },
            order_id: order.order_id,
            customer_details: customer,
            cart_items: items,
        })
    }

    /// Client-reported confirmation. Drives UX only; the webhook decides whether an order is paid.
    pub async fn verify_payment(&self, req: VerifyPaymentRequest) -> Result<VerifyPaymentResponse, Rejection> {
        let (payment_id, gateway_order_id, signature) = match (
            non_blank(req.razorpay_payment_id),
            non_blank(req.razorpay_order_id),
            non_blank(req.razorpay_signature),
        ) {
            (Some(p), Some(o), Some(s)) => (p, o, s),
            _ => {
                return Err(bad_request(
                    "MISSING_PAYMENT_FIELDS",
                    "razorpay_payment_id, razorpay_order_id and razorpay_signature are required",
                ))
            }
        };

        if !self
            .gateway
            .verify_payment_signature(&gateway_order_id, &payment_id, &signature)
        {
            tracing::warn!(
                gateway_order_id = %gateway_order_id,
                payment_id = %payment_id,
                order_id = req.order_id.as_deref().unwrap_or("-"),
                "checkout signature mismatch"
            );
            return Err(bad_request("INVALID_SIGNATURE", "payment verification failed"));
        }

        match self
            .payment_logs
            .record_client_confirmation(&gateway_order_id, &payment_id, &signature)
            .await
        {
            Ok(Some(log)) => tracing::info!(
                transaction_id = %log.transaction_id,
                payment_id = %payment_id,
                "client payment confirmation recorded"
            ),
            Ok(None) => tracing::warn!(gateway_order_id = %gateway_order_id, "no payment log for verified payment"),
            Err(e) => tracing::error!(gateway_order_id = %gateway_order_id, error = %e, "failed to record payment confirmation"),
        }

        Ok(VerifyPaymentResponse {
            success: true,
            message: "Payment verified successfully".to_string(),
            payment_id,
        })
    }

    pub fn summarize(&self, items: &[CheckoutItem]) -> OrderSummary {
        let subtotal: f64 = items.iter().map(|i| i.price * i.quantity as f64).sum();
        let totals = self.shipping.totals(subtotal);
        OrderSummary {
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            total: totals.total,
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}
