//! Payment route handlers: publishable keys and payment-intent creation.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::middleware::CurrentAccount;
use crate::state::AppState;

/// Amount in the smallest currency unit (paise).
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

/// `GET /stripekey`.
pub async fn stripe_key(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "stripeKey": state.config().stripe.publishable_key,
    }))
}

/// `GET /razorpaykey`.
pub async fn razorpay_key(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "razorpayKey": state.config().razorpay.key_id,
    }))
}

/// `POST /captureStripePayment`: create a Stripe `PaymentIntent`.
pub async fn capture_stripe(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>> {
    let intent = state.payments().create_stripe_intent(body.amount).await?;

    tracing::info!(
        account_id = %account.id,
        intent_id = %intent.id,
        amount = body.amount,
        "stripe payment intent created"
    );
    Ok(Json(json!({
        "success": true,
        "client_secret": intent.client_secret,
        "amount": body.amount,
    })))
}

/// `POST /captureRazorPayPayment`: create a Razorpay order.
pub async fn capture_razorpay(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<AmountRequest>,
) -> Result<Json<serde_json::Value>> {
    let order = state.payments().create_razorpay_order(body.amount).await?;

    tracing::info!(
        account_id = %account.id,
        razorpay_order_id = %order.id,
        amount = body.amount,
        "razorpay order created"
    );
    Ok(Json(json!({
        "success": true,
        "amount": body.amount,
        "order": order,
    })))
}
