//! Payment-intent creation against Stripe and Razorpay.
//!
//! Only the first step of a checkout happens here: creating the
//! processor-side intent whose secret or order id the client then completes
//! against the processor directly.

use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{RazorpayConfig, StripeConfig};

const STRIPE_BASE_URL: &str = "https://api.stripe.com/v1";
const RAZORPAY_BASE_URL: &str = "https://api.razorpay.com/v1";

/// Stripe charges in rupees.
const STRIPE_CURRENCY: &str = "inr";
const RAZORPAY_CURRENCY: &str = "INR";

const RECEIPT_BYTES: usize = 20;

/// Errors from the payment processors.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Amount is not a positive number of minor units.
    #[error("amount must be a positive integer in paise")]
    InvalidAmount,
}

/// A created Stripe `PaymentIntent`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeIntent {
    pub id: String,
    pub client_secret: String,
}

/// A created Razorpay order, passed through to the client as returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct RazorpayOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
}

/// Client for both payment processors.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    stripe_base: String,
    stripe_secret: SecretString,
    razorpay_base: String,
    razorpay_key_id: String,
    razorpay_secret: SecretString,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(stripe: &StripeConfig, razorpay: &RazorpayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            stripe_base: STRIPE_BASE_URL.to_owned(),
            stripe_secret: stripe.secret_key.clone(),
            razorpay_base: RAZORPAY_BASE_URL.to_owned(),
            razorpay_key_id: razorpay.key_id.clone(),
            razorpay_secret: razorpay.key_secret.clone(),
        })
    }

    /// Create a Stripe `PaymentIntent` for `amount` paise.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for a non-positive amount and
    /// `PaymentError::Api` if Stripe rejects the request.
    pub async fn create_stripe_intent(&self, amount: i64) -> Result<StripeIntent, PaymentError> {
        check_amount(amount)?;

        let form = [
            ("amount", amount.to_string()),
            ("currency", STRIPE_CURRENCY.to_owned()),
            (
                "metadata[integration_check]",
                "accept_a_payment".to_owned(),
            ),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.stripe_base))
            .bearer_auth(self.stripe_secret.expose_secret())
            .form(&form)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Create a Razorpay order for `amount` paise with a random receipt.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` for a non-positive amount and
    /// `PaymentError::Api` if Razorpay rejects the request.
    pub async fn create_razorpay_order(&self, amount: i64) -> Result<RazorpayOrder, PaymentError> {
        check_amount(amount)?;

        let body = RazorpayOrderRequest {
            amount,
            currency: RAZORPAY_CURRENCY,
            receipt: random_receipt(),
        };

        let response = self
            .client
            .post(format!("{}/orders", self.razorpay_base))
            .basic_auth(
                &self.razorpay_key_id,
                Some(self.razorpay_secret.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        parse_response(response).await
    }
}

const fn check_amount(amount: i64) -> Result<(), PaymentError> {
    if amount <= 0 {
        return Err(PaymentError::InvalidAmount);
    }
    Ok(())
}

fn random_receipt() -> String {
    let mut bytes = [0u8; RECEIPT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}
