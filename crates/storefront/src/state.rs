//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::{CredentialVerifier, TokenKeys};
use crate::services::{EmailService, MediaClient, MediaError, PaymentClient, PaymentError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("media client: {0}")]
    Media(#[from] MediaError),
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
    #[error("smtp transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; built once at startup and read-only after.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    verifier: Arc<CredentialVerifier<PgPool>>,
    media: MediaClient,
    payments: PaymentClient,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the external-service clients cannot be
    /// built from the configuration.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let keys = TokenKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
        let verifier = Arc::new(CredentialVerifier::new(keys, pool.clone()));
        let media = MediaClient::new(&config.cloudinary)?;
        let payments = PaymentClient::new(&config.stripe, &config.razorpay)?;
        let email = EmailService::new(&config.email)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                verifier,
                media,
                payments,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The credential verifier, shared with the auth middleware.
    #[must_use]
    pub fn verifier(&self) -> &Arc<CredentialVerifier<PgPool>> {
        &self.inner.verifier
    }

    /// The token keys used to issue credentials.
    #[must_use]
    pub fn token_keys(&self) -> &TokenKeys {
        self.inner.verifier.keys()
    }

    /// Cloudinary client.
    #[must_use]
    pub fn media(&self) -> &MediaClient {
        &self.inner.media
    }

    /// Stripe and Razorpay client.
    #[must_use]
    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }

    /// SMTP mailer.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }
}
