//! Services behind the route handlers.
//!
//! - `auth` - passwords, credential tokens, reset tokens, the credential verifier
//! - `email` - transactional mail (password reset)
//! - `media` - Cloudinary image storage
//! - `payments` - Stripe and Razorpay payment intents

pub mod auth;
pub mod email;
pub mod media;
pub mod payments;

pub use auth::{AuthError, AuthService, CredentialVerifier};
pub use email::{EmailError, EmailService};
pub use media::{MediaClient, MediaError, MediaFolder, Upload};
pub use payments::{PaymentClient, PaymentError};
