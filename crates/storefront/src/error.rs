//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; clients only ever see a
//! `{"success": false, "message": ...}` body with a generic message for
//! those.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use teeshop_core::StatusError;
use teeshop_core::query::QueryError;
use teeshop_core::reviews::ReviewError;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::db::orders::StatusChangeError;
use crate::services::auth::AuthError;
use crate::services::{EmailError, MediaError, PaymentError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or authorization failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Malformed listing parameters.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Rejected review.
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Rejected order status change.
    #[error("Order status error: {0}")]
    Status(#[from] StatusChangeError),

    /// Image host failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Payment processor failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Mail delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<StatusError> for AppError {
    fn from(err: StatusError) -> Self {
        Self::Status(StatusChangeError::Transition(err))
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const UPSTREAM_MESSAGE: &str = "External service error";

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(what) => (StatusCode::CONFLICT, what.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
        }
    }
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "Login first to access this resource".to_owned(),
        ),
        AuthError::InvalidCredential => (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token, login again".to_owned(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_owned(),
        ),
        AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "Account not found".to_owned()),
        AuthError::Forbidden(f) => (
            StatusCode::FORBIDDEN,
            format!("Role: {} is not allowed to access this resource", f.role),
        ),
        AuthError::InvalidEmail(_) => {
            (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
        }
        AuthError::AccountAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_owned(),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::ResetTokenInvalid => (
            StatusCode::BAD_REQUEST,
            "Reset password token is invalid or has expired".to_owned(),
        ),
        AuthError::Repository(err) => repository_status(err),
        AuthError::PasswordHash | AuthError::TokenSigning(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
        }
    }
}

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Query(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Review(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Status(StatusChangeError::Transition(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Status(err @ StatusChangeError::InsufficientStock { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            Self::Status(StatusChangeError::Repository(err)) => repository_status(err),
            Self::Payment(PaymentError::InvalidAmount) => (
                StatusCode::BAD_REQUEST,
                PaymentError::InvalidAmount.to_string(),
            ),
            Self::Media(_) | Self::Payment(_) | Self::Email(_) => {
                (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_owned())
            }
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated account.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for an account action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order placed", Some(&[("order_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_owned(),
                serde_json::Value::String((*value).to_owned()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use teeshop_core::{Forbidden, OrderStatus, ProductId};

    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_core_taxonomy_status_codes() {
        assert_eq!(status(AuthError::Unauthenticated.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::InvalidCredential.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::AccountNotFound.into()), StatusCode::NOT_FOUND);
        let forbidden = Forbidden {
            role: "user".to_owned(),
            accepted: "admin".to_owned(),
        };
        assert_eq!(
            status(AuthError::Forbidden(forbidden).into()),
            StatusCode::FORBIDDEN
        );
        let bad = QueryError::BadQueryParameter {
            name: "page".to_owned(),
            reason: "must be positive".to_owned(),
        };
        assert_eq!(status(bad.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_status_codes() {
        assert_eq!(status(RepositoryError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(RepositoryError::Conflict("email already exists".to_owned()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(RepositoryError::DataCorruption("x".to_owned()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_status_errors() {
        let back = OrderStatus::Shipped
            .transition_to(OrderStatus::Placed)
            .unwrap_err();
        assert_eq!(status(back.into()), StatusCode::BAD_REQUEST);

        let stock = StatusChangeError::InsufficientStock {
            product: ProductId::new(3),
            quantity: 2,
        };
        assert_eq!(status(stock.into()), StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_failures_are_bad_gateway() {
        let err = MediaError::Api {
            status: 401,
            message: "Invalid Signature".to_owned(),
        };
        assert_eq!(status(err.into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(PaymentError::InvalidAmount.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::Database(RepositoryError::DataCorruption(
            "pool exhausted at 10.0.0.3".to_owned(),
        ))
        .into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let response = AppError::BadRequest("please enter a product name".to_owned()).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "please enter a product name");
    }
}
