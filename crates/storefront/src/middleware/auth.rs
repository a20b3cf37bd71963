//! Credential and role middleware.
//!
//! [`require_account`] runs the credential verifier and attaches the
//! resolved [`Account`] to the request extensions. [`require_role`] reads it
//! back and applies a [`RoleGate`]. Layer the verifier outside the gate:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/admin/orders", get(list_orders))
//!     .route_layer(from_fn_with_state(RoleGate::admin(), require_role))
//!     .route_layer(from_fn_with_state(verifier, require_account::<PgPool>));
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use teeshop_core::RoleGate;

use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::services::auth::{AccountLookup, AuthError, CredentialVerifier};

/// Verify the request credential and attach its account.
///
/// # Errors
///
/// Rejects with the verifier's `AuthError` (401 or 404).
pub async fn require_account<L: AccountLookup>(
    State(verifier): State<Arc<CredentialVerifier<L>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let account = verifier.verify(request.headers()).await?;

    set_sentry_user(&account.id, Some(account.email.as_str()));
    tracing::Span::current().record("account_id", account.id.as_i32());

    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

/// Admit the request only if the attached account's role passes `gate`.
///
/// # Errors
///
/// Rejects with `Unauthenticated` if no account is attached and with
/// `Forbidden` if the role is not accepted.
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let account = request
        .extensions()
        .get::<Account>()
        .ok_or(AuthError::Unauthenticated)?;

    if let Err(forbidden) = gate.check(&account.role) {
        tracing::warn!(
            account_id = %account.id,
            role = %forbidden.role,
            accepted = %forbidden.accepted,
            "role gate denied request"
        );
        return Err(AuthError::Forbidden(forbidden).into());
    }

    Ok(next.run(request).await)
}

/// Extractor for the account attached by [`require_account`].
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(CurrentAccount(account): CurrentAccount) -> Json<Account> {
///     Json(account)
/// }
/// ```
pub struct CurrentAccount(pub Account);

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Account>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AuthError::Unauthenticated.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        middleware::from_fn_with_state,
        routing::get,
    };
    use chrono::Utc;
    use secrecy::SecretString;
    use teeshop_core::{AccountId, Email, ImageRef, Role};
    use tower::ServiceExt;

    use super::*;
    use crate::db::RepositoryError;
    use crate::services::auth::TokenKeys;

    struct MemoryLookup(HashMap<AccountId, Account>);

    impl AccountLookup for MemoryLookup {
        async fn find_account(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    fn account(id: i32, role: &str) -> Account {
        Account {
            id: AccountId::new(id),
            name: format!("account {id}"),
            email: Email::parse(&format!("a{id}@example.com")).unwrap(),
            role: Role::parse(role).unwrap(),
            photo: ImageRef {
                id: format!("users/{id}"),
                secure_url: format!("https://img.test/{id}.jpg"),
            },
            created_at: Utc::now(),
        }
    }

    fn verifier() -> Arc<CredentialVerifier<MemoryLookup>> {
        let keys = TokenKeys::new(&SecretString::from("middleware-test-k3y-0123456789abc"), 1);
        let accounts = HashMap::from([
            (AccountId::new(1), account(1, Role::USER)),
            (AccountId::new(2), account(2, Role::ADMIN)),
            (AccountId::new(3), account(3, Role::MANAGER)),
        ]);
        Arc::new(CredentialVerifier::new(keys, MemoryLookup(accounts)))
    }

    async fn whoami(CurrentAccount(account): CurrentAccount) -> String {
        account.name
    }

    fn app(verifier: Arc<CredentialVerifier<MemoryLookup>>) -> Router {
        let open = Router::new().route("/me", get(whoami));
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn_with_state(RoleGate::admin(), require_role));

        open.merge(admin)
            .route_layer(from_fn_with_state(verifier, require_account::<MemoryLookup>))
    }

    async fn call(app: Router, path: &str, token: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_no_credential_is_401() {
        assert_eq!(call(app(verifier()), "/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call(app(verifier()), "/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_401() {
        let status = call(app(verifier()), "/me", Some("not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_gate_denies_user_and_manager() {
        let v = verifier();
        for id in [1, 3] {
            let token = v.keys().issue(AccountId::new(id)).unwrap();
            let status = call(app(Arc::clone(&v)), "/admin", Some(&token)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_gate_admits_admin() {
        let v = verifier();
        let token = v.keys().issue(AccountId::new(2)).unwrap();
        assert_eq!(call(app(Arc::clone(&v)), "/admin", Some(&token)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_any_role_passes_ungated_route() {
        let v = verifier();
        let token = v.keys().issue(AccountId::new(1)).unwrap();
        assert_eq!(call(app(Arc::clone(&v)), "/me", Some(&token)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gate_without_verifier_fails_closed() {
        let app = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn_with_state(RoleGate::admin(), require_role));
        assert_eq!(call(app, "/admin", None).await, StatusCode::UNAUTHORIZED);
    }
}
