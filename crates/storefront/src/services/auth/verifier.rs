//! Credential verification: bearer credential to account.

use std::future::Future;

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use cookie::Cookie;

use teeshop_core::AccountId;

use super::{AuthError, TokenKeys};
use crate::db::RepositoryError;
use crate::models::Account;

/// Name of the cookie carrying the credential token.
pub const TOKEN_COOKIE: &str = "token";

/// Finds an account by id.
///
/// Implemented by the connection pool in production and by in-memory maps
/// in tests.
pub trait AccountLookup: Send + Sync + 'static {
    /// Look up an account; `Ok(None)` if it does not exist.
    fn find_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, RepositoryError>> + Send;
}

/// Resolves the credential on a request to an [`Account`].
#[derive(Debug, Clone)]
pub struct CredentialVerifier<L> {
    keys: TokenKeys,
    lookup: L,
}

impl<L: AccountLookup> CredentialVerifier<L> {
    #[must_use]
    pub const fn new(keys: TokenKeys, lookup: L) -> Self {
        Self { keys, lookup }
    }

    /// The signing keys.
    #[must_use]
    pub const fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Verify the credential carried by `headers` and load its account.
    ///
    /// The `token` cookie wins over an `Authorization: Bearer` header.
    ///
    /// # Errors
    ///
    /// - `AuthError::Unauthenticated` if no credential is present
    /// - `AuthError::InvalidCredential` if it fails signature or expiry checks
    /// - `AuthError::AccountNotFound` if the account no longer exists
    /// - `AuthError::Repository` if the lookup fails
    pub async fn verify(&self, headers: &HeaderMap) -> Result<Account, AuthError> {
        let token = credential_from_headers(headers).ok_or(AuthError::Unauthenticated)?;
        let claims = self.keys.verify(&token)?;
        self.lookup
            .find_account(claims.id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }
}

/// Extract the bearer credential: `token` cookie first, then the
/// `Authorization` header with its `Bearer ` prefix stripped.
#[must_use]
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == TOKEN_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_owned());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::http::HeaderValue;
    use chrono::Utc;
    use secrecy::SecretString;
    use teeshop_core::{Email, ImageRef, Role};

    use super::*;

    const SECRET: &str = "verifier-test-k3y-0123456789abcdef";

    struct MemoryLookup(HashMap<AccountId, Account>);

    impl AccountLookup for MemoryLookup {
        async fn find_account(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    fn account(id: i32) -> Account {
        Account {
            id: AccountId::new(id),
            name: format!("user {id}"),
            email: Email::parse(&format!("u{id}@example.com")).unwrap(),
            role: Role::user(),
            photo: ImageRef {
                id: format!("users/{id}"),
                secure_url: format!("https://img.test/{id}.jpg"),
            },
            created_at: Utc::now(),
        }
    }

    fn verifier() -> CredentialVerifier<MemoryLookup> {
        let keys = TokenKeys::new(&SecretString::from(SECRET), 1);
        let accounts = HashMap::from([(AccountId::new(1), account(1))]);
        CredentialVerifier::new(keys, MemoryLookup(accounts))
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let h = headers(&[
            ("cookie", "theme=dark; token=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(credential_from_headers(&h).unwrap(), "from-cookie");
    }

    #[test]
    fn test_header_fallback() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(credential_from_headers(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let h = headers(&[("cookie", "token="), ("authorization", "Bearer xyz")]);
        assert_eq!(credential_from_headers(&h).unwrap(), "xyz");
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(credential_from_headers(&h).is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_is_unauthenticated() {
        let result = verifier().verify(&HeaderMap::new()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_bad_signature_is_invalid_credential() {
        let other = TokenKeys::new(&SecretString::from("some-other-k3y-fedcba9876543210"), 1);
        let token = other.issue(AccountId::new(1)).unwrap();
        let h = headers(&[("authorization", &format!("Bearer {token}"))]);
        let result = verifier().verify(&h).await;
        assert!(matches!(result, Err(AuthError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_unknown_account_fails_closed() {
        let v = verifier();
        let token = v.keys().issue(AccountId::new(99)).unwrap();
        let h = headers(&[("authorization", &format!("Bearer {token}"))]);
        assert!(matches!(v.verify(&h).await, Err(AuthError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_valid_cookie_resolves_account() {
        let v = verifier();
        let token = v.keys().issue(AccountId::new(1)).unwrap();
        let h = headers(&[("cookie", &format!("token={token}"))]);
        let account = v.verify(&h).await.unwrap();
        assert_eq!(account.id, AccountId::new(1));
    }
}
