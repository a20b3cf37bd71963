//! Request extraction helpers shared by the route handlers.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{FromRequestParts, Multipart};
use axum::http::request::Parts;

use teeshop_core::query::QueryParams;

use crate::error::AppError;
use crate::services::Upload;

/// The raw query string as [`QueryParams`], comparator keys included.
///
/// `?price[gt]=10&category=hoodies` keeps the bracketed key intact, which
/// `axum::extract::Query` with a flat map would not.
#[derive(Debug)]
pub struct ListingParams(pub QueryParams);

impl<S> FromRequestParts<S> for ListingParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        let pairs = url::form_urlencoded::parse(raw.as_bytes());
        Ok(Self(QueryParams::from_pairs(pairs)?))
    }
}

/// Parse a path identifier, naming `what` in the error.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if `raw` is not a positive integer.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {what} id: {raw}")))
}

/// A decoded `multipart/form-data` body: text fields plus uploaded files.
#[derive(Debug, Default)]
pub struct FormParts {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

impl FormParts {
    /// Drain a multipart body.
    ///
    /// Parts with a file name are files; empty files are dropped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                if !bytes.is_empty() {
                    form.files.push((
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid field {name}: {e}")))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// A text field, if present and not blank.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A required text field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the field if it is missing.
    pub fn required(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// Take every uploaded file sent under `name`, in order.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|(n, _)| n == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }

    /// Take the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;
    use teeshop_core::ProductId;
    use teeshop_core::query::ParamValue;

    use super::*;

    async fn listing(uri: &str) -> Result<QueryParams, AppError> {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ListingParams::from_request_parts(&mut parts, &()).await.map(|p| p.0)
    }

    #[tokio::test]
    async fn test_comparator_keys_survive() {
        let params = listing("/products?price%5Bgt%5D=10&price[lte]=50&category=hoodies")
            .await
            .unwrap();
        let Some(ParamValue::Comparators(price)) = params.get("price") else {
            panic!("price should carry comparators");
        };
        assert_eq!(price.get("gt").unwrap(), "10");
        assert_eq!(price.get("lte").unwrap(), "50");
        assert_eq!(
            params.get("category"),
            Some(&ParamValue::Scalar("hoodies".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_search_is_decoded() {
        let params = listing("/products?search=classic+tee").await.unwrap();
        assert_eq!(
            params.get("search"),
            Some(&ParamValue::Scalar("classic tee".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_conflicting_values_rejected() {
        assert!(listing("/products?page=1&page=2").await.is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id::<ProductId>("7", "product").unwrap(), ProductId::new(7));
        assert!(parse_id::<ProductId>("0", "product").is_err());
        assert!(parse_id::<ProductId>("abc", "product").is_err());
    }
}
