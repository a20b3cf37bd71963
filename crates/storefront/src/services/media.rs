//! Cloudinary client for account and product images.
//!
//! Uploads and deletions are signed requests: the parameters (minus `file`,
//! `api_key` and `resource_type`) are sorted by name, joined as
//! `k=v&k=v`, suffixed with the API secret and hashed with SHA-256. The
//! Cloudinary account must have SHA-256 signatures enabled.

use std::collections::BTreeMap;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use teeshop_core::ImageRef;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Where an upload goes and how it is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    /// Account avatars, scaled to 150px wide.
    Users,
    /// Product photos, stored as uploaded.
    Products,
}

impl MediaFolder {
    const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Products => "products",
        }
    }

    fn upload_params(self) -> Vec<(&'static str, String)> {
        let mut params = vec![("folder", self.name().to_owned())];
        if self == Self::Users {
            params.push(("width", "150".to_owned()));
            params.push(("crop", "scale".to_owned()));
        }
        params
    }
}

/// An uploaded file as received from a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Errors that can occur when talking to Cloudinary.
#[derive(Debug, Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct MediaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: SecretString,
}

impl MediaClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{BASE_URL}/{}", config.cloud_name),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// Upload an image into `folder`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response is malformed.
    pub async fn upload(&self, upload: Upload, folder: MediaFolder) -> Result<ImageRef, MediaError> {
        let mut params = folder.upload_params();
        params.push(("timestamp", Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, self.api_secret.expose_secret());

        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type {
            part = part
                .mime_str(&content_type)
                .map_err(|e| MediaError::Parse(format!("invalid content type: {e}")))?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(format!("{}/image/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        tracing::debug!(public_id = %uploaded.public_id, "image uploaded");
        Ok(ImageRef {
            id: uploaded.public_id,
            secure_url: uploaded.secure_url,
        })
    }

    /// Delete an image by its public id.
    ///
    /// A missing image is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let params = vec![
            ("public_id", public_id.to_owned()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let signature = sign_params(&params, self.api_secret.expose_secret());

        let mut form: Vec<(&str, String)> = params;
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));

        let response = self
            .client
            .post(format!("{}/image/destroy", self.base_url))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;
        if destroyed.result != "ok" && destroyed.result != "not found" {
            return Err(MediaError::Api {
                status: status.as_u16(),
                message: destroyed.result,
            });
        }
        Ok(())
    }

    /// Delete several images, logging failures instead of returning them.
    ///
    /// Used after the owning row is already gone, when a failure can only
    /// leave an orphaned file behind.
    pub async fn destroy_all<'i>(&self, images: impl IntoIterator<Item = &'i ImageRef>) {
        for image in images {
            if let Err(e) = self.destroy(&image.id).await {
                tracing::warn!(public_id = %image.id, error = %e, "failed to release image");
            }
        }
    }
}

/// Compute the request signature for `params`.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let sorted: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(key, _)| !matches!(*key, "file" | "api_key" | "resource_type" | "cloud_name"))
        .map(|(key, value)| (*key, value.as_str()))
        .collect();

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{to_sign}{api_secret}").as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_and_excludes() {
        let params = vec![
            ("timestamp", "1315060510".to_owned()),
            ("public_id", "sample_image".to_owned()),
            ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_owned()),
            ("api_key", "1234".to_owned()),
        ];
        let expected = hex::encode(Sha256::digest(
            b"eager=w_400,h_300,c_pad|w_260,h_200,c_crop&public_id=sample_image&timestamp=1315060510abcd",
        ));
        assert_eq!(sign_params(&params, "abcd"), expected);
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = vec![("b", "2".to_owned()), ("a", "1".to_owned())];
        let b = vec![("a", "1".to_owned()), ("b", "2".to_owned())];
        assert_eq!(sign_params(&a, "s"), sign_params(&b, "s"));
        assert_ne!(sign_params(&a, "s"), sign_params(&a, "t"));
    }

    #[test]
    fn test_avatar_params_scale_to_150() {
        let params = MediaFolder::Users.upload_params();
        assert!(params.contains(&("folder", "users".to_owned())));
        assert!(params.contains(&("width", "150".to_owned())));
        assert!(params.contains(&("crop", "scale".to_owned())));
        assert_eq!(MediaFolder::Products.upload_params().len(), 1);
    }
}
