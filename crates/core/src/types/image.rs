//! References to images held by the media host.

use serde::{Deserialize, Serialize};

/// An uploaded image: the media host's public id plus its HTTPS URL.
///
/// The id is what the media host needs to release the image again; the URL
/// is what clients render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Media-host public id (e.g. `products/abc123`).
    pub id: String,
    /// Public HTTPS URL.
    pub secure_url: String,
}
