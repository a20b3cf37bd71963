//! Catalog item domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use teeshop_core::reviews::Review;
use teeshop_core::{AccountId, Category, ImageRef, Price, ProductId};

/// Longest accepted product name, in characters.
pub const MAX_NAME_LENGTH: usize = 120;

/// A catalog item with its embedded reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub photos: Vec<ImageRef>,
    pub category: Category,
    pub stock: i32,
    pub brand: String,
    /// Mean review rating, `0` without reviews.
    pub ratings: f64,
    pub number_of_reviews: i32,
    pub reviews: Vec<Review>,
    /// Administrator who created the item; `None` once that account is gone.
    pub created_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for a new catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub category: Category,
    pub stock: i32,
    pub brand: String,
}

/// Partial update of a catalog item; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub stock: Option<i32>,
    pub brand: Option<String>,
    /// Replacement photo list.
    pub photos: Option<Vec<ImageRef>>,
}

impl ProductChanges {
    /// Whether the update touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.stock.is_none()
            && self.brand.is_none()
            && self.photos.is_none()
    }
}

/// Trim and validate a product name.
///
/// # Errors
///
/// Returns a client-facing message if the name is blank or too long.
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("product name is required".to_owned());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "product name must be shorter than {MAX_NAME_LENGTH} characters"
        ));
    }
    Ok(name.to_owned())
}
