//! Seed the catalog from a YAML file.
//!
//! Photos must already be hosted; the file records their public ids and
//! URLs.
//!
//! ```yaml
//! - name: Classic Tee
//!   price: "499.00"
//!   description: Heavyweight cotton crew neck
//!   category: shortsleeves
//!   stock: 25
//!   brand: Teeshop
//!   photos:
//!     - id: products/classic-tee
//!       secure_url: https://res.cloudinary.com/teeshop/classic-tee.jpg
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use teeshop_core::{Category, Email, ImageRef, Price};
use teeshop_storefront::db::{AccountRepository, ProductRepository};
use teeshop_storefront::models::NewProduct;
use teeshop_storefront::models::product::validate_name;

use super::connect;

/// One catalog entry as written in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: Category,
    pub stock: i32,
    pub brand: String,
    #[serde(default)]
    pub photos: Vec<ImageRef>,
}

impl SeedProduct {
    /// Validate the entry into a [`NewProduct`].
    fn to_new_product(&self) -> Result<NewProduct, String> {
        if self.stock < 0 {
            return Err("stock must be 0 or more".to_owned());
        }
        Ok(NewProduct {
            name: validate_name(&self.name)?,
            price: Price::parse(&self.price).map_err(|e| format!("price: {e}"))?,
            description: self.description.clone(),
            category: self.category,
            stock: self.stock,
            brand: self.brand.clone(),
        })
    }
}

/// Validated products with their photos, plus one message per rejected entry.
type ParsedCatalog = (Vec<(NewProduct, Vec<ImageRef>)>, Vec<String>);

/// Parse and validate a seed file's contents.
fn parse_catalog(content: &str) -> Result<ParsedCatalog, serde_yaml::Error> {
    let entries: Vec<SeedProduct> = serde_yaml::from_str(content)?;
    let mut valid = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match entry.to_new_product() {
            Ok(product) => valid.push((product, entry.photos)),
            Err(e) => errors.push(format!("entry {index} ({}): {e}", entry.name)),
        }
    }
    Ok((valid, errors))
}

/// Insert every product listed in `file_path`, owned by `owner`.
///
/// Validates the whole file before touching the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, the owner does not exist, or an insert fails.
pub async fn catalog(file_path: &str, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let (products, errors) = parse_catalog(&content)?;

    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }
    info!(products = products.len(), "Catalog validated successfully");

    let owner = Email::parse(owner)?;
    let pool = connect().await?;
    let account = AccountRepository::new(&pool)
        .get_by_email(&owner)
        .await?
        .ok_or_else(|| format!("No account with email {owner}"))?;

    let repo = ProductRepository::new(&pool);
    for (product, photos) in &products {
        let created = repo.create(product, photos, account.id).await?;
        info!(product_id = %created.id, name = %created.name, "Product inserted");
    }

    info!("Seeding complete! {} products inserted", products.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
- name: Classic Tee
  price: "499.00"
  description: Heavyweight cotton crew neck
  category: shortsleeves
  stock: 25
  brand: Teeshop
  photos:
    - id: products/classic-tee
      secure_url: https://res.cloudinary.com/teeshop/classic-tee.jpg
- name: Winter Hoodie
  price: "1499"
  description: Fleece lined
  category: hoodies
  stock: 0
  brand: Teeshop
"#;

    #[test]
    fn test_parse_catalog() {
        let (products, errors) = parse_catalog(CATALOG).unwrap();
        assert!(errors.is_empty());
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].0.category, Category::ShortSleeves);
        assert_eq!(products[0].1.len(), 1);
        assert!(products[1].1.is_empty());
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let yaml = r#"
- name: Bad Price
  price: "free"
  description: x
  category: hoodies
  stock: 1
  brand: Teeshop
- name: Negative Stock
  price: "10"
  description: x
  category: hoodies
  stock: -3
  brand: Teeshop
"#;
        let (products, errors) = parse_catalog(yaml).unwrap();
        assert!(products.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("price"));
    }

    #[test]
    fn test_unknown_category_fails_parse() {
        let yaml = "- {name: X, price: '1', description: x, category: socks, stock: 1, brand: B}";
        assert!(parse_catalog(yaml).is_err());
    }
}
