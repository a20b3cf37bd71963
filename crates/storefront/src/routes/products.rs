//! Catalog route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::Deserialize;
use serde_json::json;

use teeshop_core::query::{QueryPlan, QueryShaper};
use teeshop_core::reviews::Review;
use teeshop_core::{Category, ImageRef, Price, ProductId};

use super::extract::{FormParts, ListingParams, parse_id};
use crate::db::{CatalogQuery, ProductRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CurrentAccount;
use crate::models::product::validate_name;
use crate::models::{NewProduct, ProductChanges};
use crate::services::{MediaFolder, Upload};
use crate::state::AppState;

/// Products per page on the public listing.
pub const PRODUCTS_PER_PAGE: u32 = 6;

/// Field free-text search runs against.
const DISPLAY_FIELD: &str = "name";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: ProductId,
    pub rating: i64,
    pub comment: String,
}

// =============================================================================
// Public handlers
// =============================================================================

/// `GET /products`: search, filter and page the catalog.
///
/// `count` is the number of products on the returned page.
pub async fn list(
    State(state): State<AppState>,
    ListingParams(params): ListingParams,
) -> Result<Json<serde_json::Value>> {
    let plan = QueryShaper::new(QueryPlan::all(DISPLAY_FIELD), params)
        .search()
        .filter()?
        .pager(PRODUCTS_PER_PAGE)?
        .into_query();
    let query = CatalogQuery::compile(&plan)?;

    let products = ProductRepository::new(state.pool())
        .list_shaped(&query)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "products": products,
    })))
}

/// `GET /product/{id}`.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `GET /getReviews/{productId}`.
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let reviews = ProductRepository::new(state.pool()).reviews(id).await?;
    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

// =============================================================================
// Signed-in handlers
// =============================================================================

/// `PUT /postReview`: add or replace the caller's review.
pub async fn post_review(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<serde_json::Value>> {
    let review = Review::new(account.id, account.name.clone(), body.rating, &body.comment)?;
    let set = ProductRepository::new(state.pool())
        .upsert_review(body.product_id, review)
        .await?;

    add_breadcrumb(
        "review",
        "Review saved",
        Some(&[("product_id", &body.product_id.to_string())]),
    );
    Ok(Json(json!({
        "success": true,
        "message": "Review added successfully",
        "ratings": set.ratings,
        "numberOfReviews": set.number_of_reviews,
    })))
}

/// `PUT /deleteReview/{productId}`: remove the caller's review.
pub async fn delete_review(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let set = ProductRepository::new(state.pool())
        .remove_review(id, account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("review".to_owned()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Review deleted successfully",
        "ratings": set.ratings,
        "numberOfReviews": set.number_of_reviews,
    })))
}

// =============================================================================
// Administration
// =============================================================================

/// `GET /admin/products`: every product, unpaginated.
pub async fn admin_list(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// `POST /admin/product/add` (multipart with one or more `photos`).
pub async fn admin_create(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut form = FormParts::read(multipart).await?;
    let uploads = form.take_files("photos");
    if uploads.is_empty() {
        return Err(AppError::BadRequest(
            "images are required to be uploaded".to_owned(),
        ));
    }
    let new = new_product(&form)?;

    let photos = upload_photos(&state, uploads).await?;
    let product = match ProductRepository::new(state.pool())
        .create(&new, &photos, account.id)
        .await
    {
        Ok(product) => product,
        Err(e) => {
            state.media().destroy_all(&photos).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product.id, account_id = %account.id, "product created");
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `PUT /admin/product/{id}` (multipart; photos replaced only when sent).
pub async fn admin_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let mut form = FormParts::read(multipart).await?;
    let uploads = form.take_files("photos");
    let mut changes = product_changes(&form)?;

    let photos = if uploads.is_empty() {
        None
    } else {
        Some(upload_photos(&state, uploads).await?)
    };
    changes.photos.clone_from(&photos);

    if changes.is_empty() {
        return Err(AppError::BadRequest("nothing to update".to_owned()));
    }

    let (product, replaced) = match ProductRepository::new(state.pool())
        .update(id, &changes)
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            state.media().destroy_all(photos.iter().flatten()).await;
            return Err(e.into());
        }
    };
    state.media().destroy_all(&replaced).await;

    tracing::info!(product_id = %id, "product updated");
    Ok(Json(json!({ "success": true, "product": product })))
}

/// `DELETE /admin/product/{id}`: also releases every photo.
pub async fn admin_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = ProductRepository::new(state.pool()).delete(id).await?;
    state.media().destroy_all(&product.photos).await;

    tracing::info!(product_id = %id, "product deleted");
    Ok(Json(json!({ "success": true, "message": "Product deleted" })))
}

// =============================================================================
// Form parsing
// =============================================================================

async fn upload_photos(state: &AppState, uploads: Vec<Upload>) -> Result<Vec<ImageRef>> {
    let mut photos = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match state.media().upload(upload, MediaFolder::Products).await {
            Ok(image) => photos.push(image),
            Err(e) => {
                state.media().destroy_all(&photos).await;
                return Err(e.into());
            }
        }
    }
    Ok(photos)
}

fn parse_price(raw: &str) -> Result<Price> {
    Price::parse(raw).map_err(|e| AppError::BadRequest(format!("price: {e}")))
}

fn parse_category(raw: &str) -> Result<Category> {
    raw.parse().map_err(AppError::BadRequest)
}

fn parse_stock(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|stock| *stock >= 0)
        .ok_or_else(|| AppError::BadRequest("stock must be a whole number, 0 or more".to_owned()))
}

fn new_product(form: &FormParts) -> Result<NewProduct> {
    Ok(NewProduct {
        name: validate_name(form.required("name")?).map_err(AppError::BadRequest)?,
        price: parse_price(form.required("price")?)?,
        description: form.required("description")?.to_owned(),
        category: parse_category(form.required("category")?)?,
        stock: parse_stock(form.required("stock")?)?,
        brand: form.required("brand")?.to_owned(),
    })
}

fn product_changes(form: &FormParts) -> Result<ProductChanges> {
    Ok(ProductChanges {
        name: form
            .text("name")
            .map(validate_name)
            .transpose()
            .map_err(AppError::BadRequest)?,
        price: form.text("price").map(parse_price).transpose()?,
        description: form.text("description").map(str::to_owned),
        category: form.text("category").map(parse_category).transpose()?,
        stock: form.text("stock").map(parse_stock).transpose()?,
        brand: form.text("brand").map(str::to_owned),
        photos: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_parsing() {
        assert_eq!(parse_stock(" 12 ").unwrap(), 12);
        assert_eq!(parse_stock("0").unwrap(), 0);
        assert!(parse_stock("-1").is_err());
        assert!(parse_stock("lots").is_err());
    }

    #[test]
    fn test_category_parsing_accepts_legacy_spelling() {
        assert_eq!(parse_category("shortsleves").unwrap(), Category::ShortSleeves);
        assert!(parse_category("socks").is_err());
    }

    #[test]
    fn test_review_request_shape() {
        let body: ReviewRequest = serde_json::from_value(json!({
            "productId": 4,
            "rating": 5,
            "comment": "fits well"
        }))
        .unwrap();
        assert_eq!(body.product_id, ProductId::new(4));
    }
}
