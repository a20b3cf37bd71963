//! Product repository.
//!
//! Photos and reviews are stored as `JSONB` on the product row. Review
//! changes lock the row, recompute the aggregate in Rust and write the list
//! and aggregate back together.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use teeshop_core::reviews::{self, Review, ReviewSet};
use teeshop_core::{AccountId, Category, ImageRef, Price, ProductId};

use super::{CatalogQuery, RepositoryError};
use crate::models::{NewProduct, Product, ProductChanges};

const PRODUCT_COLUMNS: &str = "id, name, price, description, photos, category, stock, brand, \
                               ratings, number_of_reviews, reviews, created_by, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    description: String,
    photos: Json<Vec<ImageRef>>,
    category: Category,
    stock: i32,
    brand: String,
    ratings: f64,
    number_of_reviews: i32,
    reviews: Json<Vec<Review>>,
    created_by: Option<AccountId>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            description: row.description,
            photos: row.photos.0,
            category: row.category,
            stock: row.stock,
            brand: row.brand,
            ratings: row.ratings,
            number_of_reviews: row.number_of_reviews,
            reviews: row.reviews.0,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product with its uploaded photos.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        new: &NewProduct,
        photos: &[ImageRef],
        created_by: AccountId,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO product (name, price, description, photos, category, stock, brand, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(new.price)
        .bind(&new.description)
        .bind(Json(photos))
        .bind(new.category)
        .bind(new.stock)
        .bind(&new.brand)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Every product, unpaginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Execute a compiled catalog query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shaped(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM product"));
        query.push_onto(&mut builder);

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Apply a partial update.
    ///
    /// Returns the updated product and the photos it replaced, if the photo
    /// list changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<(Product, Vec<ImageRef>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, Json<Vec<ImageRef>>>(
            "SELECT photos FROM product WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE product SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                stock = COALESCE($6, stock),
                brand = COALESCE($7, brand),
                photos = COALESCE($8, photos)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.price)
        .bind(changes.description.as_deref())
        .bind(changes.category)
        .bind(changes.stock)
        .bind(changes.brand.as_deref())
        .bind(changes.photos.as_ref().map(Json))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced = if changes.photos.is_some() {
            previous.0
        } else {
            Vec::new()
        };
        Ok((row.into(), replaced))
    }

    /// Delete a product, returning it so its photos can be released.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM product WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn reviews(&self, id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews =
            sqlx::query_scalar::<_, Json<Vec<Review>>>("SELECT reviews FROM product WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;
        Ok(reviews.0)
    }

    /// Add a review, replacing the reviewer's earlier one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn upsert_review(
        &self,
        id: ProductId,
        review: Review,
    ) -> Result<ReviewSet, RepositoryError> {
        self.mutate_reviews(id, |current| Some(reviews::upsert_review(current, review)))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Remove the review left by `user`.
    ///
    /// Returns `None` if `user` had not reviewed the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn remove_review(
        &self,
        id: ProductId,
        user: AccountId,
    ) -> Result<Option<ReviewSet>, RepositoryError> {
        self.mutate_reviews(id, |current| reviews::remove_review(current, user))
            .await
    }

    async fn mutate_reviews(
        &self,
        id: ProductId,
        mutate: impl FnOnce(&[Review]) -> Option<ReviewSet> + Send,
    ) -> Result<Option<ReviewSet>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, Json<Vec<Review>>>(
            "SELECT reviews FROM product WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let Some(set) = mutate(&current.0) else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE product SET reviews = $2, ratings = $3, number_of_reviews = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(Json(&set.reviews))
        .bind(set.ratings)
        .bind(set.number_of_reviews)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(set))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn test_second_review_by_same_account_replaces_first(pool: PgPool) {
        let alice = fixtures::account(&pool, "alice@example.com").await;
        let bob = fixtures::account(&pool, "bob@example.com").await;
        let tee = fixtures::product(&pool, &alice, "Classic Tee", 5).await;
        let repo = ProductRepository::new(&pool);

        repo.upsert_review(tee.id, Review::new(alice.id, "Alice", 2, "thin").unwrap())
            .await
            .unwrap();
        repo.upsert_review(tee.id, Review::new(bob.id, "Bob", 4, "good").unwrap())
            .await
            .unwrap();
        let set = repo
            .upsert_review(tee.id, Review::new(alice.id, "Alice", 5, "grew on me").unwrap())
            .await
            .unwrap();
        assert_eq!(set.number_of_reviews, 2);
        assert!((set.ratings - 4.5).abs() < f64::EPSILON);

        let stored = repo.get(tee.id).await.unwrap().unwrap();
        assert_eq!(stored.number_of_reviews, 2);
        assert!((stored.ratings - 4.5).abs() < f64::EPSILON);
        let alices: Vec<_> = stored.reviews.iter().filter(|r| r.user == alice.id).collect();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].comment, "grew on me");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn test_remove_review_recomputes_aggregate(pool: PgPool) {
        let alice = fixtures::account(&pool, "alice@example.com").await;
        let tee = fixtures::product(&pool, &alice, "Classic Tee", 5).await;
        let repo = ProductRepository::new(&pool);

        repo.upsert_review(tee.id, Review::new(alice.id, "Alice", 3, "ok").unwrap())
            .await
            .unwrap();
        let set = repo.remove_review(tee.id, alice.id).await.unwrap().unwrap();
        assert_eq!(set.number_of_reviews, 0);
        assert!(set.ratings.abs() < f64::EPSILON);
        assert!(repo.remove_review(tee.id, alice.id).await.unwrap().is_none());
    }
}
