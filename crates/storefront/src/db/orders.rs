//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use teeshop_core::{AccountId, OrderId, OrderStatus, Price, ProductId, StatusError};

use super::{AccountRepository, RepositoryError};
use crate::models::{Account, NewOrder, Order, OrderItem, PaymentInfo, ShippingInfo};

const ORDER_COLUMNS: &str = "id, account_id, shipping_info, order_items, payment_info, \
                             tax_amount, shipping_amount, total_amount, order_status, \
                             delivered_at, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    account_id: AccountId,
    shipping_info: Json<ShippingInfo>,
    order_items: Json<Vec<OrderItem>>,
    payment_info: Json<PaymentInfo>,
    tax_amount: Price,
    shipping_amount: Price,
    total_amount: Price,
    order_status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            shipping_info: row.shipping_info.0,
            order_items: row.order_items.0,
            payment_info: row.payment_info.0,
            tax_amount: row.tax_amount,
            shipping_amount: row.shipping_amount,
            total_amount: row.total_amount,
            order_status: row.order_status,
            user: row.account_id,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        }
    }
}

/// Failure of an order status change.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    /// The requested status is not a forward move.
    #[error(transparent)]
    Transition(#[from] StatusError),

    /// A line item asks for more than the product has in stock, or the
    /// product is gone.
    #[error("not enough stock for product {product} (needs {quantity})")]
    InsufficientStock { product: ProductId, quantity: i32 },

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a placed order for `account`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        account: AccountId,
        new: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (account_id, shipping_info, order_items, payment_info,
                                tax_amount, shipping_amount, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(account)
        .bind(Json(&new.shipping_info))
        .bind(Json(&new.order_items))
        .bind(Json(&new.payment_info))
        .bind(new.tax_amount)
        .bind(new.shipping_amount)
        .bind(new.total_amount)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(order_id = %row.id, account_id = %account, "order placed");
        Ok(row.into())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Get an order together with the account that placed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the placing account is
    /// missing.
    pub async fn get_with_account(
        &self,
        id: OrderId,
    ) -> Result<Option<(Order, Account)>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let account = AccountRepository::new(self.pool)
            .get_by_id(order.user)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("order {id} has no account"))
            })?;
        Ok(Some((order, account)))
    }

    /// Orders placed by `account`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 ORDER BY id"
        ))
        .bind(account)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Every order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Move an order forward to `next` and take every line item out of
    /// stock, all in one transaction.
    ///
    /// # Errors
    ///
    /// - `StatusChangeError::Repository(NotFound)` if the order doesn't exist
    /// - `StatusChangeError::Transition` if `next` is not a forward move
    /// - `StatusChangeError::InsufficientStock` if a product cannot cover
    ///   its line item
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let (current, items) = sqlx::query_as::<_, (OrderStatus, Json<Vec<OrderItem>>)>(
            "SELECT order_status, order_items FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let next = current.transition_to(next)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET order_status = $2,
                delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN now() ELSE delivered_at END
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        for item in &items.0 {
            let updated = sqlx::query(
                "UPDATE product SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
            )
            .bind(item.product)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StatusChangeError::InsufficientStock {
                    product: item.product,
                    quantity: item.quantity,
                });
            }
        }

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current, to = %next, "order status changed");
        Ok(row.into())
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
