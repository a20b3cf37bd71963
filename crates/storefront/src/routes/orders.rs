//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::json;

use teeshop_core::{OrderId, OrderStatus, Role};

use super::extract::parse_id;
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CurrentAccount;
use crate::models::NewOrder;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub order_status: String,
}

/// `POST /order/create`.
pub async fn create(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<NewOrder>,
) -> Result<Json<serde_json::Value>> {
    body.validate().map_err(AppError::BadRequest)?;
    let order = OrderRepository::new(state.pool())
        .create(account.id, &body)
        .await?;

    add_breadcrumb("order", "Order placed", Some(&[("order_id", &order.id.to_string())]));
    Ok(Json(json!({ "success": true, "order": order })))
}

/// `GET /myorder`: the caller's orders.
pub async fn mine(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<serde_json::Value>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_account(account.id)
        .await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `GET /order/{id}`: visible to the placing account and administrators,
/// with the placing account embedded.
pub async fn show(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: OrderId = parse_id(&id, "order")?;
    let (order, owner) = OrderRepository::new(state.pool())
        .get_with_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if order.user != account.id && account.role.as_str() != Role::ADMIN {
        // Same answer as a missing order, so ids cannot be probed.
        return Err(AppError::NotFound(format!("order {id}")));
    }

    Ok(Json(json!({ "success": true, "order": order, "user": owner })))
}

/// `GET /admin/orders`.
pub async fn admin_list(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `PUT /admin/order/{id}`: advance the status and take items out of stock.
pub async fn admin_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let id: OrderId = parse_id(&id, "order")?;
    let next = parse_status(&body.order_status)?;

    let order = OrderRepository::new(state.pool())
        .update_status(id, next)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Order status changed to {}", order.order_status),
        "order": order,
    })))
}

/// `DELETE /admin/order/{id}`.
pub async fn admin_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: OrderId = parse_id(&id, "order")?;
    OrderRepository::new(state.pool()).delete(id).await?;

    tracing::info!(order_id = %id, "order deleted");
    Ok(Json(json!({ "success": true, "message": "Order deleted" })))
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse().map_err(AppError::BadRequest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_case_insensitive() {
        assert_eq!(parse_status("Delivered").unwrap(), OrderStatus::Delivered);
        assert_eq!(parse_status("shipped").unwrap(), OrderStatus::Shipped);
        assert!(parse_status("lost").is_err());
    }
}
