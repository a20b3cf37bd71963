//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teeshop_core::{AccountId, OrderId, OrderStatus, Price, ProductId};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
}

/// One line of an order, with name and price captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    pub name: String,
    pub quantity: i32,
    pub price: Price,
    pub image: String,
}

/// Processor-side payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub id: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub shipping_info: ShippingInfo,
    pub order_items: Vec<OrderItem>,
    pub payment_info: PaymentInfo,
    pub tax_amount: Price,
    pub shipping_amount: Price,
    pub total_amount: Price,
    pub order_status: OrderStatus,
    pub user: AccountId,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Order as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub shipping_info: ShippingInfo,
    pub order_items: Vec<OrderItem>,
    pub payment_info: PaymentInfo,
    pub tax_amount: Price,
    pub shipping_amount: Price,
    pub total_amount: Price,
}

impl NewOrder {
    /// Check the line items.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message if there are no items or an item has
    /// a quantity below one.
    pub fn validate(&self) -> Result<(), String> {
        if self.order_items.is_empty() {
            return Err("an order needs at least one item".to_owned());
        }
        if let Some(item) = self.order_items.iter().find(|i| i.quantity < 1) {
            return Err(format!(
                "quantity for {} must be at least 1",
                item.name
            ));
        }
        if self.payment_info.id.trim().is_empty() {
            return Err("payment id is required".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkout_json(quantity: i32) -> serde_json::Value {
        serde_json::json!({
            "shippingInfo": {
                "address": "12 MG Road",
                "city": "Pune",
                "state": "MH",
                "country": "IN",
                "postalCode": "411001",
                "phone": "9999999999"
            },
            "orderItems": [{
                "product": 3,
                "name": "Classic Tee",
                "quantity": quantity,
                "price": "499.00",
                "image": "https://res.cloudinary.com/demo/tee.jpg"
            }],
            "paymentInfo": { "id": "pi_123" },
            "taxAmount": "89.82",
            "shippingAmount": "0",
            "totalAmount": "588.82"
        })
    }

    #[test]
    fn test_new_order_from_checkout_json() {
        let order: NewOrder = serde_json::from_value(checkout_json(2)).unwrap();
        assert_eq!(order.order_items[0].product, ProductId::new(3));
        assert_eq!(order.shipping_info.postal_code, "411001");
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let order: NewOrder = serde_json::from_value(checkout_json(0)).unwrap();
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_negative_amount_rejected_at_parse() {
        let mut json = checkout_json(1);
        json["totalAmount"] = serde_json::json!("-1");
        assert!(serde_json::from_value::<NewOrder>(json).is_err());
    }
}
