//! Rows for database-backed repository tests.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use teeshop_core::{Category, Email, ImageRef, Price, Role};

use super::accounts::NewAccount;
use super::{AccountRepository, ProductRepository};
use crate::models::{Account, NewOrder, NewProduct, OrderItem, PaymentInfo, Product, ShippingInfo};

fn image(id: &str) -> ImageRef {
    ImageRef {
        id: id.to_owned(),
        secure_url: format!("https://img.test/{id}.jpg"),
    }
}

pub async fn account(pool: &PgPool, email: &str) -> Account {
    let email = Email::parse(email).unwrap();
    AccountRepository::new(pool)
        .create(NewAccount {
            name: "Test Buyer",
            email: &email,
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA",
            role: &Role::user(),
            photo: &image("users/buyer"),
        })
        .await
        .unwrap()
}

pub async fn product(pool: &PgPool, owner: &Account, name: &str, stock: i32) -> Product {
    let new = NewProduct {
        name: name.to_owned(),
        price: Price::parse("499.00").unwrap(),
        description: "Heavyweight cotton".to_owned(),
        category: Category::ShortSleeves,
        stock,
        brand: "Teeshop".to_owned(),
    };
    ProductRepository::new(pool)
        .create(&new, &[image("products/tee")], owner.id)
        .await
        .unwrap()
}

pub fn order_for(items: &[(&Product, i32)]) -> NewOrder {
    NewOrder {
        shipping_info: ShippingInfo {
            address: "12 MG Road".to_owned(),
            city: "Pune".to_owned(),
            state: "MH".to_owned(),
            country: "IN".to_owned(),
            postal_code: "411001".to_owned(),
            phone: "9999999999".to_owned(),
        },
        order_items: items
            .iter()
            .map(|(product, quantity)| OrderItem {
                product: product.id,
                name: product.name.clone(),
                quantity: *quantity,
                price: product.price,
                image: "https://img.test/products/tee.jpg".to_owned(),
            })
            .collect(),
        payment_info: PaymentInfo {
            id: "pi_test".to_owned(),
        },
        tax_amount: Price::parse("0").unwrap(),
        shipping_amount: Price::parse("0").unwrap(),
        total_amount: Price::parse("998.00").unwrap(),
    }
}
